use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::api::{ApiError, ApiResult};
use crate::cache::{BoatDetail, BoatsList, CacheEntry, MaintenanceList, NotesList, QueryKey, TripsList};
use crate::models::{Boat, MaintenanceTask, NewBoat, Trip};

use super::{pending_id, remove_by_id, Logbook};

/// A boat with the lists shown on its dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoatOverview {
    pub boat: Boat,
    pub trips: Vec<Trip>,
    pub maintenance: Vec<MaintenanceTask>,
}

/// Optimistic copy of `boat` with `enabled` set.
pub fn with_enabled(boat: &Boat, enabled: bool) -> Boat {
    let mut next = boat.clone();
    next.enabled = enabled;
    next
}

/// Optimistic copy of `boat` with the editable fields replaced.
pub fn with_fields(boat: &Boat, fields: &NewBoat) -> Boat {
    Boat {
        name: fields.name.clone(),
        make: fields.make.clone(),
        model: fields.model.clone(),
        year: fields.year,
        hull_id: fields.hull_id.clone(),
        home_port: fields.home_port.clone(),
        ..boat.clone()
    }
}

/// Placeholder shown in the list until the server assigns an id.
pub fn placeholder_boat(fields: &NewBoat) -> Boat {
    Boat {
        id: pending_id(),
        name: fields.name.clone(),
        make: fields.make.clone(),
        model: fields.model.clone(),
        year: fields.year,
        hull_id: fields.hull_id.clone(),
        home_port: fields.home_port.clone(),
        enabled: true,
        created_at: Some(Utc::now()),
        updated_at: None,
    }
}

impl Logbook {
    pub async fn load_boats(&self) -> ApiResult<Vec<Boat>> {
        self.loader
            .load(&BoatsList, || self.retry.run(move || self.api.list_boats()))
            .await
    }

    pub async fn load_boat(&self, id: &str) -> ApiResult<Boat> {
        self.loader
            .load(&BoatsList.detail(id), || self.retry.run(move || self.api.get_boat(id)))
            .await
    }

    /// Boat, trips and maintenance fetched concurrently.
    pub async fn load_boat_overview(&self, id: &str) -> ApiResult<BoatOverview> {
        let (boat, trips, maintenance) = futures::try_join!(
            self.load_boat(id),
            self.load_trips(id),
            self.load_maintenance(id),
        )?;
        Ok(BoatOverview {
            boat,
            trips,
            maintenance,
        })
    }

    /// Current enabled flag. Stale entries may still hold an unconfirmed
    /// optimistic value, so only a fresh list is read directly; anything else
    /// goes through the loader, which refetches when needed.
    async fn boat_enabled(&self, id: &str) -> ApiResult<bool> {
        let detail = BoatsList.detail(id);
        if self.cache().entry(&detail).is_absent() {
            if let CacheEntry::Fresh(boats) = self.cache().entry(&BoatsList) {
                if let Some(boat) = boats.into_iter().find(|b| b.id == id) {
                    return Ok(boat.enabled);
                }
            }
        }
        Ok(self.load_boat(id).await?.enabled)
    }

    pub async fn toggle_boat_enabled(&self, id: &str) -> ApiResult<Boat> {
        let enabled = self.boat_enabled(id).await?;
        self.set_boat_enabled(id, !enabled).await
    }

    pub async fn set_boat_enabled(&self, id: &str, enabled: bool) -> ApiResult<Boat> {
        let key = BoatDetail(id.to_string());
        let boat = self
            .coordinator
            .mutate(
                &key,
                |boat| Ok(with_enabled(boat, enabled)),
                || self.api.set_boat_enabled(id, enabled),
            )
            .await?;
        self.cache().invalidate(&BoatsList);
        debug!(boat_id = id, enabled, "Boat enabled flag updated");
        Ok(boat)
    }

    pub async fn create_boat(&self, fields: &NewBoat) -> ApiResult<Boat> {
        if fields.name.trim().is_empty() {
            return Err(ApiError::local("Boat name is required"));
        }
        let placeholder = placeholder_boat(fields);
        let created = self
            .coordinator
            .mutate(
                &BoatsList,
                |boats| {
                    let mut next = boats.clone();
                    next.push(placeholder);
                    Ok(next)
                },
                || self.api.create_boat(fields),
            )
            .await?;
        self.cache().set(&BoatsList.detail(&created.id), created.clone());
        Ok(created)
    }

    pub async fn update_boat(&self, id: &str, fields: &NewBoat) -> ApiResult<Boat> {
        let updated = self
            .coordinator
            .mutate(
                &BoatsList.detail(id),
                |boat| Ok(with_fields(boat, fields)),
                || self.api.update_boat(id, fields),
            )
            .await?;
        self.cache().invalidate(&BoatsList);
        Ok(updated)
    }

    /// Remove a boat. Its trips, maintenance and notes become stale too.
    pub async fn delete_boat(&self, id: &str) -> ApiResult<()> {
        self.coordinator
            .mutate(
                &BoatsList,
                |boats| Ok(remove_by_id(boats, id)),
                || self.api.delete_boat(id),
            )
            .await?;

        let cache = self.cache();
        for key in [
            BoatsList.detail(id).cache_key(),
            TripsList(id.to_string()).cache_key(),
            MaintenanceList(id.to_string()).cache_key(),
            NotesList::for_boat(id).cache_key(),
        ] {
            cache.invalidate_key(&key);
        }
        Ok(())
    }
}
