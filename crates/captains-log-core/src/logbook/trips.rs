use crate::api::ApiResult;
use crate::cache::{NotesList, QueryKey, TripDetail, TripsList};
use crate::models::Trip;

use super::{remove_by_id, Logbook};

/// Trips ordered newest first.
pub fn newest_first(trips: &[Trip]) -> Vec<Trip> {
    let mut sorted = trips.to_vec();
    sorted.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    sorted
}

impl Logbook {
    pub async fn load_trips(&self, boat_id: &str) -> ApiResult<Vec<Trip>> {
        self.loader
            .load(&TripsList(boat_id.to_string()), || {
                self.retry.run(move || self.api.list_trips(boat_id))
            })
            .await
    }

    pub async fn load_trip(&self, id: &str) -> ApiResult<Trip> {
        self.loader
            .load(&TripDetail(id.to_string()), || self.retry.run(move || self.api.get_trip(id)))
            .await
    }

    /// Remove a trip from its boat's list. Notes for the boat may reference
    /// it, so they are marked stale as well.
    pub async fn delete_trip(&self, boat_id: &str, trip_id: &str) -> ApiResult<()> {
        let key = TripsList(boat_id.to_string());
        self.coordinator
            .mutate(
                &key,
                |trips| Ok(remove_by_id(trips, trip_id)),
                || self.api.delete_trip(trip_id),
            )
            .await?;

        let cache = self.cache();
        cache.invalidate(&key.detail(trip_id));
        cache.invalidate_key(&NotesList::for_boat(boat_id).cache_key());
        cache.invalidate_key(&NotesList::all().cache_key());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip(id: &str, started_at: &str) -> Trip {
        serde_json::from_value(serde_json::json!({
            "id": id, "boatId": "b1", "startedAt": started_at, "status": "completed"
        }))
        .unwrap()
    }

    #[test]
    fn test_newest_first() {
        let trips = vec![
            trip("t1", "2026-05-01T10:00:00Z"),
            trip("t3", "2026-07-01T10:00:00Z"),
            trip("t2", "2026-06-01T10:00:00Z"),
        ];
        let ids: Vec<String> = newest_first(&trips).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["t3", "t2", "t1"]);
    }

    #[test]
    fn test_remove_trip() {
        let trips = vec![trip("t1", "2026-05-01T10:00:00Z"), trip("t2", "2026-06-01T10:00:00Z")];
        let remaining = remove_by_id(&trips, "t1");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "t2");
    }
}
