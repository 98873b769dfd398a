use tracing::info;

use crate::api::ApiResult;
use crate::cache::SettingsKey;
use crate::models::{UnitSystem, UserSettings};

use super::Logbook;

/// Copy of `settings` with toggle `name` set. Unknown toggles count as off.
pub fn with_toggle(settings: &UserSettings, name: &str, enabled: bool) -> UserSettings {
    let mut next = settings.clone();
    next.toggles.insert(name.to_string(), enabled);
    next
}

pub fn with_units(settings: &UserSettings, units: UnitSystem) -> UserSettings {
    UserSettings {
        units,
        ..settings.clone()
    }
}

impl Logbook {
    pub async fn load_settings(&self) -> ApiResult<UserSettings> {
        self.loader
            .load(&SettingsKey, || self.retry.run(move || self.api.get_settings()))
            .await
    }

    pub async fn toggle_setting(&self, name: &str) -> ApiResult<UserSettings> {
        // A stale entry may be an earlier optimistic write, so read through the loader
        let enabled = !self.load_settings().await?.is_enabled(name);
        let settings = self
            .coordinator
            .mutate_and_store(
                &SettingsKey,
                |settings| Ok(with_toggle(settings, name, enabled)),
                || self.api.set_toggle(name, enabled),
            )
            .await?;
        info!(toggle = name, enabled, "Setting changed");
        Ok(settings)
    }

    pub async fn set_units(&self, units: UnitSystem) -> ApiResult<UserSettings> {
        self.coordinator
            .mutate_and_store(
                &SettingsKey,
                |settings| Ok(with_units(settings, units)),
                || self.api.set_units(units),
            )
            .await
    }
}
