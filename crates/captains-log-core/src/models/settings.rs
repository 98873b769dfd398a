use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Nautical,
    Metric,
    Imperial,
}

impl std::str::FromStr for UnitSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nautical" => Ok(UnitSystem::Nautical),
            "metric" => Ok(UnitSystem::Metric),
            "imperial" => Ok(UnitSystem::Imperial),
            other => Err(format!("unknown unit system: {}", other)),
        }
    }
}

/// Per-user preferences. Toggles are named on/off switches owned by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(default)]
    pub units: UnitSystem,
    #[serde(default)]
    pub toggles: BTreeMap<String, bool>,
}

impl UserSettings {
    /// Unknown toggles read as off.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.toggles.get(name).copied().unwrap_or(false)
    }
}
