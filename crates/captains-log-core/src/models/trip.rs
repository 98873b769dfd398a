use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    Active,
    Completed,
}

impl std::fmt::Display for TripStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TripStatus::Active => write!(f, "Active"),
            TripStatus::Completed => write!(f, "Completed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub boat_id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    pub status: TripStatus,
    #[serde(default)]
    pub distance_nm: Option<f64>,
    #[serde(default)]
    pub engine_hours: Option<f64>,
    #[serde(default)]
    pub crew: Vec<String>,
}

impl Trip {
    /// Elapsed time for completed trips.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.ended_at.map(|end| end - self.started_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trip() {
        let json = r#"{"id":"t1","boatId":"b1","startedAt":"2026-06-01T12:00:00Z","endedAt":"2026-06-01T15:30:00Z","status":"completed","distanceNm":18.4}"#;
        let trip: Trip = serde_json::from_str(json).unwrap();
        assert_eq!(trip.status, TripStatus::Completed);
        assert_eq!(trip.duration().map(|d| d.num_minutes()), Some(210));
        assert!(trip.crew.is_empty());
    }

    #[test]
    fn test_active_trip_has_no_duration() {
        let json = r#"{"id":"t2","boatId":"b1","startedAt":"2026-06-01T12:00:00Z","status":"active"}"#;
        let trip: Trip = serde_json::from_str(json).unwrap();
        assert_eq!(trip.duration(), None);
    }
}
