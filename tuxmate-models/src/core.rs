use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SchedulerError};

/// A recurring maintenance task as exchanged with the desktop app.
///
/// The JSON field names are the app's wire contract and predate this
/// crate; they stay French while the Rust fields stay English.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: String,
    /// Open-ended tag naming the external command to run ("MisesAJour",
    /// "Nettoyage", "Rapport", ...). New tags need no scheduler change.
    #[serde(rename = "type", default = "default_task_type")]
    pub task_type: String,
    #[serde(rename = "nom", default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// -1 = every day, 0 = Sunday .. 6 = Saturday.
    #[serde(rename = "jour_semaine", default = "default_day_of_week")]
    pub day_of_week: i32,
    #[serde(rename = "heure", default = "default_hour")]
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
    #[serde(rename = "activee", default = "default_enabled")]
    pub enabled: bool,
    /// Informational only; neither backend persists it, so a read-back
    /// carries the time of the read.
    #[serde(rename = "date_creation", default = "Local::now")]
    pub created_at: DateTime<Local>,
}

impl ScheduledTask {
    /// Range-checks the schedule fields and the id.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(SchedulerError::validation("id", "must not be empty"));
        }
        if self.id.contains(char::is_whitespace) {
            return Err(SchedulerError::validation(
                "id",
                "must not contain whitespace",
            ));
        }
        if !(-1..=6).contains(&self.day_of_week) {
            return Err(SchedulerError::validation(
                "jour_semaine",
                format!("{} is outside -1..=6", self.day_of_week),
            ));
        }
        if self.hour > 23 {
            return Err(SchedulerError::validation(
                "heure",
                format!("{} is outside 0..=23", self.hour),
            ));
        }
        if self.minute > 59 {
            return Err(SchedulerError::validation(
                "minute",
                format!("{} is outside 0..=59", self.minute),
            ));
        }
        Ok(())
    }
}

fn default_task_type() -> String {
    "MisesAJour".to_string()
}

fn default_name() -> String {
    "Tache".to_string()
}

fn default_day_of_week() -> i32 {
    -1
}

fn default_hour() -> u32 {
    2
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ScheduledTask {
        ScheduledTask {
            id: "upd1".to_string(),
            task_type: "MisesAJour".to_string(),
            name: "Weekly Update".to_string(),
            description: "Check for package updates".to_string(),
            day_of_week: 1,
            hour: 3,
            minute: 30,
            enabled: true,
            created_at: Local::now(),
        }
    }

    #[test]
    fn valid_task_passes() {
        sample().validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let mut t = sample();
        t.day_of_week = 7;
        assert!(t.validate().is_err());

        let mut t = sample();
        t.hour = 24;
        assert!(t.validate().is_err());

        let mut t = sample();
        t.minute = 60;
        assert!(t.validate().is_err());

        let mut t = sample();
        t.id = " ".to_string();
        assert!(t.validate().is_err());
    }

    #[test]
    fn daily_sentinel_is_valid() {
        let mut t = sample();
        t.day_of_week = -1;
        t.validate().unwrap();
    }

    #[test]
    fn wire_field_names_are_french() {
        let json = serde_json::to_value(sample()).unwrap();
        for key in [
            "id",
            "type",
            "nom",
            "description",
            "jour_semaine",
            "heure",
            "minute",
            "activee",
            "date_creation",
        ] {
            assert!(json.get(key).is_some(), "missing wire key {key}");
        }
    }

    #[test]
    fn sparse_payload_gets_defaults() {
        let task: ScheduledTask = serde_json::from_str(r#"{"id":"t1"}"#).unwrap();
        assert_eq!(task.task_type, "MisesAJour");
        assert_eq!(task.day_of_week, -1);
        assert_eq!(task.hour, 2);
        assert_eq!(task.minute, 0);
        assert!(task.enabled);
    }
}
