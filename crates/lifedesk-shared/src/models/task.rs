use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{generate_id, now_millis};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTask {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub date: NaiveDate,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
}

impl DailyTask {
    pub fn new(text: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: generate_id("task"),
            text: text.into(),
            completed: false,
            date,
            created_at: now_millis(),
            completed_at: None,
        }
    }

    pub fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
        self.completed_at = completed.then(now_millis);
    }

    pub fn toggle(&mut self) {
        self.set_completed(!self.completed);
    }

    pub fn apply(&mut self, patch: DailyTaskPatch) {
        if let Some(text) = patch.text {
            self.text = text;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(completed) = patch.completed {
            if completed != self.completed {
                self.set_completed(completed);
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_tracks_completion_time() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut task = DailyTask::new("Stretch", date);
        assert!(task.completed_at.is_none());

        task.toggle();
        assert!(task.completed);
        assert!(task.completed_at.is_some());

        task.toggle();
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn date_serializes_as_iso_day() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let task = DailyTask::new("Read", date);
        let value = serde_json::to_value(&task).unwrap();

        assert_eq!(value["date"], "2024-03-01");
        assert!(value.get("completedAt").is_none());
    }
}
