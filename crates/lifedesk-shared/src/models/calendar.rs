use serde::{Deserialize, Serialize};

use crate::{generate_id, now_millis};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    /// Epoch millis
    pub start: i64,
    /// Epoch millis, never before `start`
    pub end: i64,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub created_at: i64,
}

impl CalendarEvent {
    pub fn new(title: impl Into<String>, start: i64, end: i64) -> Self {
        Self {
            id: generate_id("event"),
            title: title.into(),
            start,
            end: end.max(start),
            all_day: false,
            description: None,
            color: None,
            created_at: now_millis(),
        }
    }

    pub fn overlaps(&self, from: i64, to: i64) -> bool {
        self.start <= to && self.end >= from
    }

    pub fn apply(&mut self, patch: CalendarEventPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(start) = patch.start {
            self.start = start;
        }
        if let Some(end) = patch.end {
            self.end = end;
        }
        if let Some(all_day) = patch.all_day {
            self.all_day = all_day;
        }
        if let Some(description) = patch.description {
            self.description = Some(description).filter(|d| !d.is_empty());
        }
        if let Some(color) = patch.color {
            self.color = Some(color).filter(|c| !c.is_empty());
        }
        self.end = self.end.max(self.start);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEventPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_day: Option<bool>,
    /// Empty string clears the description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Empty string clears the color
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_is_clamped_to_start() {
        let mut event = CalendarEvent::new("Standup", 1_000, 500);
        assert_eq!(event.end, 1_000);

        event.apply(CalendarEventPatch {
            start: Some(2_000),
            ..Default::default()
        });
        assert_eq!(event.end, 2_000);
    }

    #[test]
    fn empty_strings_clear_optional_fields() {
        let mut event = CalendarEvent::new("Dentist", 0, 60_000);
        event.apply(CalendarEventPatch {
            description: Some("Bring card".to_string()),
            ..Default::default()
        });
        assert_eq!(event.description.as_deref(), Some("Bring card"));

        event.apply(CalendarEventPatch {
            description: Some(String::new()),
            ..Default::default()
        });
        assert!(event.description.is_none());
    }
}
