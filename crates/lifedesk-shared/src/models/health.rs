use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Great,
    Good,
    Okay,
    Bad,
    Awful,
}

/// One day of health tracking, keyed by its date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthEntry {
    pub date: NaiveDate,
    #[serde(default)]
    pub water_glasses: u32,
    #[serde(default)]
    pub sleep_hours: f64,
    #[serde(default)]
    pub steps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<Mood>,
}

impl HealthEntry {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            water_glasses: 0,
            sleep_hours: 0.0,
            steps: 0,
            weight: None,
            mood: None,
        }
    }

    /// Map key for this entry
    pub fn key(&self) -> String {
        self.date.to_string()
    }

    pub fn apply(&mut self, patch: HealthEntryPatch) {
        if let Some(water) = patch.water_glasses {
            self.water_glasses = water;
        }
        if let Some(sleep) = patch.sleep_hours {
            self.sleep_hours = sleep.max(0.0);
        }
        if let Some(steps) = patch.steps {
            self.steps = steps;
        }
        if let Some(weight) = patch.weight {
            self.weight = Some(weight);
        }
        if let Some(mood) = patch.mood {
            self.mood = Some(mood);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthEntryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_glasses: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<Mood>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSettings {
    pub water_goal: u32,
    pub sleep_goal: f64,
    pub steps_goal: u32,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            water_goal: 8,
            sleep_goal: 8.0,
            steps_goal: 10_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthData {
    /// Keyed by ISO date (`YYYY-MM-DD`)
    #[serde(default)]
    pub entries: BTreeMap<String, HealthEntry>,
    #[serde(default)]
    pub settings: HealthSettings,
}

impl HealthData {
    pub fn entry(&self, date: NaiveDate) -> Option<&HealthEntry> {
        self.entries.get(&date.to_string())
    }

    /// Entry for `date`, created empty if missing
    pub fn entry_mut(&mut self, date: NaiveDate) -> &mut HealthEntry {
        self.entries
            .entry(date.to_string())
            .or_insert_with(|| HealthEntry::new(date))
    }
}
