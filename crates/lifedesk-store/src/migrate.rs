//! Migration and defaulting of persisted snapshots.
//!
//! Older versions wrote fewer fields. Instead of versioned schemas, every
//! field the application ever added ships with a step in [`MIGRATIONS`] that
//! backfills it when absent or malformed. Steps run in order on every load and
//! each one is idempotent on its own. After the raw steps, the record is
//! decoded entity by entity so a single bad entry never costs the rest of the
//! workspace, and finally the page tree is reconciled.

use std::collections::BTreeMap;

use lifedesk_shared::{
    Block, Budget, CalendarEvent, Category, DailyTask, FinanceData, FinanceSettings, HealthData,
    HealthEntry, HealthSettings, Page, SavingsGoal, Section, Transaction, Wallet, WorkspaceState,
    DEFAULT_PAGE_ICON,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::tree::reconcile_tree;

pub type RawRecord = Map<String, Value>;

/// A named backfill rule. `apply` reports whether it changed the record.
pub struct Migration {
    pub name: &'static str,
    apply: fn(&mut RawRecord) -> bool,
}

impl Migration {
    pub fn apply(&self, record: &mut RawRecord) -> bool {
        (self.apply)(record)
    }
}

/// Ordered backfill steps. New persisted fields append a step here.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "page_blocks",
        apply: page_blocks,
    },
    Migration {
        name: "page_icon",
        apply: page_icon,
    },
    Migration {
        name: "daily_tasks",
        apply: daily_tasks,
    },
    Migration {
        name: "finance_data",
        apply: finance_data,
    },
    Migration {
        name: "current_section",
        apply: current_section,
    },
    Migration {
        name: "pages",
        apply: pages,
    },
    Migration {
        name: "page_children",
        apply: page_children,
    },
    Migration {
        name: "root_pages",
        apply: root_pages,
    },
    Migration {
        name: "search_query",
        apply: search_query,
    },
    Migration {
        name: "calendar_events",
        apply: calendar_events,
    },
    Migration {
        name: "health_data",
        apply: health_data,
    },
];

fn page_blocks(record: &mut RawRecord) -> bool {
    for_each_page(record, |page| {
        ensure(page, "blocks", Value::is_array, || Value::Array(Vec::new()))
    })
}

fn page_icon(record: &mut RawRecord) -> bool {
    for_each_page(record, |page| {
        ensure(page, "icon", Value::is_string, || Value::from(DEFAULT_PAGE_ICON))
    })
}

fn page_children(record: &mut RawRecord) -> bool {
    for_each_page(record, |page| {
        ensure(page, "children", Value::is_array, || Value::Array(Vec::new()))
    })
}

fn daily_tasks(record: &mut RawRecord) -> bool {
    ensure(record, "dailyTasks", Value::is_object, empty_object)
}

fn finance_data(record: &mut RawRecord) -> bool {
    if record.get("financeData").is_some_and(Value::is_object) {
        return false;
    }
    match to_raw(&FinanceData::default_data()) {
        Some(defaults) => {
            record.insert("financeData".to_string(), defaults);
            true
        }
        None => false,
    }
}

fn current_section(record: &mut RawRecord) -> bool {
    ensure(
        record,
        "currentSection",
        |v| v.as_str().is_some_and(|s| s.parse::<Section>().is_ok()),
        || Value::from(Section::PRIMARY.as_str()),
    )
}

fn pages(record: &mut RawRecord) -> bool {
    ensure(record, "pages", Value::is_object, empty_object)
}

fn root_pages(record: &mut RawRecord) -> bool {
    ensure(record, "rootPages", Value::is_array, || Value::Array(Vec::new()))
}

fn search_query(record: &mut RawRecord) -> bool {
    ensure(record, "searchQuery", Value::is_string, || Value::from(""))
}

fn calendar_events(record: &mut RawRecord) -> bool {
    ensure(record, "calendarEvents", Value::is_object, empty_object)
}

fn health_data(record: &mut RawRecord) -> bool {
    if record.get("healthData").is_some_and(Value::is_object) {
        return false;
    }
    match to_raw(&HealthData::default()) {
        Some(defaults) => {
            record.insert("healthData".to_string(), defaults);
            true
        }
        None => false,
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn to_raw<T: Serialize>(value: &T) -> Option<Value> {
    match serde_json::to_value(value) {
        Ok(raw) => Some(raw),
        Err(e) => {
            tracing::warn!("Could not encode default value: {}", e);
            None
        }
    }
}

/// Set `key` to `default()` unless it holds a value accepted by `valid`
fn ensure(
    object: &mut RawRecord,
    key: &str,
    valid: impl Fn(&Value) -> bool,
    default: impl FnOnce() -> Value,
) -> bool {
    if object.get(key).is_some_and(|v| valid(v)) {
        return false;
    }
    object.insert(key.to_string(), default());
    true
}

fn for_each_page(record: &mut RawRecord, mut step: impl FnMut(&mut RawRecord) -> bool) -> bool {
    let Some(pages) = record.get_mut("pages").and_then(Value::as_object_mut) else {
        return false;
    };
    let mut changed = false;
    for page in pages.values_mut().filter_map(Value::as_object_mut) {
        changed |= step(page);
    }
    changed
}

/// Run every step on `record`. Returns the names of the steps that changed it.
pub fn migrate_value(record: &mut RawRecord) -> Vec<&'static str> {
    MIGRATIONS
        .iter()
        .filter_map(|migration| migration.apply(record).then_some(migration.name))
        .collect()
}

/// Parse, migrate and decode a stored record. Never fails: a record that is
/// not a JSON object yields the empty workspace.
pub fn restore(raw: &str) -> WorkspaceState {
    let record = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(record)) => record,
        Ok(other) => {
            tracing::warn!(
                kind = json_kind(&other),
                "Stored workspace is not an object; starting fresh"
            );
            return WorkspaceState::empty();
        }
        Err(e) => {
            tracing::warn!("Stored workspace is unreadable ({}); starting fresh", e);
            return WorkspaceState::empty();
        }
    };
    restore_record(record)
}

/// [`restore`] for an already parsed record
pub fn restore_record(mut record: RawRecord) -> WorkspaceState {
    let applied = migrate_value(&mut record);
    if !applied.is_empty() {
        tracing::info!(steps = ?applied, "Backfilled stored workspace");
    }

    let mut state = decode(record);
    let repairs = reconcile_tree(&mut state);
    if repairs > 0 {
        tracing::info!(repairs, "Repaired page tree");
    }
    state
}

/// Something [`decode`] had to change to turn a record into a valid state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeIssue {
    /// An entry that could not be decoded and was left out
    Malformed {
        kind: &'static str,
        key: String,
        reason: String,
    },
    /// An entry stored under a key other than its own id
    Rekeyed {
        kind: &'static str,
        key: String,
        id: String,
    },
    /// A second entry with an id already taken
    Duplicate { kind: &'static str, id: String },
    /// Blocks of a page that could not be decoded
    MalformedBlocks { page: String, dropped: usize },
    /// A top-level field replaced by its default
    FieldReset { field: &'static str, reason: String },
}

impl std::fmt::Display for DecodeIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed { kind, key, reason } => {
                write!(f, "{} {} is malformed and dropped: {}", kind, key, reason)
            }
            Self::Rekeyed { kind, key, id } => {
                write!(f, "{} {} is stored under key {}", kind, id, key)
            }
            Self::Duplicate { kind, id } => write!(f, "{} {} is stored twice", kind, id),
            Self::MalformedBlocks { page, dropped } => {
                write!(f, "page {} has {} malformed block(s)", page, dropped)
            }
            Self::FieldReset { field, reason } => {
                write!(f, "field {} is reset to its default: {}", field, reason)
            }
        }
    }
}

/// Typed decoding of a migrated record, one field and one entity at a time.
/// Anything that still fails to decode falls back to its default.
pub fn decode(record: RawRecord) -> WorkspaceState {
    decode_with_issues(record).0
}

/// [`decode`], also listing every entry it dropped, re-keyed or reset
pub fn decode_with_issues(mut record: RawRecord) -> (WorkspaceState, Vec<DecodeIssue>) {
    let empty = WorkspaceState::empty();
    let mut issues = Vec::new();

    let pages = match record.remove("pages") {
        Some(Value::Object(mut pages)) => {
            for (key, page) in pages.iter_mut() {
                if let Some(page) = page.as_object_mut() {
                    drop_malformed_blocks(key, page, &mut issues);
                }
            }
            decode_entities(pages, "page", |p: &Page| p.id.clone(), &mut issues)
        }
        _ => BTreeMap::new(),
    };

    let root_pages = match record.remove("rootPages") {
        Some(Value::Array(ids)) => ids
            .into_iter()
            .filter_map(|id| match id {
                Value::String(id) => Some(id),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    let state = WorkspaceState {
        pages,
        root_pages,
        current_page_id: field(&mut record, "currentPageId", empty.current_page_id, &mut issues),
        current_section: field(&mut record, "currentSection", empty.current_section, &mut issues),
        search_query: field(&mut record, "searchQuery", empty.search_query, &mut issues),
        daily_tasks: entities(
            &mut record,
            "dailyTasks",
            "daily task",
            |t: &DailyTask| t.id.clone(),
            &mut issues,
        ),
        finance_data: decode_finance(record.remove("financeData"), &mut issues),
        calendar_events: entities(
            &mut record,
            "calendarEvents",
            "calendar event",
            |e: &CalendarEvent| e.id.clone(),
            &mut issues,
        ),
        health_data: decode_health(record.remove("healthData"), &mut issues),
    };
    (state, issues)
}

fn decode_finance(raw: Option<Value>, issues: &mut Vec<DecodeIssue>) -> FinanceData {
    let Some(Value::Object(mut record)) = raw else {
        return FinanceData::default_data();
    };

    FinanceData {
        wallets: entities(&mut record, "wallets", "wallet", |w: &Wallet| w.id.clone(), issues),
        transactions: entities(
            &mut record,
            "transactions",
            "transaction",
            |t: &Transaction| t.id.clone(),
            issues,
        ),
        categories: entities(
            &mut record,
            "categories",
            "category",
            |c: &Category| c.id.clone(),
            issues,
        ),
        budgets: entities(&mut record, "budgets", "budget", |b: &Budget| b.id.clone(), issues),
        goals: entities(&mut record, "goals", "goal", |g: &SavingsGoal| g.id.clone(), issues),
        settings: field(&mut record, "settings", FinanceSettings::default(), issues),
    }
}

fn decode_health(raw: Option<Value>, issues: &mut Vec<DecodeIssue>) -> HealthData {
    let Some(Value::Object(mut record)) = raw else {
        return HealthData::default();
    };

    HealthData {
        entries: entities(
            &mut record,
            "entries",
            "health entry",
            |e: &HealthEntry| e.key(),
            issues,
        ),
        settings: field(&mut record, "settings", HealthSettings::default(), issues),
    }
}

/// Decode `record[key]`, or `default` when it is absent or malformed
fn field<T: DeserializeOwned>(
    record: &mut RawRecord,
    key: &'static str,
    default: T,
    issues: &mut Vec<DecodeIssue>,
) -> T {
    match record.remove(key) {
        None | Some(Value::Null) => default,
        Some(raw) => serde_json::from_value(raw).unwrap_or_else(|e| {
            tracing::warn!(field = key, "Malformed field replaced by default: {}", e);
            issues.push(DecodeIssue::FieldReset {
                field: key,
                reason: e.to_string(),
            });
            default
        }),
    }
}

fn entities<T: DeserializeOwned>(
    record: &mut RawRecord,
    key: &str,
    kind: &'static str,
    id_of: impl Fn(&T) -> String,
    issues: &mut Vec<DecodeIssue>,
) -> BTreeMap<String, T> {
    match record.remove(key) {
        Some(Value::Object(entries)) => decode_entities(entries, kind, id_of, issues),
        _ => BTreeMap::new(),
    }
}

/// Decode each map entry on its own and key it by its own id. Malformed
/// entries are dropped; on duplicate ids the first entry wins.
fn decode_entities<T: DeserializeOwned>(
    entries: RawRecord,
    kind: &'static str,
    id_of: impl Fn(&T) -> String,
    issues: &mut Vec<DecodeIssue>,
) -> BTreeMap<String, T> {
    let mut decoded = BTreeMap::new();

    for (key, raw) in entries {
        let entity: T = match serde_json::from_value(raw) {
            Ok(entity) => entity,
            Err(e) => {
                tracing::warn!(kind, key = %key, "Dropping malformed entry: {}", e);
                issues.push(DecodeIssue::Malformed {
                    kind,
                    key,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let id = id_of(&entity);
        if id != key {
            tracing::warn!(kind, key = %key, id = %id, "Re-keying entry under its own id");
            issues.push(DecodeIssue::Rekeyed {
                kind,
                key,
                id: id.clone(),
            });
        }
        if decoded.contains_key(&id) {
            tracing::warn!(kind, id = %id, "Dropping duplicate entry");
            issues.push(DecodeIssue::Duplicate { kind, id });
            continue;
        }
        decoded.insert(id, entity);
    }

    decoded
}

fn drop_malformed_blocks(page_key: &str, page: &mut RawRecord, issues: &mut Vec<DecodeIssue>) {
    let Some(blocks) = page.get_mut("blocks").and_then(Value::as_array_mut) else {
        return;
    };
    let before = blocks.len();
    blocks.retain(|block| serde_json::from_value::<Block>(block.clone()).is_ok());
    let dropped = before - blocks.len();
    if dropped > 0 {
        tracing::warn!(page = %page_key, dropped, "Dropping malformed blocks");
        issues.push(DecodeIssue::MalformedBlocks {
            page: page_key.to_string(),
            dropped,
        });
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
