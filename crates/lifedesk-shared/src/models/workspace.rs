use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{CalendarEvent, DailyTask, FinanceData, HealthData, Page};
use crate::ModelError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    #[default]
    Dashboard,
    Pages,
    Tasks,
    Calendar,
    Finance,
    Health,
}

impl Section {
    /// Section shown when nothing else was selected
    pub const PRIMARY: Section = Section::Dashboard;

    pub const ALL: [Section; 6] = [
        Section::Dashboard,
        Section::Pages,
        Section::Tasks,
        Section::Calendar,
        Section::Finance,
        Section::Health,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Pages => "pages",
            Self::Tasks => "tasks",
            Self::Calendar => "calendar",
            Self::Finance => "finance",
            Self::Health => "health",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| ModelError::UnknownSection(s.to_string()))
    }
}

/// The complete application state, as held in memory and as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceState {
    pub pages: BTreeMap<String, Page>,
    pub root_pages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_page_id: Option<String>,
    pub current_section: Section,
    pub search_query: String,
    pub daily_tasks: BTreeMap<String, DailyTask>,
    pub finance_data: FinanceData,
    pub calendar_events: BTreeMap<String, CalendarEvent>,
    pub health_data: HealthData,
}

impl Default for WorkspaceState {
    fn default() -> Self {
        Self::empty()
    }
}

impl WorkspaceState {
    /// Fresh state for a first run or an unreadable store. Satisfies every
    /// structural invariant as is.
    pub fn empty() -> Self {
        Self {
            pages: BTreeMap::new(),
            root_pages: Vec::new(),
            current_page_id: None,
            current_section: Section::PRIMARY,
            search_query: String::new(),
            daily_tasks: BTreeMap::new(),
            finance_data: FinanceData::default_data(),
            calendar_events: BTreeMap::new(),
            health_data: HealthData::default(),
        }
    }

    pub fn page(&self, id: &str) -> Option<&Page> {
        self.pages.get(id)
    }

    pub fn current_page(&self) -> Option<&Page> {
        self.current_page_id.as_deref().and_then(|id| self.pages.get(id))
    }

    /// Every structural invariant this state breaks. Empty for a healthy state.
    pub fn violations(&self) -> Vec<Violation> {
        let mut found = Vec::new();

        found.extend(key_mismatches("pages", &self.pages, |p| p.id.as_str()));
        found.extend(key_mismatches("dailyTasks", &self.daily_tasks, |t| t.id.as_str()));
        found.extend(key_mismatches("calendarEvents", &self.calendar_events, |e| e.id.as_str()));
        found.extend(key_mismatches("wallets", &self.finance_data.wallets, |w| w.id.as_str()));
        found.extend(key_mismatches(
            "transactions",
            &self.finance_data.transactions,
            |t| t.id.as_str(),
        ));
        found.extend(key_mismatches("categories", &self.finance_data.categories, |c| c.id.as_str()));
        found.extend(key_mismatches("budgets", &self.finance_data.budgets, |b| b.id.as_str()));
        found.extend(key_mismatches("goals", &self.finance_data.goals, |g| g.id.as_str()));
        for (key, entry) in &self.health_data.entries {
            if *key != entry.key() {
                found.push(Violation::KeyMismatch {
                    map: "healthData.entries",
                    key: key.clone(),
                    id: entry.key(),
                });
            }
        }

        found.extend(self.tree_violations());
        found
    }

    /// Violations of the page tree: parent/children agreement and
    /// single-owner reachability from `rootPages`.
    pub fn tree_violations(&self) -> Vec<Violation> {
        let mut found = Vec::new();
        let mut owners: HashMap<&str, usize> = HashMap::new();

        for id in &self.root_pages {
            *owners.entry(id.as_str()).or_default() += 1;
            match self.pages.get(id) {
                None => found.push(Violation::DanglingRoot(id.clone())),
                Some(page) if page.parent_id.is_some() => {
                    found.push(Violation::RootHasParent(id.clone()))
                }
                Some(_) => {}
            }
        }

        for (id, page) in &self.pages {
            for child in &page.children {
                *owners.entry(child.as_str()).or_default() += 1;
                match self.pages.get(child) {
                    None => found.push(Violation::DanglingChild {
                        parent: id.clone(),
                        child: child.clone(),
                    }),
                    Some(c) if c.parent_id.as_deref() != Some(id.as_str()) => {
                        found.push(Violation::ParentMismatch {
                            page: child.clone(),
                            parent: id.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }

            if let Some(parent_id) = &page.parent_id {
                match self.pages.get(parent_id) {
                    None => found.push(Violation::MissingParent {
                        page: id.clone(),
                        parent: parent_id.clone(),
                    }),
                    Some(parent) if !parent.children.contains(id) => {
                        found.push(Violation::ParentMismatch {
                            page: id.clone(),
                            parent: parent_id.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }

        for id in self.pages.keys() {
            if owners.get(id.as_str()).copied().unwrap_or(0) > 1 {
                found.push(Violation::MultipleOwners(id.clone()));
            }
        }

        let reachable = self.reachable_pages();
        for id in self.pages.keys() {
            if !reachable.contains(id.as_str()) {
                found.push(Violation::Unreachable(id.clone()));
            }
        }

        if let Some(current) = &self.current_page_id {
            if !self.pages.contains_key(current) {
                found.push(Violation::DanglingCurrentPage(current.clone()));
            }
        }

        found
    }

    fn reachable_pages(&self) -> HashSet<&str> {
        let mut seen = HashSet::new();
        let mut stack: Vec<&str> = self.root_pages.iter().map(String::as_str).collect();

        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(page) = self.pages.get(id) {
                stack.extend(page.children.iter().map(String::as_str));
            }
        }
        seen.retain(|id| self.pages.contains_key(*id));
        seen
    }
}

fn key_mismatches<'a, T>(
    map: &'static str,
    entries: &'a BTreeMap<String, T>,
    id_of: impl Fn(&'a T) -> &'a str,
) -> Vec<Violation> {
    entries
        .iter()
        .filter(|(key, value)| key.as_str() != id_of(*value))
        .map(|(key, value)| Violation::KeyMismatch {
            map,
            key: key.clone(),
            id: id_of(value).to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    KeyMismatch {
        map: &'static str,
        key: String,
        id: String,
    },
    DanglingRoot(String),
    RootHasParent(String),
    DanglingChild {
        parent: String,
        child: String,
    },
    MissingParent {
        page: String,
        parent: String,
    },
    ParentMismatch {
        page: String,
        parent: String,
    },
    MultipleOwners(String),
    Unreachable(String),
    DanglingCurrentPage(String),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyMismatch { map, key, id } => {
                write!(f, "{} entry under key {} has id {}", map, key, id)
            }
            Self::DanglingRoot(id) => write!(f, "root list names missing page {}", id),
            Self::RootHasParent(id) => write!(f, "root page {} has a parent", id),
            Self::DanglingChild { parent, child } => {
                write!(f, "page {} lists missing child {}", parent, child)
            }
            Self::MissingParent { page, parent } => {
                write!(f, "page {} points at missing parent {}", page, parent)
            }
            Self::ParentMismatch { page, parent } => {
                write!(f, "page {} and parent {} disagree", page, parent)
            }
            Self::MultipleOwners(id) => write!(f, "page {} is listed more than once", id),
            Self::Unreachable(id) => write!(f, "page {} is not reachable from the root list", id),
            Self::DanglingCurrentPage(id) => write!(f, "current page {} does not exist", id),
        }
    }
}
