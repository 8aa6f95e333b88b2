use std::collections::HashSet;

use chrono::NaiveDate;
use lifedesk_shared::{
    Block, BlockPatch, CalendarEvent, CalendarEventPatch, DailyTask, DailyTaskPatch,
    HealthEntryPatch, Page, PagePatch, Section, Transaction, Wallet, WorkspaceState,
};

use crate::WorkspaceError;

/// How a mutation should reach the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    /// Structural change, written right away
    Immediate,
    /// Typing-rate edit, collapsed by the auto-save delay
    Debounced,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CreatePage {
        title: Option<String>,
        parent_id: Option<String>,
    },
    UpdatePage {
        id: String,
        patch: PagePatch,
    },
    /// Removes the page and its whole subtree
    DeletePage {
        id: String,
    },
    MovePage {
        id: String,
        new_parent: Option<String>,
    },
    TogglePageExpanded {
        id: String,
    },
    SelectPage {
        id: Option<String>,
    },
    AddBlock {
        page_id: String,
        block: Block,
    },
    UpdateBlock {
        page_id: String,
        block_id: String,
        patch: BlockPatch,
    },
    RemoveBlock {
        page_id: String,
        block_id: String,
    },
    /// Renumber blocks to follow `ordered_ids`; unnamed blocks keep their
    /// relative order after the named ones
    ReorderBlocks {
        page_id: String,
        ordered_ids: Vec<String>,
    },
    AddDailyTask {
        task: DailyTask,
    },
    UpdateDailyTask {
        id: String,
        patch: DailyTaskPatch,
    },
    ToggleDailyTask {
        id: String,
    },
    DeleteDailyTask {
        id: String,
    },
    UpsertWallet {
        wallet: Wallet,
    },
    AddTransaction {
        transaction: Transaction,
    },
    DeleteTransaction {
        id: String,
    },
    AddEvent {
        event: CalendarEvent,
    },
    UpdateEvent {
        id: String,
        patch: CalendarEventPatch,
    },
    DeleteEvent {
        id: String,
    },
    LogHealth {
        date: NaiveDate,
        patch: HealthEntryPatch,
    },
    SetSection {
        section: Section,
    },
    SetSearchQuery {
        query: String,
    },
}

impl Action {
    pub fn persistence(&self) -> Persistence {
        match self {
            Self::UpdatePage { .. } | Self::UpdateBlock { .. } | Self::SetSearchQuery { .. } => {
                Persistence::Debounced
            }
            _ => Persistence::Immediate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A new entity with this id exists
    Created(String),
    /// These ids no longer exist
    Removed(Vec<String>),
    Updated,
}

/// Stored numbers must survive a JSON round trip, which has no inf or NaN
fn ensure_finite(what: &str, value: f64) -> Result<(), WorkspaceError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(WorkspaceError::Validation(format!(
            "{} must be a finite number, got {}",
            what, value
        )))
    }
}

fn duplicate(kind: &str, id: &str) -> WorkspaceError {
    WorkspaceError::Validation(format!("{} {} already exists", kind, id))
}

/// Owner of the in-memory workspace. Every mutation goes through
/// [`Workspace::dispatch`], which either applies the whole action or leaves
/// the state untouched and reports why.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workspace {
    state: WorkspaceState,
}

impl Workspace {
    pub fn new(state: WorkspaceState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &WorkspaceState {
        &self.state
    }

    pub fn into_state(self) -> WorkspaceState {
        self.state
    }

    pub fn dispatch(&mut self, action: Action) -> Result<Outcome, WorkspaceError> {
        match action {
            Action::CreatePage { title, parent_id } => self
                .create_page(title.as_deref(), parent_id.as_deref())
                .map(Outcome::Created),
            Action::UpdatePage { id, patch } => {
                self.page_mut(&id)?.apply(patch);
                Ok(Outcome::Updated)
            }
            Action::DeletePage { id } => self.delete_page(&id).map(Outcome::Removed),
            Action::MovePage { id, new_parent } => {
                self.move_page(&id, new_parent.as_deref())?;
                Ok(Outcome::Updated)
            }
            Action::TogglePageExpanded { id } => {
                let page = self.page_mut(&id)?;
                page.is_expanded = Some(!page.is_expanded.unwrap_or(true));
                Ok(Outcome::Updated)
            }
            Action::SelectPage { id } => {
                if let Some(id) = &id {
                    self.page(id)?;
                }
                self.state.current_page_id = id;
                Ok(Outcome::Updated)
            }
            Action::AddBlock { page_id, block } => {
                let page = self.page_mut(&page_id)?;
                let id = block.id.clone();
                if page.block(&id).is_some() {
                    return Err(duplicate("block", &id));
                }
                page.blocks.push(block);
                page.touch();
                Ok(Outcome::Created(id))
            }
            Action::UpdateBlock {
                page_id,
                block_id,
                patch,
            } => {
                let page = self.page_mut(&page_id)?;
                page.block_mut(&block_id)
                    .ok_or_else(|| WorkspaceError::BlockNotFound {
                        page: page_id.clone(),
                        block: block_id.clone(),
                    })?
                    .apply(patch);
                page.touch();
                Ok(Outcome::Updated)
            }
            Action::RemoveBlock { page_id, block_id } => {
                let page = self.page_mut(&page_id)?;
                let before = page.blocks.len();
                page.blocks.retain(|b| b.id != block_id);
                if page.blocks.len() == before {
                    return Err(WorkspaceError::BlockNotFound {
                        page: page_id,
                        block: block_id,
                    });
                }
                page.touch();
                Ok(Outcome::Removed(vec![block_id]))
            }
            Action::ReorderBlocks {
                page_id,
                ordered_ids,
            } => {
                self.reorder_blocks(&page_id, &ordered_ids)?;
                Ok(Outcome::Updated)
            }
            Action::AddDailyTask { task } => {
                let id = task.id.clone();
                if self.state.daily_tasks.contains_key(&id) {
                    return Err(duplicate("task", &id));
                }
                self.state.daily_tasks.insert(id.clone(), task);
                Ok(Outcome::Created(id))
            }
            Action::UpdateDailyTask { id, patch } => {
                self.task_mut(&id)?.apply(patch);
                Ok(Outcome::Updated)
            }
            Action::ToggleDailyTask { id } => {
                self.task_mut(&id)?.toggle();
                Ok(Outcome::Updated)
            }
            Action::DeleteDailyTask { id } => {
                self.state
                    .daily_tasks
                    .remove(&id)
                    .ok_or_else(|| WorkspaceError::TaskNotFound(id.clone()))?;
                Ok(Outcome::Removed(vec![id]))
            }
            Action::UpsertWallet { wallet } => {
                ensure_finite("wallet balance", wallet.balance)?;
                let id = wallet.id.clone();
                let created = self
                    .state
                    .finance_data
                    .wallets
                    .insert(id.clone(), wallet)
                    .is_none();
                Ok(if created {
                    Outcome::Created(id)
                } else {
                    Outcome::Updated
                })
            }
            Action::AddTransaction { transaction } => {
                self.add_transaction(transaction).map(Outcome::Created)
            }
            Action::DeleteTransaction { id } => {
                self.delete_transaction(&id)?;
                Ok(Outcome::Removed(vec![id]))
            }
            Action::AddEvent { event } => {
                let id = event.id.clone();
                if self.state.calendar_events.contains_key(&id) {
                    return Err(duplicate("event", &id));
                }
                self.state.calendar_events.insert(id.clone(), event);
                Ok(Outcome::Created(id))
            }
            Action::UpdateEvent { id, patch } => {
                self.state
                    .calendar_events
                    .get_mut(&id)
                    .ok_or_else(|| WorkspaceError::EventNotFound(id.clone()))?
                    .apply(patch);
                Ok(Outcome::Updated)
            }
            Action::DeleteEvent { id } => {
                self.state
                    .calendar_events
                    .remove(&id)
                    .ok_or_else(|| WorkspaceError::EventNotFound(id.clone()))?;
                Ok(Outcome::Removed(vec![id]))
            }
            Action::LogHealth { date, patch } => {
                if let Some(sleep) = patch.sleep_hours {
                    ensure_finite("sleep hours", sleep)?;
                }
                if let Some(weight) = patch.weight {
                    ensure_finite("weight", weight)?;
                }
                self.state.health_data.entry_mut(date).apply(patch);
                Ok(Outcome::Updated)
            }
            Action::SetSection { section } => {
                self.state.current_section = section;
                Ok(Outcome::Updated)
            }
            Action::SetSearchQuery { query } => {
                self.state.search_query = query;
                Ok(Outcome::Updated)
            }
        }
    }

    fn page(&self, id: &str) -> Result<&Page, WorkspaceError> {
        self.state
            .pages
            .get(id)
            .ok_or_else(|| WorkspaceError::PageNotFound(id.to_string()))
    }

    fn page_mut(&mut self, id: &str) -> Result<&mut Page, WorkspaceError> {
        self.state
            .pages
            .get_mut(id)
            .ok_or_else(|| WorkspaceError::PageNotFound(id.to_string()))
    }

    fn task_mut(&mut self, id: &str) -> Result<&mut DailyTask, WorkspaceError> {
        self.state
            .daily_tasks
            .get_mut(id)
            .ok_or_else(|| WorkspaceError::TaskNotFound(id.to_string()))
    }

    fn create_page(
        &mut self,
        title: Option<&str>,
        parent_id: Option<&str>,
    ) -> Result<String, WorkspaceError> {
        if let Some(parent_id) = parent_id {
            self.page(parent_id)?;
        }

        let page = Page::new(title, parent_id);
        let id = page.id.clone();
        self.state.pages.insert(id.clone(), page);
        self.attach(&id, parent_id);
        tracing::debug!(page = %id, parent = ?parent_id, "Created page");
        Ok(id)
    }

    fn delete_page(&mut self, id: &str) -> Result<Vec<String>, WorkspaceError> {
        self.page(id)?;

        let removed = self.descendants_and_self(id);
        self.detach(id);
        for page_id in &removed {
            self.state.pages.remove(page_id);
        }
        if self
            .state
            .current_page_id
            .as_ref()
            .is_some_and(|current| removed.contains(current))
        {
            self.state.current_page_id = None;
        }

        tracing::debug!(page = %id, removed = removed.len(), "Deleted page");
        Ok(removed)
    }

    fn move_page(&mut self, id: &str, new_parent: Option<&str>) -> Result<(), WorkspaceError> {
        self.page(id)?;
        if let Some(parent) = new_parent {
            self.page(parent)?;
            if self.descendants_and_self(id).iter().any(|d| d == parent) {
                return Err(WorkspaceError::InvalidMove(format!(
                    "page {} cannot move under itself or its descendant {}",
                    id, parent
                )));
            }
        }

        self.detach(id);
        self.attach(id, new_parent);
        if let Ok(page) = self.page_mut(id) {
            page.parent_id = new_parent.map(str::to_string);
            page.touch();
        }
        Ok(())
    }

    /// Append `id` to its owner list
    fn attach(&mut self, id: &str, parent_id: Option<&str>) {
        match parent_id.and_then(|p| self.state.pages.get_mut(p)) {
            Some(parent) => parent.children.push(id.to_string()),
            None => self.state.root_pages.push(id.to_string()),
        }
    }

    /// Remove `id` from whichever owner list holds it
    fn detach(&mut self, id: &str) {
        let parent_id = self.state.pages.get(id).and_then(|p| p.parent_id.clone());
        match parent_id.and_then(|p| self.state.pages.get_mut(&p)) {
            Some(parent) => parent.children.retain(|c| c != id),
            None => self.state.root_pages.retain(|r| r != id),
        }
    }

    fn reorder_blocks(
        &mut self,
        page_id: &str,
        ordered_ids: &[String],
    ) -> Result<(), WorkspaceError> {
        let page = self.page_mut(page_id)?;
        if let Some(unknown) = ordered_ids.iter().find(|id| page.block(id).is_none()) {
            return Err(WorkspaceError::BlockNotFound {
                page: page_id.to_string(),
                block: unknown.clone(),
            });
        }

        let mut sequence: Vec<String> = ordered_ids.to_vec();
        let named: HashSet<&str> = ordered_ids.iter().map(String::as_str).collect();
        sequence.extend(
            page.sorted_blocks()
                .into_iter()
                .filter(|b| !named.contains(b.id.as_str()))
                .map(|b| b.id.clone()),
        );

        for (position, block_id) in sequence.iter().enumerate() {
            if let Some(block) = page.block_mut(block_id) {
                block.order = position as i64;
            }
        }
        page.blocks.sort_by_key(|b| b.order);
        page.touch();
        Ok(())
    }

    fn add_transaction(&mut self, transaction: Transaction) -> Result<String, WorkspaceError> {
        ensure_finite("transaction amount", transaction.amount)?;
        let finance = &mut self.state.finance_data;
        let id = transaction.id.clone();
        if finance.transactions.contains_key(&id) {
            return Err(duplicate("transaction", &id));
        }
        let wallet = finance
            .wallets
            .get_mut(&transaction.wallet_id)
            .ok_or_else(|| WorkspaceError::WalletNotFound(transaction.wallet_id.clone()))?;

        let balance = wallet.balance + transaction.balance_delta();
        ensure_finite("wallet balance", balance)?;
        wallet.balance = balance;
        finance.transactions.insert(id.clone(), transaction);
        Ok(id)
    }

    fn delete_transaction(&mut self, id: &str) -> Result<(), WorkspaceError> {
        let finance = &mut self.state.finance_data;
        let transaction = finance
            .transactions
            .get(id)
            .ok_or_else(|| WorkspaceError::TransactionNotFound(id.to_string()))?;

        // The wallet may have been removed since; the transaction still goes
        if let Some(wallet) = finance.wallets.get_mut(&transaction.wallet_id) {
            let balance = wallet.balance - transaction.balance_delta();
            ensure_finite("wallet balance", balance)?;
            wallet.balance = balance;
        }
        finance.transactions.remove(id);
        Ok(())
    }

    /// Events overlapping `[from, to]` (epoch millis), earliest first
    pub fn events_between(&self, from: i64, to: i64) -> Vec<&CalendarEvent> {
        let mut events: Vec<&CalendarEvent> = self
            .state
            .calendar_events
            .values()
            .filter(|e| e.overlaps(from, to))
            .collect();
        events.sort_by_key(|e| (e.start, e.created_at));
        events
    }

    /// `id` followed by every page below it, depth first
    pub fn descendants_and_self(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![id.to_string()];

        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(page) = self.state.pages.get(&current) {
                stack.extend(page.children.iter().rev().cloned());
            }
            out.push(current);
        }
        out
    }

    /// Blocks of a page in render order
    pub fn sorted_blocks(&self, page_id: &str) -> Result<Vec<&Block>, WorkspaceError> {
        Ok(self.page(page_id)?.sorted_blocks())
    }

    /// Pages matching `query`, in tree order
    pub fn search_pages(&self, query: &str) -> Vec<&Page> {
        self.tree_order()
            .into_iter()
            .filter(|page| page.matches(query))
            .collect()
    }

    /// Every page in depth-first order starting from the root list
    pub fn tree_order(&self) -> Vec<&Page> {
        self.state
            .root_pages
            .iter()
            .flat_map(|root| self.descendants_and_self(root))
            .filter_map(|id| self.state.pages.get(&id))
            .collect()
    }

    /// Depth of a page below the root list
    pub fn depth(&self, id: &str) -> usize {
        let mut depth = 0;
        let mut cursor = self.state.pages.get(id).and_then(|p| p.parent_id.as_deref());
        while let Some(parent) = cursor {
            depth += 1;
            if depth > self.state.pages.len() {
                break;
            }
            cursor = self.state.pages.get(parent).and_then(|p| p.parent_id.as_deref());
        }
        depth
    }

    /// Tasks due on `date`, open ones first
    pub fn tasks_for(&self, date: NaiveDate) -> Vec<&DailyTask> {
        let mut tasks: Vec<&DailyTask> = self
            .state
            .daily_tasks
            .values()
            .filter(|t| t.date == date)
            .collect();
        tasks.sort_by_key(|t| (t.completed, t.created_at));
        tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifedesk_shared::{BlockKind, TransactionKind};
    use serde_json::{json, Map, Value};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn page_with_block(ws: &mut Workspace) -> (String, String) {
        let page = create(ws, "Doc", None);
        let block = Block::new(BlockKind::Image, 0)
            .with_content("Sunset")
            .with_data("url", json!("https://cdn/sunset.png"))
            .with_data("width", json!(640));
        let block_id = block.id.clone();
        ws.dispatch(Action::AddBlock {
            page_id: page.clone(),
            block,
        })
        .unwrap();
        (page, block_id)
    }

    fn create(ws: &mut Workspace, title: &str, parent: Option<&str>) -> String {
        match ws
            .dispatch(Action::CreatePage {
                title: Some(title.to_string()),
                parent_id: parent.map(str::to_string),
            })
            .unwrap()
        {
            Outcome::Created(id) => id,
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn welcome_then_subpage_scenario() {
        let mut ws = Workspace::default();

        let welcome = create(&mut ws, "Welcome to LifeDesk", None);
        assert_eq!(ws.state().root_pages, vec![welcome.clone()]);
        assert_eq!(ws.state().pages.len(), 1);
        assert!(ws.state().pages[&welcome].children.is_empty());

        let sub = create(&mut ws, "Subpage", Some(&welcome));
        assert_eq!(ws.state().pages[&welcome].children, vec![sub.clone()]);
        assert!(!ws.state().root_pages.contains(&sub));
        assert_eq!(ws.state().pages[&sub].parent_id.as_deref(), Some(welcome.as_str()));
        assert!(ws.state().violations().is_empty());
    }

    #[test]
    fn create_under_missing_parent_fails_without_change() {
        let mut ws = Workspace::default();
        let before = ws.clone();

        let err = ws
            .dispatch(Action::CreatePage {
                title: None,
                parent_id: Some("nope".to_string()),
            })
            .unwrap_err();

        assert_eq!(err, WorkspaceError::PageNotFound("nope".to_string()));
        assert_eq!(ws, before);
    }

    #[test]
    fn delete_cascades_to_subtree() {
        let mut ws = Workspace::default();
        let keep = create(&mut ws, "Keep", None);
        let root = create(&mut ws, "Root", None);
        let child = create(&mut ws, "Child", Some(&root));
        let grandchild = create(&mut ws, "Grandchild", Some(&child));
        ws.dispatch(Action::SelectPage {
            id: Some(grandchild.clone()),
        })
        .unwrap();

        let outcome = ws.dispatch(Action::DeletePage { id: root.clone() }).unwrap();

        assert_eq!(outcome, Outcome::Removed(vec![root, child, grandchild]));
        assert_eq!(ws.state().pages.len(), 1);
        assert_eq!(ws.state().root_pages, vec![keep]);
        assert_eq!(ws.state().current_page_id, None);
        assert!(ws.state().violations().is_empty());
    }

    #[test]
    fn delete_child_detaches_from_parent() {
        let mut ws = Workspace::default();
        let root = create(&mut ws, "Root", None);
        let a = create(&mut ws, "A", Some(&root));
        let b = create(&mut ws, "B", Some(&root));

        ws.dispatch(Action::DeletePage { id: a }).unwrap();

        assert_eq!(ws.state().pages[&root].children, vec![b]);
        assert!(ws.state().violations().is_empty());
    }

    #[test]
    fn move_rejects_cycles_and_reparents() {
        let mut ws = Workspace::default();
        let a = create(&mut ws, "A", None);
        let b = create(&mut ws, "B", Some(&a));
        let c = create(&mut ws, "C", None);

        let err = ws
            .dispatch(Action::MovePage {
                id: a.clone(),
                new_parent: Some(b.clone()),
            })
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::InvalidMove(_)));

        ws.dispatch(Action::MovePage {
            id: b.clone(),
            new_parent: Some(c.clone()),
        })
        .unwrap();
        assert!(ws.state().pages[&a].children.is_empty());
        assert_eq!(ws.state().pages[&c].children, vec![b.clone()]);

        ws.dispatch(Action::MovePage {
            id: b.clone(),
            new_parent: None,
        })
        .unwrap();
        assert_eq!(ws.state().root_pages, vec![a, c, b]);
        assert!(ws.state().violations().is_empty());
    }

    #[test]
    fn reorder_blocks_renumbers() {
        let mut ws = Workspace::default();
        let page = create(&mut ws, "Doc", None);
        let mut ids = Vec::new();
        for (i, text) in ["one", "two", "three"].iter().enumerate() {
            let block = Block::new(BlockKind::Text, i as i64).with_content(*text);
            ids.push(block.id.clone());
            ws.dispatch(Action::AddBlock {
                page_id: page.clone(),
                block,
            })
            .unwrap();
        }

        ws.dispatch(Action::ReorderBlocks {
            page_id: page.clone(),
            ordered_ids: vec![ids[2].clone()],
        })
        .unwrap();

        let contents: Vec<&str> = ws
            .sorted_blocks(&page)
            .unwrap()
            .iter()
            .map(|b| b.content.as_str())
            .collect();
        assert_eq!(contents, vec!["three", "one", "two"]);
    }

    #[test]
    fn transactions_move_wallet_balance() {
        let mut ws = Workspace::default();
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let income = Transaction::new("wallet-bank", TransactionKind::Income, 1_000.0, date);
        let expense = Transaction::new("wallet-bank", TransactionKind::Expense, 250.0, date);
        let expense_id = expense.id.clone();
        ws.dispatch(Action::AddTransaction { transaction: income }).unwrap();
        ws.dispatch(Action::AddTransaction { transaction: expense }).unwrap();
        assert_eq!(ws.state().finance_data.wallets["wallet-bank"].balance, 750.0);

        ws.dispatch(Action::DeleteTransaction { id: expense_id }).unwrap();
        assert_eq!(ws.state().finance_data.wallets["wallet-bank"].balance, 1_000.0);

        let orphan = Transaction::new("wallet-none", TransactionKind::Income, 5.0, date);
        assert_eq!(
            ws.dispatch(Action::AddTransaction { transaction: orphan }),
            Err(WorkspaceError::WalletNotFound("wallet-none".to_string()))
        );
    }

    #[test]
    fn tasks_for_lists_open_first() {
        let mut ws = Workspace::default();
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let other = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();

        let done = DailyTask::new("Done", day);
        let done_id = done.id.clone();
        ws.dispatch(Action::AddDailyTask { task: done }).unwrap();
        ws.dispatch(Action::AddDailyTask {
            task: DailyTask::new("Open", day),
        })
        .unwrap();
        ws.dispatch(Action::AddDailyTask {
            task: DailyTask::new("Tomorrow", other),
        })
        .unwrap();
        ws.dispatch(Action::ToggleDailyTask { id: done_id }).unwrap();

        let texts: Vec<&str> = ws.tasks_for(day).iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Open", "Done"]);
    }

    #[test]
    fn edits_are_debounced_structure_is_immediate() {
        let edit = Action::UpdatePage {
            id: "p".to_string(),
            patch: PagePatch::content("typing"),
        };
        let delete = Action::DeletePage { id: "p".to_string() };

        assert_eq!(edit.persistence(), Persistence::Debounced);
        assert_eq!(delete.persistence(), Persistence::Immediate);
    }

    #[test]
    fn search_follows_tree_order() {
        let mut ws = Workspace::default();
        let root = create(&mut ws, "Recipes", None);
        create(&mut ws, "Pasta recipe", Some(&root));
        create(&mut ws, "Travel", None);

        let titles: Vec<&str> = ws
            .search_pages("recipe")
            .iter()
            .map(|p| p.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Recipes", "Pasta recipe"]);
        assert_eq!(ws.depth(&ws.search_pages("pasta")[0].id), 1);
    }

    #[test]
    fn update_block_merges_data_and_is_debounced() {
        let mut ws = Workspace::default();
        let (page, block) = page_with_block(&mut ws);

        let mut data = Map::new();
        data.insert("width".to_string(), Value::Null);
        data.insert("caption".to_string(), json!("Evening"));
        let action = Action::UpdateBlock {
            page_id: page.clone(),
            block_id: block.clone(),
            patch: BlockPatch {
                content: Some("Sunrise".to_string()),
                data: Some(data),
                ..BlockPatch::default()
            },
        };
        assert_eq!(action.persistence(), Persistence::Debounced);
        assert_eq!(ws.dispatch(action).unwrap(), Outcome::Updated);

        let stored = ws.state().pages[&page].block(&block).unwrap();
        assert_eq!(stored.content, "Sunrise");
        assert_eq!(stored.kind, BlockKind::Image);
        assert!(!stored.data.contains_key("width"));
        assert_eq!(stored.data["caption"], json!("Evening"));
        assert_eq!(stored.media_url(), Some("https://cdn/sunset.png"));
    }

    #[test]
    fn missing_block_leaves_state_unchanged() {
        let mut ws = Workspace::default();
        let (page, _) = page_with_block(&mut ws);
        let before = ws.clone();

        let update = ws.dispatch(Action::UpdateBlock {
            page_id: page.clone(),
            block_id: "ghost".to_string(),
            patch: BlockPatch::default(),
        });
        let remove = ws.dispatch(Action::RemoveBlock {
            page_id: page.clone(),
            block_id: "ghost".to_string(),
        });
        let wrong_page = ws.dispatch(Action::RemoveBlock {
            page_id: "nope".to_string(),
            block_id: "ghost".to_string(),
        });

        let missing = WorkspaceError::BlockNotFound {
            page: page.clone(),
            block: "ghost".to_string(),
        };
        assert_eq!(update, Err(missing.clone()));
        assert_eq!(remove, Err(missing));
        assert_eq!(wrong_page, Err(WorkspaceError::PageNotFound("nope".to_string())));
        assert_eq!(ws, before);
    }

    #[test]
    fn remove_block_drops_only_that_block() {
        let mut ws = Workspace::default();
        let (page, block) = page_with_block(&mut ws);
        let other = Block::new(BlockKind::Text, 1).with_content("keep");
        let other_id = other.id.clone();
        ws.dispatch(Action::AddBlock {
            page_id: page.clone(),
            block: other,
        })
        .unwrap();

        let outcome = ws
            .dispatch(Action::RemoveBlock {
                page_id: page.clone(),
                block_id: block.clone(),
            })
            .unwrap();

        assert_eq!(outcome, Outcome::Removed(vec![block]));
        let ids: Vec<&str> = ws.state().pages[&page]
            .blocks
            .iter()
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(ids, vec![other_id.as_str()]);
    }

    #[test]
    fn update_daily_task_merges_fields() {
        let mut ws = Workspace::default();
        let task = DailyTask::new("Stretch", day(1));
        let id = task.id.clone();
        ws.dispatch(Action::AddDailyTask { task }).unwrap();

        ws.dispatch(Action::UpdateDailyTask {
            id: id.clone(),
            patch: DailyTaskPatch {
                date: Some(day(2)),
                completed: Some(true),
                ..DailyTaskPatch::default()
            },
        })
        .unwrap();

        let stored = &ws.state().daily_tasks[&id];
        assert_eq!(stored.text, "Stretch");
        assert_eq!(stored.date, day(2));
        assert!(stored.completed);
        assert!(stored.completed_at.is_some());

        let before = ws.clone();
        assert_eq!(
            ws.dispatch(Action::UpdateDailyTask {
                id: "ghost".to_string(),
                patch: DailyTaskPatch::default(),
            }),
            Err(WorkspaceError::TaskNotFound("ghost".to_string()))
        );
        assert_eq!(ws, before);
    }

    #[test]
    fn upsert_wallet_creates_then_updates() {
        let mut ws = Workspace::default();
        let mut wallet = Wallet::new("Savings", "EUR");
        let id = wallet.id.clone();

        assert_eq!(
            ws.dispatch(Action::UpsertWallet {
                wallet: wallet.clone()
            })
            .unwrap(),
            Outcome::Created(id.clone())
        );

        wallet.name = "Rainy day".to_string();
        wallet.balance = 120.0;
        assert_eq!(
            ws.dispatch(Action::UpsertWallet { wallet }).unwrap(),
            Outcome::Updated
        );
        assert_eq!(ws.state().finance_data.wallets[&id].name, "Rainy day");
        assert_eq!(ws.state().finance_data.wallets[&id].balance, 120.0);
    }

    #[test]
    fn update_and_delete_event() {
        let mut ws = Workspace::default();
        let event = CalendarEvent::new("Dentist", 1_000, 2_000);
        let id = event.id.clone();
        ws.dispatch(Action::AddEvent { event }).unwrap();

        ws.dispatch(Action::UpdateEvent {
            id: id.clone(),
            patch: CalendarEventPatch {
                start: Some(5_000),
                description: Some("Bring forms".to_string()),
                ..CalendarEventPatch::default()
            },
        })
        .unwrap();
        let stored = &ws.state().calendar_events[&id];
        assert_eq!(stored.start, 5_000);
        assert_eq!(stored.end, 5_000);
        assert_eq!(stored.description.as_deref(), Some("Bring forms"));
        assert_eq!(ws.events_between(4_000, 6_000).len(), 1);
        assert!(ws.events_between(0, 4_999).is_empty());

        let before = ws.clone();
        assert_eq!(
            ws.dispatch(Action::UpdateEvent {
                id: "ghost".to_string(),
                patch: CalendarEventPatch::default(),
            }),
            Err(WorkspaceError::EventNotFound("ghost".to_string()))
        );
        assert_eq!(
            ws.dispatch(Action::DeleteEvent {
                id: "ghost".to_string()
            }),
            Err(WorkspaceError::EventNotFound("ghost".to_string()))
        );
        assert_eq!(ws, before);

        assert_eq!(
            ws.dispatch(Action::DeleteEvent { id: id.clone() }).unwrap(),
            Outcome::Removed(vec![id])
        );
        assert!(ws.state().calendar_events.is_empty());
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        let mut ws = Workspace::default();
        ws.dispatch(Action::AddTransaction {
            transaction: Transaction::new("wallet-cash", TransactionKind::Income, 1e308, day(1)),
        })
        .unwrap();
        let before = ws.clone();

        let overflow = ws.dispatch(Action::AddTransaction {
            transaction: Transaction::new("wallet-cash", TransactionKind::Income, 1e308, day(1)),
        });
        assert!(matches!(overflow, Err(WorkspaceError::Validation(_))));

        let nan_amount = ws.dispatch(Action::AddTransaction {
            transaction: Transaction::new("wallet-cash", TransactionKind::Expense, f64::NAN, day(1)),
        });
        assert!(matches!(nan_amount, Err(WorkspaceError::Validation(_))));

        let mut wallet = Wallet::new("Broken", "USD");
        wallet.balance = f64::NAN;
        let nan_wallet = ws.dispatch(Action::UpsertWallet { wallet });
        assert!(matches!(nan_wallet, Err(WorkspaceError::Validation(_))));

        for patch in [
            HealthEntryPatch {
                sleep_hours: Some(f64::INFINITY),
                ..HealthEntryPatch::default()
            },
            HealthEntryPatch {
                weight: Some(f64::NAN),
                ..HealthEntryPatch::default()
            },
        ] {
            let result = ws.dispatch(Action::LogHealth { date: day(1), patch });
            assert!(matches!(result, Err(WorkspaceError::Validation(_))));
        }

        assert_eq!(ws, before);
        assert!(ws.state().health_data.entries.is_empty());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut ws = Workspace::default();
        let (page, block) = page_with_block(&mut ws);
        let task = DailyTask::new("Once", day(1));
        let event = CalendarEvent::new("Once", 0, 10);
        let transaction = Transaction::new("wallet-cash", TransactionKind::Income, 5.0, day(1));
        ws.dispatch(Action::AddDailyTask { task: task.clone() }).unwrap();
        ws.dispatch(Action::AddEvent {
            event: event.clone(),
        })
        .unwrap();
        ws.dispatch(Action::AddTransaction {
            transaction: transaction.clone(),
        })
        .unwrap();
        let before = ws.clone();

        let mut copy = Block::new(BlockKind::Text, 5);
        copy.id = block;
        let results = [
            ws.dispatch(Action::AddBlock {
                page_id: page,
                block: copy,
            }),
            ws.dispatch(Action::AddDailyTask { task }),
            ws.dispatch(Action::AddEvent { event }),
            ws.dispatch(Action::AddTransaction { transaction }),
        ];

        for result in results {
            assert!(matches!(result, Err(WorkspaceError::Validation(_))), "{:?}", result);
        }
        assert_eq!(ws, before);
    }
}
