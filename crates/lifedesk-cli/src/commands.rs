use anyhow::{Context, Result};
use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use lifedesk_shared::{
    Block, CalendarEvent, DailyTask, HealthEntryPatch, PagePatch, Transaction, TransactionKind,
    Wallet, WorkspaceState, MEDIA_URL_FIELD,
};
use lifedesk_store::migrate::{self, RawRecord};
use lifedesk_store::{Action, FileStore, LocalCache, Outcome, Session, Workspace};
use serde_json::Value;

use crate::cli::{Command, EventCommand, HealthCommand, TaskCommand, TxCommand, WalletCommand};
use crate::config::Config;

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Local wall clock time as epoch millis
fn local_millis(at: NaiveDateTime) -> Result<i64> {
    Local
        .from_local_datetime(&at)
        .earliest()
        .map(|t| t.timestamp_millis())
        .with_context(|| format!("{} does not exist in the local time zone", at))
}

fn day_bounds(date: NaiveDate) -> Result<(i64, i64)> {
    let start = local_millis(date.and_time(NaiveTime::MIN))?;
    let next = local_millis((date + Duration::days(1)).and_time(NaiveTime::MIN))?;
    Ok((start, next - 1))
}

/// Commands that read or clear the store without opening a session
pub fn run_offline(command: &Command, cache: &mut LocalCache<FileStore>) -> Result<bool> {
    match command {
        Command::Reset => {
            cache.reset().context("Failed to reset workspace")?;
            println!("Workspace reset: {}", cache.store().path_for(cache.key()).display());
        }
        Command::Show { raw: true } => match cache.raw()? {
            Some(raw) => println!("{}", raw),
            None => println!("(nothing stored)"),
        },
        Command::Check => check(cache)?,
        Command::Stats => stats(cache)?,
        _ => return Ok(false),
    }
    Ok(true)
}

pub fn run(command: Command, session: &mut Session<FileStore>, config: &Config) -> Result<()> {
    match command {
        Command::Show { .. } => show(session.state(), config),
        Command::Tree => print_tree(session.workspace()),
        Command::NewPage { title, parent } => {
            let title = title.join(" ");
            let title = (!title.trim().is_empty()).then_some(title);
            let outcome = session.apply(Action::CreatePage {
                title,
                parent_id: parent,
            })?;
            report(outcome);
        }
        Command::EditPage {
            id,
            title,
            content,
            icon,
        } => {
            let patch = PagePatch {
                title,
                content,
                icon,
                ..PagePatch::default()
            };
            if patch.is_empty() {
                println!("Nothing to change");
                return Ok(());
            }
            session.apply(Action::UpdatePage { id, patch })?;
            println!("Updated");
        }
        Command::DeletePage { id } => {
            let outcome = session.apply(Action::DeletePage { id })?;
            report(outcome);
        }
        Command::MovePage { id, parent } => {
            session.apply(Action::MovePage {
                id,
                new_parent: parent,
            })?;
            println!("Moved");
        }
        Command::Select { id } => {
            session.apply(Action::SelectPage { id: Some(id) })?;
            println!("Selected");
        }
        Command::AddBlock {
            page,
            kind,
            content,
            url,
        } => {
            let order = session
                .state()
                .page(&page)
                .map(|p| p.next_block_order())
                .unwrap_or(0);
            let mut block = Block::new(kind, order).with_content(content.join(" "));
            if let Some(url) = url {
                block = block.with_data(MEDIA_URL_FIELD, Value::String(url));
                if kind.is_media() {
                    println!("Note: {} URLs are kept for this session only", kind);
                }
            }
            let outcome = session.apply(Action::AddBlock {
                page_id: page,
                block,
            })?;
            report(outcome);
        }
        Command::Search { query } => {
            let query = query.join(" ");
            let workspace = session.workspace();
            let hits = workspace.search_pages(&query);
            if hits.is_empty() {
                println!("No pages match '{}'", query);
            }
            for page in hits {
                println!("{} {}  [{}]", page.icon, page.title, page.id);
            }
            session.apply(Action::SetSearchQuery { query })?;
        }
        Command::Task { command } => run_task(command, session)?,
        Command::Wallet { command } => run_wallet(command, session)?,
        Command::Tx { command } => run_tx(command, session)?,
        Command::Event { command } => run_event(command, session)?,
        Command::Health { command } => run_health(command, session)?,
        Command::Section { section } => {
            session.apply(Action::SetSection { section })?;
            println!("Section: {}", section);
        }
        Command::Reset | Command::Check | Command::Stats => {}
    }
    Ok(())
}

fn run_task(command: TaskCommand, session: &mut Session<FileStore>) -> Result<()> {
    match command {
        TaskCommand::Add { text, date } => {
            let task = DailyTask::new(text.join(" "), date.unwrap_or_else(today));
            let outcome = session.apply(Action::AddDailyTask { task })?;
            report(outcome);
        }
        TaskCommand::Done { id } => {
            session.apply(Action::ToggleDailyTask { id: id.clone() })?;
            let done = session
                .state()
                .daily_tasks
                .get(&id)
                .is_some_and(|t| t.completed);
            println!("{}", if done { "Completed" } else { "Reopened" });
        }
        TaskCommand::Remove { id } => {
            let outcome = session.apply(Action::DeleteDailyTask { id })?;
            report(outcome);
        }
        TaskCommand::List { date } => {
            let date = date.unwrap_or_else(today);
            let tasks = session.workspace().tasks_for(date);
            if tasks.is_empty() {
                println!("No tasks for {}", date);
            }
            for task in tasks {
                let mark = if task.completed { "x" } else { " " };
                println!("[{}] {}  ({})", mark, task.text, task.id);
            }
        }
    }
    Ok(())
}

fn run_wallet(command: WalletCommand, session: &mut Session<FileStore>) -> Result<()> {
    match command {
        WalletCommand::Add { name, currency } => {
            let currency =
                currency.unwrap_or_else(|| session.state().finance_data.settings.currency.clone());
            let wallet = Wallet::new(name.join(" "), currency);
            let outcome = session.apply(Action::UpsertWallet { wallet })?;
            report(outcome);
        }
        WalletCommand::List => {
            for wallet in session.state().finance_data.wallets.values() {
                println!(
                    "{:>12.2} {}  {}  ({})",
                    wallet.balance, wallet.currency, wallet.name, wallet.id
                );
            }
        }
    }
    Ok(())
}

fn run_tx(command: TxCommand, session: &mut Session<FileStore>) -> Result<()> {
    match command {
        TxCommand::Add {
            wallet,
            kind,
            amount,
            note,
            date,
        } => {
            let mut transaction =
                Transaction::new(wallet, kind, amount, date.unwrap_or_else(today));
            transaction.note = note.unwrap_or_default();
            let outcome = session.apply(Action::AddTransaction { transaction })?;
            report(outcome);
        }
        TxCommand::Remove { id } => {
            let outcome = session.apply(Action::DeleteTransaction { id })?;
            report(outcome);
        }
    }
    let finance = &session.state().finance_data;
    println!(
        "Total balance: {:.2} {}",
        finance.total_balance(),
        finance.settings.currency
    );
    Ok(())
}

fn run_event(command: EventCommand, session: &mut Session<FileStore>) -> Result<()> {
    match command {
        EventCommand::Add {
            title,
            date,
            start,
            end,
        } => {
            let date = date.unwrap_or_else(today);
            let event = match start {
                Some(start) => {
                    let from = date.and_time(start);
                    let to = match end {
                        Some(end) => date.and_time(end),
                        None => from + Duration::hours(1),
                    };
                    CalendarEvent::new(title.join(" "), local_millis(from)?, local_millis(to)?)
                }
                None => {
                    let (from, to) = day_bounds(date)?;
                    let mut event = CalendarEvent::new(title.join(" "), from, to);
                    event.all_day = true;
                    event
                }
            };
            let outcome = session.apply(Action::AddEvent { event })?;
            report(outcome);
        }
        EventCommand::List { date } => {
            let date = date.unwrap_or_else(today);
            let (from, to) = day_bounds(date)?;
            let events = session.workspace().events_between(from, to);
            if events.is_empty() {
                println!("No events on {}", date);
            }
            for event in events {
                let when = if event.all_day {
                    "all day".to_string()
                } else {
                    Local
                        .timestamp_millis_opt(event.start)
                        .single()
                        .map(|t| t.format("%H:%M").to_string())
                        .unwrap_or_default()
                };
                println!("{:>8}  {}  ({})", when, event.title, event.id);
            }
        }
        EventCommand::Remove { id } => {
            let outcome = session.apply(Action::DeleteEvent { id })?;
            report(outcome);
        }
    }
    Ok(())
}

fn run_health(command: HealthCommand, session: &mut Session<FileStore>) -> Result<()> {
    let HealthCommand::Log {
        date,
        water,
        sleep,
        steps,
        weight,
    } = command;
    let date = date.unwrap_or_else(today);
    session.apply(Action::LogHealth {
        date,
        patch: HealthEntryPatch {
            water_glasses: water,
            sleep_hours: sleep,
            steps,
            weight,
            ..HealthEntryPatch::default()
        },
    })?;
    if let Some(entry) = session.state().health_data.entry(date) {
        println!(
            "{}: {} glasses, {:.1} h sleep, {} steps",
            date, entry.water_glasses, entry.sleep_hours, entry.steps
        );
    }
    Ok(())
}

fn report(outcome: Outcome) {
    match outcome {
        Outcome::Created(id) => println!("Created {}", id),
        Outcome::Removed(ids) => println!("Removed {}", ids.join(", ")),
        Outcome::Updated => println!("Updated"),
    }
}

fn show(state: &WorkspaceState, config: &Config) {
    let finance = &state.finance_data;
    let now = today();
    let month_start = now.with_day(1).unwrap_or(now);

    println!("{}", config.app_name);
    println!("  section:  {}", state.current_section);
    match state.current_page() {
        Some(page) => println!("  current:  {} {}", page.icon, page.title),
        None => println!("  current:  (none)"),
    }
    println!("  pages:    {}", state.pages.len());
    println!("  tasks:    {}", state.daily_tasks.len());
    println!("  events:   {}", state.calendar_events.len());
    println!(
        "  balance:  {:.2} {}",
        finance.total_balance(),
        finance.settings.currency
    );
    println!(
        "  month:    +{:.2} / -{:.2}",
        finance.total_for(TransactionKind::Income, month_start, now),
        finance.total_for(TransactionKind::Expense, month_start, now)
    );
    println!("  health:   {} days logged", state.health_data.entries.len());
}

fn print_tree(workspace: &Workspace) {
    for page in workspace.tree_order() {
        let indent = "  ".repeat(workspace.depth(&page.id));
        let marker = if page.children.is_empty() {
            " "
        } else if page.is_expanded.unwrap_or(true) {
            "▾"
        } else {
            "▸"
        };
        println!("{}{} {} {}  [{}]", indent, marker, page.icon, page.title, page.id);
    }
}

/// Decode the stored record without repairing it and list what is wrong
fn check(cache: &LocalCache<FileStore>) -> Result<()> {
    let Some(raw) = cache.raw()? else {
        println!("Nothing stored");
        return Ok(());
    };

    let mut record: RawRecord = match serde_json::from_str(&raw) {
        Ok(Value::Object(record)) => record,
        Ok(_) => {
            println!("Stored record is not a JSON object; it will load as an empty workspace");
            return Ok(());
        }
        Err(e) => {
            println!("Stored record is not valid JSON ({}); it will load as an empty workspace", e);
            return Ok(());
        }
    };

    let applied = migrate::migrate_value(&mut record);
    if !applied.is_empty() {
        println!("Pending migrations: {}", applied.join(", "));
    }

    let (state, issues) = migrate::decode_with_issues(record);
    let violations = state.violations();
    if issues.is_empty() && violations.is_empty() {
        println!("Workspace is consistent");
        return Ok(());
    }

    println!(
        "{} problem(s), repaired on next load:",
        issues.len() + violations.len()
    );
    for issue in issues {
        println!("  - {}", issue);
    }
    for violation in violations {
        println!("  - {}", violation);
    }
    Ok(())
}

fn stats(cache: &LocalCache<FileStore>) -> Result<()> {
    let path = cache.store().path_for(cache.key());
    let size = cache.raw()?.map(|raw| raw.len()).unwrap_or(0);
    let state = cache.load();
    let blocks: usize = state.pages.values().map(|p| p.blocks.len()).sum();

    println!("Store:        {}", path.display());
    println!("Size:         {} bytes", size);
    println!("Pages:        {} ({} blocks)", state.pages.len(), blocks);
    println!("Daily tasks:  {}", state.daily_tasks.len());
    println!("Events:       {}", state.calendar_events.len());
    println!("Transactions: {}", state.finance_data.transactions.len());
    println!("Health days:  {}", state.health_data.entries.len());
    Ok(())
}
