use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{generate_id, now_millis, ModelError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    /// Amount as it affects a wallet balance
    pub fn signed(&self, amount: f64) -> f64 {
        match self {
            Self::Income => amount,
            Self::Expense => -amount,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Income => f.write_str("income"),
            Self::Expense => f.write_str("expense"),
        }
    }
}

impl FromStr for TransactionKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(ModelError::UnknownTransactionKind(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub balance: f64,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Wallet {
    pub fn new(name: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            id: generate_id("wallet"),
            name: name.into(),
            balance: 0.0,
            currency: currency.into(),
            icon: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub kind: TransactionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub wallet_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    pub kind: TransactionKind,
    /// Always positive; `kind` gives the direction
    pub amount: f64,
    #[serde(default)]
    pub note: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub created_at: i64,
}

impl Transaction {
    pub fn new(
        wallet_id: impl Into<String>,
        kind: TransactionKind,
        amount: f64,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: generate_id("tx"),
            wallet_id: wallet_id.into(),
            category_id: None,
            kind,
            amount: amount.abs(),
            note: String::new(),
            date,
            created_at: now_millis(),
        }
    }

    pub fn balance_delta(&self) -> f64 {
        self.kind.signed(self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: String,
    pub category_id: String,
    pub limit: f64,
    pub period: BudgetPeriod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsGoal {
    pub id: String,
    pub name: String,
    pub target: f64,
    #[serde(default)]
    pub saved: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceSettings {
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_budget: Option<f64>,
}

impl Default for FinanceSettings {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            monthly_budget: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceData {
    #[serde(default)]
    pub wallets: BTreeMap<String, Wallet>,
    #[serde(default)]
    pub transactions: BTreeMap<String, Transaction>,
    #[serde(default)]
    pub categories: BTreeMap<String, Category>,
    #[serde(default)]
    pub budgets: BTreeMap<String, Budget>,
    #[serde(default)]
    pub goals: BTreeMap<String, SavingsGoal>,
    #[serde(default)]
    pub settings: FinanceSettings,
}

impl Default for FinanceData {
    fn default() -> Self {
        Self::default_data()
    }
}

impl FinanceData {
    /// Canonical starting finance data: two wallets, a fixed category set and
    /// USD settings. Deterministic, so two calls compare equal.
    pub fn default_data() -> Self {
        let settings = FinanceSettings::default();
        let currency = settings.currency.clone();

        let wallets = [("wallet-cash", "Cash", "💵"), ("wallet-bank", "Bank Account", "🏦")]
            .into_iter()
            .map(|(id, name, icon)| Wallet {
                id: id.to_string(),
                name: name.to_string(),
                balance: 0.0,
                currency: currency.clone(),
                icon: Some(icon.to_string()),
            });

        let categories = [
            ("cat-salary", "Salary", TransactionKind::Income, "💼", "#22c55e"),
            ("cat-freelance", "Freelance", TransactionKind::Income, "🧑‍💻", "#10b981"),
            ("cat-food", "Food", TransactionKind::Expense, "🍔", "#f97316"),
            ("cat-transport", "Transport", TransactionKind::Expense, "🚌", "#3b82f6"),
            ("cat-housing", "Housing", TransactionKind::Expense, "🏠", "#8b5cf6"),
            ("cat-health", "Health", TransactionKind::Expense, "💊", "#ef4444"),
            ("cat-entertainment", "Entertainment", TransactionKind::Expense, "🎬", "#ec4899"),
            ("cat-other", "Other", TransactionKind::Expense, "📦", "#6b7280"),
        ]
        .into_iter()
        .map(|(id, name, kind, icon, color)| Category {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            icon: Some(icon.to_string()),
            color: Some(color.to_string()),
        });

        Self {
            wallets: wallets.map(|w| (w.id.clone(), w)).collect(),
            transactions: BTreeMap::new(),
            categories: categories.map(|c| (c.id.clone(), c)).collect(),
            budgets: BTreeMap::new(),
            goals: BTreeMap::new(),
            settings,
        }
    }

    pub fn total_balance(&self) -> f64 {
        self.wallets.values().map(|w| w.balance).sum()
    }

    /// Sum of transactions of `kind` dated within `[from, to]`
    pub fn total_for(&self, kind: TransactionKind, from: NaiveDate, to: NaiveDate) -> f64 {
        self.transactions
            .values()
            .filter(|t| t.kind == kind && t.date >= from && t.date <= to)
            .map(|t| t.amount)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_data_is_deterministic_and_keyed_by_id() {
        let a = FinanceData::default_data();
        let b = FinanceData::default_data();

        assert_eq!(a, b);
        assert_eq!(a.wallets.len(), 2);
        assert!(a.transactions.is_empty());
        assert!(a.wallets.iter().all(|(k, w)| k == &w.id));
        assert!(a.categories.iter().all(|(k, c)| k == &c.id));
        assert_eq!(a.settings.currency, "USD");
    }

    #[test]
    fn expense_reduces_balance() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let tx = Transaction::new("wallet-cash", TransactionKind::Expense, -12.5, date);

        assert_eq!(tx.amount, 12.5);
        assert_eq!(tx.balance_delta(), -12.5);
    }

    #[test]
    fn totals_respect_date_range() {
        let mut data = FinanceData::default_data();
        let may = |d| NaiveDate::from_ymd_opt(2024, 5, d).unwrap();
        for (kind, amount, day) in [
            (TransactionKind::Income, 100.0, 1),
            (TransactionKind::Expense, 30.0, 10),
            (TransactionKind::Expense, 20.0, 28),
        ] {
            let tx = Transaction::new("wallet-bank", kind, amount, may(day));
            data.transactions.insert(tx.id.clone(), tx);
        }

        assert_eq!(data.total_for(TransactionKind::Expense, may(1), may(15)), 30.0);
        assert_eq!(data.total_for(TransactionKind::Income, may(1), may(31)), 100.0);
    }
}
