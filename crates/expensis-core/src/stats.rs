use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::Transaction;
use crate::model::Classification;

/// Locally computed totals; no model call involved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_transactions: usize,
    pub total_income: f64,
    /// Sum of absolute values of negative amounts.
    pub total_expenses: f64,
    /// Absolute amounts per classified category.
    pub categories: BTreeMap<String, f64>,
    /// `total_expenses / total_transactions`. The denominator counts every
    /// transaction, income included.
    pub average_transaction: f64,
}

impl Statistics {
    /// Aggregate `statement`, bucketing by the first classification that
    /// names each transaction's index. Classifications pointing outside the
    /// statement never match and are ignored.
    pub fn compute(statement: &[Transaction], classifications: &[Classification]) -> Self {
        let mut by_index: HashMap<usize, &Classification> = HashMap::new();
        for c in classifications {
            by_index.entry(c.transaction_index).or_insert(c);
        }

        let mut stats = Statistics {
            total_transactions: statement.len(),
            ..Statistics::default()
        };

        for (index, tx) in statement.iter().enumerate() {
            if tx.amount > 0.0 {
                stats.total_income += tx.amount;
            } else {
                stats.total_expenses += tx.amount.abs();
            }

            if let Some(c) = by_index.get(&index) {
                *stats.categories.entry(c.category.clone()).or_insert(0.0) += tx.amount.abs();
            }
        }

        if !statement.is_empty() {
            stats.average_transaction = stats.total_expenses / statement.len() as f64;
        }

        stats
    }

    /// Income minus expenses; equals the signed sum of all amounts.
    pub fn net(&self) -> f64 {
        self.total_income - self.total_expenses
    }
}
