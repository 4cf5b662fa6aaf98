use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::amount::Amount;

/// Canonical, institution-agnostic transaction. Produced only by the
/// normalizer; a negative amount always means money leaving the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub date: NaiveDate,
    pub amount: Amount,
    pub currency: String,
    pub counterparty: String,
    pub description: String,
    /// Running balance after the transaction, when the export carries one.
    pub balance: Option<Amount>,
    /// Number of the account this record came from.
    pub account: String,
}

/// A raw row the normalizer could not turn into a record. Carried alongside
/// the records so nothing is dropped silently; never aborts anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportWarning {
    pub account: String,
    /// 1-based index among the data rows of the raw export.
    pub row: usize,
    pub raw: String,
    pub reason: String,
}
