//! The merged transaction model consumed by the feed, the aggregator, and
//! the views.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    auth::UserID,
    store::{Collection, DocumentId, TransactionRecord},
};

/// Whether a transaction is money earned or money spent.
///
/// The kind is derived from the collection a record came out of and is never
/// stored on the record itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Money earned. Sourced from the incomes collection.
    Income,
    /// Money spent. Sourced from the expenses collection.
    Expense,
}

impl TransactionKind {
    /// Both kinds, in a fixed order.
    pub const ALL: [TransactionKind; 2] = [TransactionKind::Income, TransactionKind::Expense];

    /// The collection records of this kind live in.
    pub fn collection(self) -> Collection {
        match self {
            TransactionKind::Income => Collection::Incomes,
            TransactionKind::Expense => Collection::Expenses,
        }
    }

    /// The display label, e.g. for the transaction table's type column.
    pub fn label(self) -> &'static str {
        match self {
            TransactionKind::Income => "Income",
            TransactionKind::Expense => "Expense",
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A transaction from either collection, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the backing record, unique within its collection.
    pub id: DocumentId,
    /// The user the transaction belongs to.
    pub owner_id: UserID,
    /// The calendar date the transaction happened on.
    pub date: Date,
    /// The transaction category.
    pub category: String,
    /// How much money moved, as a magnitude. Display layers apply the
    /// +/- presentation based on [Transaction::kind].
    pub amount: f64,
    /// Optional free-text detail.
    pub description: String,
    /// Which collection the transaction came out of.
    pub kind: TransactionKind,
}

impl Transaction {
    /// Tag a stored record with the kind of its source collection.
    pub fn from_record(record: TransactionRecord, kind: TransactionKind) -> Self {
        Self {
            id: record.id,
            owner_id: record.owner_id,
            date: record.date,
            category: record.category,
            amount: record.amount,
            description: record.description,
            kind,
        }
    }
}

#[cfg(test)]
mod transaction_kind_tests {
    use crate::store::Collection;

    use super::TransactionKind;

    #[test]
    fn kinds_map_to_their_collections() {
        assert_eq!(TransactionKind::Income.collection(), Collection::Incomes);
        assert_eq!(TransactionKind::Expense.collection(), Collection::Expenses);
    }

    #[test]
    fn labels_match_the_table_copy() {
        assert_eq!(TransactionKind::Income.label(), "Income");
        assert_eq!(TransactionKind::Expense.label(), "Expense");
    }
}
