//! Defines the transaction record schema and the database queries for the
//! income and expense collections.
//!
//! Both collections share one schema; which collection a record lives in is
//! the only thing that decides whether it is an income or an expense. The
//! record itself never stores that flag, so it cannot fall out of sync.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{WriteError, auth::UserID};

/// The ID of a record within its collection, assigned by the store on insert.
pub type DocumentId = i64;

/// The two transaction collections held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Money earned.
    Incomes,
    /// Money spent.
    Expenses,
}

impl Collection {
    /// Both collections, in a fixed order.
    pub const ALL: [Collection; 2] = [Collection::Incomes, Collection::Expenses];

    pub(crate) fn table(self) -> &'static str {
        match self {
            Collection::Incomes => "income",
            Collection::Expenses => "expense",
        }
    }
}

/// A transaction record as stored in one of the two collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// The ID of the record, unique within its collection.
    pub id: DocumentId,
    /// The user the record belongs to.
    pub owner_id: UserID,
    /// The calendar date the transaction happened on.
    pub date: Date,
    /// The transaction category, e.g. "Salary" or "Groceries".
    pub category: String,
    /// How much money moved. Always a magnitude, never signed.
    pub amount: f64,
    /// Optional free-text detail. Empty when the user left it blank.
    pub description: String,
}

/// The user-editable fields of a transaction record.
///
/// The store stamps the owner and assigns the ID on insert, so callers only
/// ever hand over these fields.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    /// The calendar date the transaction happened on.
    pub date: Date,
    /// The transaction category.
    pub category: String,
    /// How much money moved, as a non-negative magnitude.
    pub amount: f64,
    /// Optional free-text detail.
    pub description: String,
}

/// Create the income and expense tables.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn create_collection_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    for collection in Collection::ALL {
        connection.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS \"{}\" (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    owner_id INTEGER NOT NULL,
                    date TEXT NOT NULL,
                    category TEXT NOT NULL,
                    amount REAL NOT NULL,
                    description TEXT NOT NULL,
                    FOREIGN KEY(owner_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                    )",
                collection.table()
            ),
            (),
        )?;

        // Owner-filtered snapshot queries are the hot path.
        connection.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS idx_{0}_owner ON \"{0}\"(owner_id);",
                collection.table()
            ),
            (),
        )?;
    }

    Ok(())
}

/// Insert a new record into `collection`, stamped with `owner_id`.
///
/// # Errors
/// This function will return a [WriteError::Rejected] if `owner_id` does not
/// refer to a real user or there is some other SQL error.
pub fn insert_record(
    collection: Collection,
    owner_id: UserID,
    draft: &TransactionDraft,
    connection: &Connection,
) -> Result<TransactionRecord, WriteError> {
    let record = connection
        .prepare(&format!(
            "INSERT INTO \"{}\" (owner_id, date, category, amount, description)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, owner_id, date, category, amount, description",
            collection.table()
        ))?
        .query_row(
            (
                owner_id.as_i64(),
                draft.date,
                &draft.category,
                draft.amount,
                &draft.description,
            ),
            map_record_row,
        )?;

    Ok(record)
}

/// Replace the editable fields of the record with `id`, if it belongs to
/// `owner_id`.
///
/// # Errors
/// This function will return a:
/// - [WriteError::NotFound] if `id` does not refer to a record owned by
///   `owner_id`,
/// - or [WriteError::Rejected] if there is some other SQL error.
pub fn update_record(
    collection: Collection,
    id: DocumentId,
    owner_id: UserID,
    draft: &TransactionDraft,
    connection: &Connection,
) -> Result<(), WriteError> {
    let rows_updated = connection.execute(
        &format!(
            "UPDATE \"{}\" SET date = ?1, category = ?2, amount = ?3, description = ?4
             WHERE id = ?5 AND owner_id = ?6",
            collection.table()
        ),
        (
            draft.date,
            &draft.category,
            draft.amount,
            &draft.description,
            id,
            owner_id.as_i64(),
        ),
    )?;

    if rows_updated == 0 {
        return Err(WriteError::NotFound);
    }

    Ok(())
}

/// Remove the record with `id` from `collection`, if it belongs to
/// `owner_id`.
///
/// # Errors
/// This function will return a:
/// - [WriteError::NotFound] if `id` does not refer to a record owned by
///   `owner_id`,
/// - or [WriteError::Rejected] if there is some other SQL error.
pub fn delete_record(
    collection: Collection,
    id: DocumentId,
    owner_id: UserID,
    connection: &Connection,
) -> Result<(), WriteError> {
    let rows_deleted = connection.execute(
        &format!(
            "DELETE FROM \"{}\" WHERE id = ?1 AND owner_id = ?2",
            collection.table()
        ),
        (id, owner_id.as_i64()),
    )?;

    if rows_deleted == 0 {
        return Err(WriteError::NotFound);
    }

    Ok(())
}

/// Retrieve the record with `id` from `collection`, if it belongs to
/// `owner_id`.
///
/// # Errors
/// This function will return a:
/// - [WriteError::NotFound] if `id` does not refer to a record owned by
///   `owner_id`,
/// - or [WriteError::Rejected] if there is some other SQL error.
pub fn get_record(
    collection: Collection,
    id: DocumentId,
    owner_id: UserID,
    connection: &Connection,
) -> Result<TransactionRecord, WriteError> {
    let record = connection
        .prepare(&format!(
            "SELECT id, owner_id, date, category, amount, description
             FROM \"{}\" WHERE id = :id AND owner_id = :owner_id",
            collection.table()
        ))?
        .query_row(
            &[(":id", &id), (":owner_id", &owner_id.as_i64())],
            map_record_row,
        )?;

    Ok(record)
}

/// Retrieve every record in `collection` that belongs to `owner_id`.
///
/// Records are returned in insertion (id) order. Consumers that sort by date
/// rely on this as the deterministic tie-break for same-date records.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn list_records(
    collection: Collection,
    owner_id: UserID,
    connection: &Connection,
) -> Result<Vec<TransactionRecord>, rusqlite::Error> {
    connection
        .prepare(&format!(
            "SELECT id, owner_id, date, category, amount, description
             FROM \"{}\" WHERE owner_id = :owner_id ORDER BY id",
            collection.table()
        ))?
        .query_map(&[(":owner_id", &owner_id.as_i64())], map_record_row)?
        .collect()
}

/// Map a database row to a [TransactionRecord].
pub fn map_record_row(row: &Row) -> Result<TransactionRecord, rusqlite::Error> {
    Ok(TransactionRecord {
        id: row.get(0)?,
        owner_id: UserID::new(row.get(1)?),
        date: row.get(2)?,
        category: row.get(3)?,
        amount: row.get(4)?,
        description: row.get(5)?,
    })
}
