//! The document store: the durable copy of every transaction, split across
//! the income and expense collections, with owner-filtered live queries.
//!
//! Mutations go through [DocumentStore] so every write is followed by
//! snapshot delivery to the collection's subscribers. A live query delivers a
//! full replacement snapshot immediately on subscribe and again after every
//! mutation of its collection.

mod live;
mod records;

pub use live::{SnapshotCallback, Subscription};
pub use records::{
    Collection, DocumentId, TransactionDraft, TransactionRecord, create_collection_tables,
    map_record_row,
};

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use rusqlite::Connection;

use crate::{
    SubscriptionError, WriteError,
    auth::{UserID, create_user_table},
    store::live::LiveQueries,
    store::records::{delete_record, get_record, insert_record, list_records, update_record},
};

/// Add the application's tables to the database.
///
/// # Errors
/// Returns an error if a table cannot be created or if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;
    create_user_table(connection)?;
    create_collection_tables(connection)?;

    Ok(())
}

/// The durable store for both transaction collections.
///
/// Cloning is cheap; clones share the connection and the live-query registry.
#[derive(Clone)]
pub struct DocumentStore {
    connection: Arc<Mutex<Connection>>,
    live: Arc<LiveQueries>,
}

impl DocumentStore {
    /// Create a store over an initialized database connection.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self {
            connection,
            live: Arc::new(LiveQueries::default()),
        }
    }

    /// The shared database connection.
    pub fn connection(&self) -> &Arc<Mutex<Connection>> {
        &self.connection
    }

    /// Acquire the database lock for a write, mapping a poisoned lock to
    /// [WriteError::StoreUnavailable].
    fn lock_for_write(&self) -> Result<std::sync::MutexGuard<'_, Connection>, WriteError> {
        self.connection
            .lock()
            .map_err(|_| WriteError::StoreUnavailable)
    }

    /// Append a record to `collection`, stamped with `owner_id`, and notify
    /// the collection's subscribers.
    ///
    /// # Errors
    /// This function will return a:
    /// - [WriteError::InvalidAmount] if the amount is negative or not a number,
    /// - [WriteError::StoreUnavailable] if the database lock is poisoned,
    /// - or [WriteError::Rejected] if the store rejects the write.
    pub fn add(
        &self,
        collection: Collection,
        owner_id: UserID,
        draft: &TransactionDraft,
    ) -> Result<TransactionRecord, WriteError> {
        validate_amount(draft.amount)?;

        let record = {
            let connection = self.lock_for_write()?;
            insert_record(collection, owner_id, draft, &connection)?
        };

        self.publish(collection);

        Ok(record)
    }

    /// Replace the editable fields of the record with `id` and notify the
    /// collection's subscribers.
    ///
    /// # Errors
    /// This function will return a [WriteError::NotFound] if `id` does not
    /// refer to a record owned by `owner_id`, plus the errors of
    /// [DocumentStore::add].
    pub fn update(
        &self,
        collection: Collection,
        id: DocumentId,
        owner_id: UserID,
        draft: &TransactionDraft,
    ) -> Result<(), WriteError> {
        validate_amount(draft.amount)?;

        {
            let connection = self.lock_for_write()?;
            update_record(collection, id, owner_id, draft, &connection)?;
        }

        self.publish(collection);

        Ok(())
    }

    /// Remove the record with `id` and notify the collection's subscribers.
    ///
    /// # Errors
    /// This function will return a [WriteError::NotFound] if `id` does not
    /// refer to a record owned by `owner_id`.
    pub fn delete(
        &self,
        collection: Collection,
        id: DocumentId,
        owner_id: UserID,
    ) -> Result<(), WriteError> {
        {
            let connection = self.lock_for_write()?;
            delete_record(collection, id, owner_id, &connection)?;
        }

        self.publish(collection);

        Ok(())
    }

    /// Retrieve a single record for `owner_id`.
    ///
    /// # Errors
    /// This function will return a [WriteError::NotFound] if `id` does not
    /// refer to a record owned by `owner_id`.
    pub fn get(
        &self,
        collection: Collection,
        id: DocumentId,
        owner_id: UserID,
    ) -> Result<TransactionRecord, WriteError> {
        let connection = self.lock_for_write()?;
        get_record(collection, id, owner_id, &connection)
    }

    /// Open a live query over `collection` filtered by `owner_id`.
    ///
    /// The callback is invoked with the current result set before this
    /// function returns, and again with a full replacement snapshot after
    /// every mutation of the collection. Delivery stops once the returned
    /// [Subscription] is cancelled or dropped.
    ///
    /// The callback must not mutate the store from inside itself.
    ///
    /// # Errors
    /// This function will return a [SubscriptionError] if the initial
    /// snapshot query fails; no subscription is registered in that case.
    pub fn subscribe(
        &self,
        collection: Collection,
        owner_id: UserID,
        callback: SnapshotCallback,
    ) -> Result<Subscription, SubscriptionError> {
        let snapshot = {
            let connection = self
                .connection
                .lock()
                .map_err(|_| SubscriptionError::StoreUnavailable)?;
            list_records(collection, owner_id, &connection)?
        };

        let (subscription, callback) = self.live.register(collection, owner_id, callback);
        (*callback.lock().expect("callback lock poisoned"))(snapshot);

        Ok(subscription)
    }

    /// Deliver fresh snapshots to every subscriber of `collection`.
    ///
    /// Failures here must not fail the mutation that triggered them: the
    /// write has already committed, so the error is logged and subscribers
    /// keep their last consistent snapshot.
    fn publish(&self, collection: Collection) {
        let watchers = self.live.watchers_of(collection);
        if watchers.is_empty() {
            return;
        }

        let mut snapshots: HashMap<UserID, Vec<TransactionRecord>> = HashMap::new();
        {
            let connection = match self.connection.lock() {
                Ok(connection) => connection,
                Err(error) => {
                    tracing::error!("could not acquire the database lock to publish: {error}");
                    return;
                }
            };

            for (_, owner_id) in &watchers {
                if snapshots.contains_key(owner_id) {
                    continue;
                }

                match list_records(collection, *owner_id, &connection) {
                    Ok(records) => {
                        snapshots.insert(*owner_id, records);
                    }
                    Err(error) => {
                        tracing::error!(
                            "snapshot query failed for owner {}: {error}",
                            owner_id.as_i64()
                        );
                    }
                }
            }
        }

        for (callback, owner_id) in watchers {
            if let Some(snapshot) = snapshots.get(&owner_id) {
                (*callback.lock().expect("callback lock poisoned"))(snapshot.clone());
            }
        }
    }
}

fn validate_amount(amount: f64) -> Result<(), WriteError> {
    // `>= 0.0` is false for NaN, so this also rejects non-numbers.
    if amount >= 0.0 && amount.is_finite() {
        Ok(())
    } else {
        Err(WriteError::InvalidAmount(amount))
    }
}

#[cfg(test)]
mod document_store_tests {
    use std::sync::{Arc, Mutex};

    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        WriteError,
        auth::UserID,
        test_utils::{create_test_user, draft},
    };

    use super::{Collection, DocumentStore, TransactionRecord, initialize};

    fn get_test_store() -> (DocumentStore, UserID) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let owner = create_test_user(&conn, "foo@bar.baz");

        (DocumentStore::new(Arc::new(Mutex::new(conn))), owner)
    }

    fn recording_callback() -> (
        Arc<Mutex<Vec<Vec<TransactionRecord>>>>,
        Box<dyn FnMut(Vec<TransactionRecord>) + Send>,
    ) {
        let snapshots = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&snapshots);

        (
            snapshots,
            Box::new(move |snapshot| sink.lock().unwrap().push(snapshot)),
        )
    }

    #[test]
    fn subscribe_delivers_initial_snapshot_immediately() {
        let (store, owner) = get_test_store();
        let record = store
            .add(
                Collection::Incomes,
                owner,
                &draft(date!(2023 - 10 - 01), "Salary", 2000.0),
            )
            .unwrap();
        let (snapshots, callback) = recording_callback();

        let _subscription = store
            .subscribe(Collection::Incomes, owner, callback)
            .unwrap();

        let delivered = snapshots.lock().unwrap();
        assert_eq!(delivered.as_slice(), &[vec![record]]);
    }

    #[test]
    fn create_then_snapshot_includes_record_with_owner() {
        let (store, owner) = get_test_store();
        let (snapshots, callback) = recording_callback();
        let _subscription = store
            .subscribe(Collection::Incomes, owner, callback)
            .unwrap();

        let record = store
            .add(
                Collection::Incomes,
                owner,
                &draft(date!(2023 - 10 - 01), "Salary", 2000.0),
            )
            .unwrap();

        let delivered = snapshots.lock().unwrap();
        let latest = delivered.last().unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0], record);
        assert_eq!(latest[0].owner_id, owner);
    }

    #[test]
    fn delete_then_snapshot_excludes_record() {
        let (store, owner) = get_test_store();
        let record = store
            .add(
                Collection::Expenses,
                owner,
                &draft(date!(2023 - 10 - 02), "Groceries", 200.0),
            )
            .unwrap();
        let (snapshots, callback) = recording_callback();
        let _subscription = store
            .subscribe(Collection::Expenses, owner, callback)
            .unwrap();

        store.delete(Collection::Expenses, record.id, owner).unwrap();

        let delivered = snapshots.lock().unwrap();
        assert_eq!(delivered.last().unwrap().as_slice(), &[]);
    }

    #[test]
    fn snapshots_are_scoped_to_the_subscribed_owner() {
        let (store, owner) = get_test_store();
        let other = {
            let connection = store.connection().lock().unwrap();
            create_test_user(&connection, "other@bar.baz")
        };
        let (snapshots, callback) = recording_callback();
        let _subscription = store
            .subscribe(Collection::Incomes, owner, callback)
            .unwrap();

        store
            .add(
                Collection::Incomes,
                other,
                &draft(date!(2023 - 10 - 04), "Freelance", 500.0),
            )
            .unwrap();

        // The other owner's insert still triggers delivery, but the snapshot
        // for this owner must stay empty.
        let delivered = snapshots.lock().unwrap();
        assert_eq!(delivered.last().unwrap().as_slice(), &[]);
    }

    #[test]
    fn cancelled_subscription_receives_nothing() {
        let (store, owner) = get_test_store();
        let (snapshots, callback) = recording_callback();
        let subscription = store
            .subscribe(Collection::Incomes, owner, callback)
            .unwrap();

        subscription.cancel();
        subscription.cancel();
        store
            .add(
                Collection::Incomes,
                owner,
                &draft(date!(2023 - 10 - 01), "Salary", 2000.0),
            )
            .unwrap();

        // Only the initial snapshot was delivered.
        assert_eq!(snapshots.lock().unwrap().len(), 1);
    }

    #[test]
    fn mutating_one_collection_does_not_notify_the_other() {
        let (store, owner) = get_test_store();
        let (snapshots, callback) = recording_callback();
        let _subscription = store
            .subscribe(Collection::Expenses, owner, callback)
            .unwrap();

        store
            .add(
                Collection::Incomes,
                owner,
                &draft(date!(2023 - 10 - 01), "Salary", 2000.0),
            )
            .unwrap();

        assert_eq!(snapshots.lock().unwrap().len(), 1);
    }

    #[test]
    fn add_rejects_negative_and_nan_amounts() {
        let (store, owner) = get_test_store();

        let negative = store.add(
            Collection::Expenses,
            owner,
            &draft(date!(2023 - 10 - 02), "Groceries", -1.0),
        );
        let not_a_number = store.add(
            Collection::Expenses,
            owner,
            &draft(date!(2023 - 10 - 02), "Groceries", f64::NAN),
        );

        assert_eq!(negative, Err(WriteError::InvalidAmount(-1.0)));
        assert!(matches!(not_a_number, Err(WriteError::InvalidAmount(_))));
    }

    #[test]
    fn update_notifies_subscribers() {
        let (store, owner) = get_test_store();
        let record = store
            .add(
                Collection::Expenses,
                owner,
                &draft(date!(2023 - 10 - 02), "Groceries", 200.0),
            )
            .unwrap();
        let (snapshots, callback) = recording_callback();
        let _subscription = store
            .subscribe(Collection::Expenses, owner, callback)
            .unwrap();

        store
            .update(
                Collection::Expenses,
                record.id,
                owner,
                &draft(date!(2023 - 10 - 02), "Groceries", 250.0),
            )
            .unwrap();

        let delivered = snapshots.lock().unwrap();
        assert_eq!(delivered.last().unwrap()[0].amount, 250.0);
    }
}
