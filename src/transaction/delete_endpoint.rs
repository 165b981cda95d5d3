//! The endpoints for deleting an income or expense.

use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;

use crate::{
    endpoints,
    session::Session,
    store::DocumentId,
    transaction::{
        create_endpoint::{TransactionApiState, require_session},
        model::TransactionKind,
    },
};

/// A route handler for deleting an income.
pub async fn delete_income_endpoint(
    state: State<TransactionApiState>,
    session: Option<Extension<Session>>,
    id: Path<DocumentId>,
) -> Response {
    delete_transaction_endpoint(TransactionKind::Income, state, session, id)
}

/// A route handler for deleting an expense.
pub async fn delete_expense_endpoint(
    state: State<TransactionApiState>,
    session: Option<Extension<Session>>,
    id: Path<DocumentId>,
) -> Response {
    delete_transaction_endpoint(TransactionKind::Expense, state, session, id)
}

fn delete_transaction_endpoint(
    kind: TransactionKind,
    State(state): State<TransactionApiState>,
    session: Option<Extension<Session>>,
    Path(id): Path<DocumentId>,
) -> Response {
    let session = match require_session(&state.sessions, session.as_deref()) {
        Ok(session) => session,
        Err(error) => return error.into_response(),
    };

    // Ownership is checked here, not just by the route guard: the statement
    // only matches records owned by the signed-in user, so deleting someone
    // else's record reports not-found without revealing it exists.
    if let Err(error) = state.store.delete(kind.collection(), id, session.user_id) {
        return error.into_response();
    }

    let view = match kind {
        TransactionKind::Income => endpoints::INCOME_VIEW,
        TransactionKind::Expense => endpoints::EXPENSE_VIEW,
    };

    (HxRedirect(view.to_owned()), StatusCode::SEE_OTHER).into_response()
}

#[cfg(test)]
mod delete_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        WriteError,
        session::{Session, SessionHub},
        store::{Collection, DocumentStore, initialize},
        test_utils::{create_test_user, draft},
    };

    use super::{TransactionApiState, delete_expense_endpoint};

    fn get_test_state() -> (TransactionApiState, Session) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let owner = create_test_user(&conn, "foo@bar.baz");

        let session = Session {
            user_id: owner,
            display_name: "Ferris".to_owned(),
            photo_url: None,
        };

        let state = TransactionApiState {
            store: DocumentStore::new(Arc::new(Mutex::new(conn))),
            sessions: SessionHub::new(),
        };
        state.sessions.sign_in(session.clone());

        (state, session)
    }

    #[tokio::test]
    async fn delete_removes_the_record() {
        let (state, session) = get_test_state();
        let record = state
            .store
            .add(
                Collection::Expenses,
                session.user_id,
                &draft(date!(2023 - 10 - 02), "Groceries", 200.0),
            )
            .unwrap();

        let response = delete_expense_endpoint(
            State(state.clone()),
            Some(Extension(session.clone())),
            Path(record.id),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            state
                .store
                .get(Collection::Expenses, record.id, session.user_id),
            Err(WriteError::NotFound)
        );
    }

    #[tokio::test]
    async fn delete_of_missing_record_is_not_found() {
        let (state, session) = get_test_state();

        let response = delete_expense_endpoint(State(state), Some(Extension(session)), Path(42))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_of_someone_elses_record_is_not_found() {
        let (state, session) = get_test_state();
        let other = {
            let connection = state.store.connection().lock().unwrap();
            create_test_user(&connection, "other@bar.baz")
        };
        let record = state
            .store
            .add(
                Collection::Expenses,
                other,
                &draft(date!(2023 - 10 - 03), "Rent", 1000.0),
            )
            .unwrap();

        let response = delete_expense_endpoint(
            State(state.clone()),
            Some(Extension(session)),
            Path(record.id),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        // The record is untouched.
        assert!(state.store.get(Collection::Expenses, record.id, other).is_ok());
    }
}
