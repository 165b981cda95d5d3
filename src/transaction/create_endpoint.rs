//! The endpoints for recording a new income or expense.

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, WriteError, endpoints,
    session::{Session, SessionHub},
    store::{DocumentStore, TransactionDraft},
    transaction::model::TransactionKind,
};

/// The state needed to mutate transaction records.
#[derive(Clone)]
pub struct TransactionApiState {
    /// The durable store for both transaction collections.
    pub store: DocumentStore,
    /// The active sessions.
    pub sessions: SessionHub,
}

impl FromRef<AppState> for TransactionApiState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            sessions: state.sessions.clone(),
        }
    }
}

/// The form data for creating or updating a transaction record.
#[derive(Debug, Deserialize)]
pub struct TransactionForm {
    /// The date when the transaction occurred.
    pub date: Date,
    /// The transaction category.
    pub category: String,
    /// The value of the transaction in dollars, as a magnitude.
    pub amount: f64,
    /// Optional text detailing the transaction.
    #[serde(default)]
    pub description: Option<String>,
}

impl TransactionForm {
    pub(crate) fn into_draft(self) -> TransactionDraft {
        TransactionDraft {
            date: self.date,
            category: self.category,
            amount: self.amount,
            description: self.description.unwrap_or_default(),
        }
    }
}

/// The session of the signed-in user, re-checked against the hub at mutation
/// time.
///
/// The auth guard already vetted the request, but a mutation must also fail
/// cleanly when the session ended between the page load and the submit.
pub(crate) fn require_session(
    sessions: &SessionHub,
    session: Option<&Session>,
) -> Result<Session, WriteError> {
    let session = session.ok_or(WriteError::NoSession)?;

    sessions
        .current(session.user_id)
        .ok_or(WriteError::NoSession)
}

/// A route handler for recording a new income.
pub async fn create_income_endpoint(
    state: State<TransactionApiState>,
    session: Option<Extension<Session>>,
    form: Form<TransactionForm>,
) -> Response {
    create_transaction_endpoint(TransactionKind::Income, state, session, form)
}

/// A route handler for recording a new expense.
pub async fn create_expense_endpoint(
    state: State<TransactionApiState>,
    session: Option<Extension<Session>>,
    form: Form<TransactionForm>,
) -> Response {
    create_transaction_endpoint(TransactionKind::Expense, state, session, form)
}

fn create_transaction_endpoint(
    kind: TransactionKind,
    State(state): State<TransactionApiState>,
    session: Option<Extension<Session>>,
    Form(form): Form<TransactionForm>,
) -> Response {
    let session = match require_session(&state.sessions, session.as_deref()) {
        Ok(session) => session,
        Err(error) => return error.into_response(),
    };

    if let Err(error) = state
        .store
        .add(kind.collection(), session.user_id, &form.into_draft())
    {
        return error.into_response();
    }

    let view = match kind {
        TransactionKind::Income => endpoints::INCOME_VIEW,
        TransactionKind::Expense => endpoints::EXPENSE_VIEW,
    };

    (HxRedirect(view.to_owned()), StatusCode::SEE_OTHER).into_response()
}

#[cfg(test)]
mod create_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};
    use axum_extra::extract::Form;
    use axum_htmx::HX_REDIRECT;
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        session::{Session, SessionHub},
        store::{Collection, DocumentStore, initialize},
        test_utils::create_test_user,
    };

    use super::{TransactionApiState, TransactionForm, create_income_endpoint};

    fn get_test_state() -> (TransactionApiState, Session) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let owner = create_test_user(&conn, "foo@bar.baz");

        let session = Session {
            user_id: owner,
            display_name: "Ferris".to_owned(),
            photo_url: None,
        };

        (
            TransactionApiState {
                store: DocumentStore::new(Arc::new(Mutex::new(conn))),
                sessions: SessionHub::new(),
            },
            session,
        )
    }

    fn test_form() -> TransactionForm {
        TransactionForm {
            date: date!(2023 - 10 - 01),
            category: "Salary".to_owned(),
            amount: 2000.0,
            description: Some("October salary".to_owned()),
        }
    }

    #[tokio::test]
    async fn create_stamps_owner_and_redirects() {
        let (state, session) = get_test_state();
        state.sessions.sign_in(session.clone());

        let response = create_income_endpoint(
            State(state.clone()),
            Some(Extension(session.clone())),
            Form(test_form()),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(HX_REDIRECT).unwrap(),
            crate::endpoints::INCOME_VIEW
        );

        let record = state
            .store
            .get(Collection::Incomes, 1, session.user_id)
            .unwrap();
        assert_eq!(record.owner_id, session.user_id);
        assert_eq!(record.amount, 2000.0);
        assert_eq!(record.description, "October salary");
    }

    #[tokio::test]
    async fn create_without_session_fails_with_unauthorized() {
        let (state, _) = get_test_state();

        let response = create_income_endpoint(State(state.clone()), None, Form(test_form()))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_after_sign_out_fails_with_unauthorized() {
        let (state, session) = get_test_state();
        // The page was loaded while signed in, but the session ended before
        // the form was submitted.
        state.sessions.sign_in(session.clone());
        state.sessions.sign_out(session.user_id);

        let response = create_income_endpoint(
            State(state.clone()),
            Some(Extension(session.clone())),
            Form(test_form()),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_with_negative_amount_is_rejected() {
        let (state, session) = get_test_state();
        state.sessions.sign_in(session.clone());

        let mut form = test_form();
        form.amount = -5.0;

        let response =
            create_income_endpoint(State(state.clone()), Some(Extension(session)), Form(form))
                .await
                .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
