//! The endpoints for updating an existing income or expense.

use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;

use crate::{
    endpoints,
    session::Session,
    store::DocumentId,
    transaction::{
        create_endpoint::{TransactionApiState, TransactionForm, require_session},
        model::TransactionKind,
    },
};

/// A route handler for updating an income.
pub async fn update_income_endpoint(
    state: State<TransactionApiState>,
    session: Option<Extension<Session>>,
    id: Path<DocumentId>,
    form: Form<TransactionForm>,
) -> Response {
    update_transaction_endpoint(TransactionKind::Income, state, session, id, form)
}

/// A route handler for updating an expense.
pub async fn update_expense_endpoint(
    state: State<TransactionApiState>,
    session: Option<Extension<Session>>,
    id: Path<DocumentId>,
    form: Form<TransactionForm>,
) -> Response {
    update_transaction_endpoint(TransactionKind::Expense, state, session, id, form)
}

fn update_transaction_endpoint(
    kind: TransactionKind,
    State(state): State<TransactionApiState>,
    session: Option<Extension<Session>>,
    Path(id): Path<DocumentId>,
    Form(form): Form<TransactionForm>,
) -> Response {
    let session = match require_session(&state.sessions, session.as_deref()) {
        Ok(session) => session,
        Err(error) => return error.into_response(),
    };

    if let Err(error) =
        state
            .store
            .update(kind.collection(), id, session.user_id, &form.into_draft())
    {
        return error.into_response();
    }

    let view = match kind {
        TransactionKind::Income => endpoints::INCOME_VIEW,
        TransactionKind::Expense => endpoints::EXPENSE_VIEW,
    };

    (HxRedirect(view.to_owned()), StatusCode::SEE_OTHER).into_response()
}
