//! The pages for editing an existing income or expense.

use axum::{
    Extension,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use maud::html;

use crate::{
    endpoints,
    html::{CARD_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, base},
    navigation::NavBar,
    session::Session,
    store::DocumentId,
    transaction::{
        create_endpoint::TransactionApiState,
        form::{TransactionFormDefaults, transaction_form_fields},
        model::TransactionKind,
    },
};

/// Display the page for editing an income.
pub async fn get_edit_income_page(
    state: State<TransactionApiState>,
    session: Extension<Session>,
    id: Path<DocumentId>,
) -> Response {
    edit_page(TransactionKind::Income, state, session, id)
}

/// Display the page for editing an expense.
pub async fn get_edit_expense_page(
    state: State<TransactionApiState>,
    session: Extension<Session>,
    id: Path<DocumentId>,
) -> Response {
    edit_page(TransactionKind::Expense, state, session, id)
}

fn edit_page(
    kind: TransactionKind,
    State(state): State<TransactionApiState>,
    Extension(session): Extension<Session>,
    Path(id): Path<DocumentId>,
) -> Response {
    let record = match state.store.get(kind.collection(), id, session.user_id) {
        Ok(record) => record,
        Err(error) => return error.into_response(),
    };

    let (title, active_endpoint, api, back) = match kind {
        TransactionKind::Income => (
            "Edit Income",
            endpoints::INCOME_VIEW,
            endpoints::INCOME_API,
            endpoints::INCOME_VIEW,
        ),
        TransactionKind::Expense => (
            "Edit Expense",
            endpoints::EXPENSE_VIEW,
            endpoints::EXPENSE_API,
            endpoints::EXPENSE_VIEW,
        ),
    };

    let nav_bar = NavBar::new(active_endpoint, &session);

    let content = html! {
        (nav_bar.into_html())

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class={ (CARD_STYLE) " max-w-2xl mx-auto" } hx-ext="response-targets"
            {
                h1 class="text-xl font-bold mb-4" { (title) }

                div id="form-alert" {}

                form
                    hx-put=(endpoints::format_endpoint(api, record.id))
                    hx-target-error="#form-alert"
                    class="space-y-4"
                {
                    (transaction_form_fields(&TransactionFormDefaults {
                        kind,
                        date: record.date,
                        category: Some(&record.category),
                        amount: Some(record.amount),
                        description: &record.description,
                    }))

                    div class="flex items-center gap-4"
                    {
                        button
                            type="submit"
                            tabindex="0"
                            class="bg-blue-600 text-white px-4 py-2 rounded-lg hover:bg-blue-700"
                        {
                            "Save Changes"
                        }

                        a href=(back) class=(LINK_STYLE) { "Cancel" }
                    }
                }
            }
        }
    };

    base(title, &[], &content).into_response()
}

#[cfg(test)]
mod edit_page_tests {
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
        session::{Session, SessionHub},
        store::{Collection, DocumentStore, initialize},
        test_utils::{body_text, create_test_user, draft},
        transaction::create_endpoint::TransactionApiState,
    };

    use super::get_edit_expense_page;

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

    #[tokio::test]
    async fn edit_page_prefills_the_record() {
        let (state, session) = get_test_state();
        let record = state
            .store
            .add(
                Collection::Expenses,
                session.user_id,
                &draft(date!(2023 - 10 - 02), "Rent", 1000.0),
            )
            .unwrap();

        let response = get_edit_expense_page(
            State(state),
            Extension(session),
            Path(record.id),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("2023-10-02"));
        assert!(body.contains("Rent"));
        assert!(body.contains("1000.00"));
    }

    #[tokio::test]
    async fn edit_page_for_missing_record_is_not_found() {
        let (state, session) = get_test_state();

        let response = get_edit_expense_page(State(state), Extension(session), Path(42))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
