//! The income and expense pages: an add form, a running total, and the
//! transaction list for one kind.

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

use crate::{
    AppState, endpoints,
    html::{
        BUTTON_DELETE_STYLE, CARD_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency, signed_amount,
    },
    navigation::NavBar,
    session::Session,
    transaction::{
        FeedManager,
        aggregation::total_by_kind,
        form::{TransactionFormDefaults, transaction_form_fields},
        model::{Transaction, TransactionKind},
    },
};

/// The state needed to render the income and expense pages.
#[derive(Clone)]
pub struct TransactionPagesState {
    /// One live transaction feed per signed-in owner.
    pub feeds: FeedManager,
}

impl FromRef<AppState> for TransactionPagesState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            feeds: state.feeds.clone(),
        }
    }
}

/// Display the page for recording and listing incomes.
pub async fn get_income_page(
    State(state): State<TransactionPagesState>,
    Extension(session): Extension<Session>,
) -> Response {
    transaction_page(TransactionKind::Income, &state, &session)
}

/// Display the page for recording and listing expenses.
pub async fn get_expense_page(
    State(state): State<TransactionPagesState>,
    Extension(session): Extension<Session>,
) -> Response {
    transaction_page(TransactionKind::Expense, &state, &session)
}

struct KindCopy {
    title: &'static str,
    subtitle: &'static str,
    form_title: &'static str,
    total_title: &'static str,
    list_title: &'static str,
    submit_label: &'static str,
    active_endpoint: &'static str,
    create_endpoint: &'static str,
}

fn copy_for(kind: TransactionKind) -> KindCopy {
    match kind {
        TransactionKind::Income => KindCopy {
            title: "Income",
            subtitle: "Manage your income transactions.",
            form_title: "Add Income",
            total_title: "Total Income",
            list_title: "Income Transactions",
            submit_label: "Add Income",
            active_endpoint: endpoints::INCOME_VIEW,
            create_endpoint: endpoints::INCOMES_API,
        },
        TransactionKind::Expense => KindCopy {
            title: "Expenses",
            subtitle: "Manage your expense transactions.",
            form_title: "Add Expense",
            total_title: "Total Expenses",
            list_title: "Expense Transactions",
            submit_label: "Add Expense",
            active_endpoint: endpoints::EXPENSE_VIEW,
            create_endpoint: endpoints::EXPENSES_API,
        },
    }
}

fn transaction_page(
    kind: TransactionKind,
    state: &TransactionPagesState,
    session: &Session,
) -> Response {
    let transactions = match state.feeds.feed_for(session.user_id) {
        Ok(feed) => feed.snapshot(),
        Err(error) => {
            tracing::error!("could not open the transaction feed: {error}");
            Vec::new()
        }
    };

    let mut of_kind: Vec<Transaction> = transactions
        .into_iter()
        .filter(|transaction| transaction.kind == kind)
        .collect();
    of_kind.sort_by(|a, b| b.date.cmp(&a.date));

    let total = total_by_kind(&of_kind, kind);
    let copy = copy_for(kind);
    let nav_bar = NavBar::new(copy.active_endpoint, session);

    let today = time::OffsetDateTime::now_utc().date();
    let total_color = match kind {
        TransactionKind::Income => "text-green-600 dark:text-green-500",
        TransactionKind::Expense => "text-red-600 dark:text-red-500",
    };

    let content = html! {
        (nav_bar.into_html())

        main class=(PAGE_CONTAINER_STYLE)
        {
            header class="mb-8"
            {
                h1 class="text-2xl font-bold" { (copy.title) }
                p class="text-gray-600 dark:text-gray-400" { (copy.subtitle) }
            }

            section class={ (CARD_STYLE) " mb-8" } hx-ext="response-targets"
            {
                h2 class="text-xl font-bold mb-4" { (copy.form_title) }

                div id="form-alert" {}

                form
                    hx-post=(copy.create_endpoint)
                    hx-target-error="#form-alert"
                    class="space-y-4"
                {
                    (transaction_form_fields(&TransactionFormDefaults {
                        kind,
                        date: today,
                        category: None,
                        amount: None,
                        description: "",
                    }))

                    button
                        type="submit"
                        tabindex="0"
                        class="bg-blue-600 text-white px-4 py-2 rounded-lg hover:bg-blue-700"
                    {
                        (copy.submit_label)
                    }
                }
            }

            section class={ (CARD_STYLE) " mb-8" }
            {
                h2 class="text-xl font-bold mb-4" { (copy.total_title) }
                p class={ "text-2xl font-bold " (total_color) } { (format_currency(total)) }
            }

            section class=(CARD_STYLE) hx-ext="response-targets"
            {
                h2 class="text-xl font-bold mb-4" { (copy.list_title) }

                div id="list-alert" {}

                (kind_table(kind, &of_kind))
            }
        }
    };

    base(copy.title, &[], &content).into_response()
}

fn kind_table(kind: TransactionKind, transactions: &[Transaction]) -> Markup {
    let (edit_view, api) = match kind {
        TransactionKind::Income => (endpoints::EDIT_INCOME_VIEW, endpoints::INCOME_API),
        TransactionKind::Expense => (endpoints::EDIT_EXPENSE_VIEW, endpoints::EXPENSE_API),
    };

    html! {
        div class="overflow-x-auto"
        {
            @if transactions.is_empty() {
                p class="text-gray-500 dark:text-gray-400 py-4" { "Nothing recorded yet." }
            } @else {
                table class="w-full text-sm text-left text-gray-700 dark:text-gray-300"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th class=(TABLE_CELL_STYLE) { "Date" }
                            th class=(TABLE_CELL_STYLE) { "Category" }
                            th class=(TABLE_CELL_STYLE) { "Amount" }
                            th class=(TABLE_CELL_STYLE) { "Description" }
                            th class=(TABLE_CELL_STYLE) { "Actions" }
                        }
                    }

                    tbody
                    {
                        @for transaction in transactions {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                td class=(TABLE_CELL_STYLE) { (transaction.date) }
                                td class=(TABLE_CELL_STYLE) { (transaction.category) }
                                td class=(TABLE_CELL_STYLE)
                                {
                                    (signed_amount(
                                        transaction.amount,
                                        kind == TransactionKind::Income,
                                    ))
                                }
                                td class=(TABLE_CELL_STYLE) { (transaction.description) }
                                td class={ (TABLE_CELL_STYLE) " whitespace-nowrap" }
                                {
                                    a
                                        href=(endpoints::format_endpoint(edit_view, transaction.id))
                                        class=(LINK_STYLE)
                                    {
                                        "Edit"
                                    }

                                    " "

                                    button
                                        hx-delete=(endpoints::format_endpoint(api, transaction.id))
                                        hx-confirm="Delete this transaction?"
                                        hx-target-error="#list-alert"
                                        class=(BUTTON_DELETE_STYLE)
                                    {
                                        "Delete"
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
