//! The merged transaction table and the fragment endpoint that filters,
//! sorts, and refreshes it.

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use serde::Deserialize;

use crate::{
    AppState,
    html::{TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, signed_amount},
    session::Session,
    transaction::{
        FeedManager,
        aggregation::{DateOrder, filter_and_sort},
        category::CategoryFilter,
        model::{Transaction, TransactionKind},
    },
};

/// The state needed to render the transaction table fragment.
#[derive(Clone)]
pub struct TransactionTableState {
    /// One live transaction feed per signed-in owner.
    pub feeds: FeedManager,
}

impl FromRef<AppState> for TransactionTableState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            feeds: state.feeds.clone(),
        }
    }
}

/// The filter and sort controls of the transaction table.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionTableQuery {
    /// The category to keep, or "All".
    #[serde(default)]
    pub category: CategoryFilter,
    /// Newest or oldest first.
    #[serde(default)]
    pub order: DateOrder,
}

/// Render the merged transaction table for the signed-in user, filtered and
/// sorted per the query.
///
/// The dashboard polls this fragment, so the table tracks the live mirror
/// without a full page reload.
pub async fn get_transactions_fragment(
    State(state): State<TransactionTableState>,
    Extension(session): Extension<Session>,
    Query(query): Query<TransactionTableQuery>,
) -> Response {
    let transactions = match state.feeds.feed_for(session.user_id) {
        Ok(feed) => feed.snapshot(),
        Err(error) => {
            // Stale-but-consistent beats a broken page: render empty.
            tracing::error!("could not open the transaction feed: {error}");
            Vec::new()
        }
    };

    let rows = filter_and_sort(&transactions, &query.category, query.order);

    transactions_table(&rows).into_response()
}

/// The merged transaction table: date, category, amount, and type columns.
pub fn transactions_table(transactions: &[Transaction]) -> Markup {
    html! {
        div id="transactions-table" class="overflow-x-auto"
        {
            @if transactions.is_empty() {
                p class="text-gray-500 dark:text-gray-400 py-4"
                {
                    "No transactions yet."
                }
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
                            th class=(TABLE_CELL_STYLE) { "Type" }
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
                                        transaction.kind == TransactionKind::Income,
                                    ))
                                }
                                td class=(TABLE_CELL_STYLE) { (transaction.kind) }
                            }
                        }
                    }
                }
            }
        }
    }
}
