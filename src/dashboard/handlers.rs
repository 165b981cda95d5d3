//! Dashboard HTTP handlers and view rendering.

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use time::OffsetDateTime;

use crate::{
    AppState, endpoints,
    html::{
        CARD_STYLE, FORM_SELECT_STYLE, HeadElement, PAGE_CONTAINER_STYLE, base, format_currency,
    },
    navigation::NavBar,
    session::Session,
    transaction::{
        CategoryFilter, DateOrder, FeedManager, Transaction, TransactionKind, dense_month_series,
        filter_and_sort, filter_options, group_by_date, net_balance, total_by_kind,
        transactions_table,
    },
};

use super::charts::{DashboardChart, chart_script, chart_view, month_overview_chart};

/// The state needed for displaying the dashboard page.
#[derive(Clone)]
pub struct DashboardState {
    /// One live transaction feed per signed-in owner.
    pub feeds: FeedManager,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            feeds: state.feeds.clone(),
        }
    }
}

/// Display a page with an overview of the user's finances: totals, the
/// month-to-date chart, and the merged transaction list.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(session): Extension<Session>,
) -> Response {
    let transactions = match state.feeds.feed_for(session.user_id) {
        Ok(feed) => feed.snapshot(),
        Err(error) => {
            // Show an empty overview rather than failing the page; the
            // subscription is retried on the next load.
            tracing::error!("could not open the transaction feed: {error}");
            Vec::new()
        }
    };

    let today = OffsetDateTime::now_utc().date();
    let series = dense_month_series(&group_by_date(&transactions), today.year(), today.month());
    let chart = DashboardChart {
        id: "overview-chart",
        options: month_overview_chart(&series).to_string(),
    };

    let recent = filter_and_sort(&transactions, &CategoryFilter::All, DateOrder::Newest);

    let head_elements = [
        HeadElement::ScriptLink(
            "https://cdn.jsdelivr.net/npm/echarts@5.5.1/dist/echarts.min.js".to_owned(),
        ),
        chart_script(&chart),
    ];

    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW, &session);

    let content = html! {
        (nav_bar.into_html())

        main class=(PAGE_CONTAINER_STYLE)
        {
            header class="mb-8"
            {
                h1 class="text-2xl font-bold"
                {
                    "Welcome Back, " (session.display_name) "!"
                }
                p class="text-gray-600 dark:text-gray-400"
                {
                    "Here's an overview of your finances."
                }
            }

            (summary_cards(&transactions))

            section class={ (CARD_STYLE) " mb-8" }
            {
                (chart_view(&chart))
            }

            (transaction_section(&recent))
        }
    };

    base("Overview", &head_elements, &content).into_response()
}

/// The total income, total expenses, and net balance cards.
fn summary_cards(transactions: &[Transaction]) -> Markup {
    let total_income = total_by_kind(transactions, TransactionKind::Income);
    let total_expenses = total_by_kind(transactions, TransactionKind::Expense);
    let net = net_balance(transactions);

    let card = |title: &str, value: f64, color: &str| {
        html! {
            div class=(CARD_STYLE)
            {
                h2 class="text-lg font-semibold text-gray-700 dark:text-gray-300" { (title) }
                p class={ "text-2xl font-bold " (color) } { (format_currency(value)) }
            }
        }
    };

    html! {
        section class="grid grid-cols-1 md:grid-cols-3 gap-6 mb-8"
        {
            (card("Total Income", total_income, "text-green-600 dark:text-green-500"))
            (card("Total Expenses", total_expenses, "text-red-600 dark:text-red-500"))
            (card("Net Balance", net, "text-blue-600 dark:text-blue-500"))
        }
    }
}

/// The filter and sort dropdowns plus the merged transaction table.
///
/// Changing either dropdown, and a slow poll, refresh the table fragment
/// from the live mirror.
fn transaction_section(recent: &[Transaction]) -> Markup {
    html! {
        section class=(CARD_STYLE)
        {
            h2 class="text-xl font-bold mb-4" { "Recent Transactions" }

            div class="flex gap-4 mb-6"
            {
                select
                    name="order"
                    id="order"
                    class=(FORM_SELECT_STYLE)
                    hx-get=(endpoints::TRANSACTIONS_FRAGMENT)
                    hx-include="#order, #category"
                    hx-target="#transactions-table"
                    hx-swap="outerHTML"
                {
                    option value="newest" { "Newest First" }
                    option value="oldest" { "Oldest First" }
                }

                select
                    name="category"
                    id="category"
                    class=(FORM_SELECT_STYLE)
                    hx-get=(endpoints::TRANSACTIONS_FRAGMENT)
                    hx-include="#order, #category"
                    hx-target="#transactions-table"
                    hx-swap="outerHTML"
                {
                    @for category in filter_options() {
                        option value=(category) { (category) }
                    }
                }
            }

            div
                hx-get=(endpoints::TRANSACTIONS_FRAGMENT)
                hx-include="#order, #category"
                hx-target="#transactions-table"
                hx-swap="outerHTML"
                hx-trigger="every 10s"
            {
                (transactions_table(recent))
            }
        }
    }
}

#[cfg(test)]
mod dashboard_view_tests {
    use time::macros::date;

    use crate::{
        auth::UserID,
        transaction::{Transaction, TransactionKind},
    };

    use super::summary_cards;

    #[test]
    fn summary_cards_show_totals_and_net_balance() {
        let transactions = vec![
            Transaction {
                id: 1,
                owner_id: UserID::new(1),
                date: date!(2023 - 10 - 01),
                category: "Salary".to_owned(),
                amount: 2000.0,
                description: String::new(),
                kind: TransactionKind::Income,
            },
            Transaction {
                id: 2,
                owner_id: UserID::new(1),
                date: date!(2023 - 10 - 02),
                category: "Groceries".to_owned(),
                amount: 200.0,
                description: String::new(),
                kind: TransactionKind::Expense,
            },
        ];

        let markup = summary_cards(&transactions).into_string();

        assert!(markup.contains("$2,000.00"));
        assert!(markup.contains("$200.00"));
        assert!(markup.contains("$1,800.00"));
    }
}
