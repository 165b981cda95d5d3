//! Pure aggregation over a snapshot of the merged transaction list.
//!
//! Everything in this module is synchronous and side-effect free: totals per
//! kind, the net balance, per-date grouping, the zero-filled calendar series
//! the chart consumes, and the filter + sort used by the transaction table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::transaction::{
    category::CategoryFilter,
    model::{Transaction, TransactionKind},
};

/// Sum of amounts for one calendar day, split by kind.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DayTotals {
    /// Total income recorded on the day.
    pub income: f64,
    /// Total expenses recorded on the day.
    pub expense: f64,
}

/// One entry of the dense calendar series: a day and its totals, zero-filled
/// when nothing was recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    /// The calendar day.
    pub date: Date,
    /// Total income recorded on the day.
    pub income: f64,
    /// Total expenses recorded on the day.
    pub expense: f64,
}

/// The sort direction for the transaction table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateOrder {
    /// Descending by date.
    #[default]
    Newest,
    /// Ascending by date.
    Oldest,
}

/// Sum the amounts of every transaction of `kind`. Empty input yields zero.
pub fn total_by_kind(transactions: &[Transaction], kind: TransactionKind) -> f64 {
    transactions
        .iter()
        .filter(|transaction| transaction.kind == kind)
        .map(|transaction| transaction.amount)
        .sum()
}

/// Total income minus total expenses.
pub fn net_balance(transactions: &[Transaction]) -> f64 {
    total_by_kind(transactions, TransactionKind::Income)
        - total_by_kind(transactions, TransactionKind::Expense)
}

/// Accumulate each transaction's amount into its date's bucket, split by
/// kind.
///
/// Days with no transactions are absent from the mapping; use
/// [dense_month_series] to zero-fill for charting.
pub fn group_by_date(transactions: &[Transaction]) -> HashMap<Date, DayTotals> {
    let mut grouped: HashMap<Date, DayTotals> = HashMap::new();

    for transaction in transactions {
        let totals = grouped.entry(transaction.date).or_default();
        match transaction.kind {
            TransactionKind::Income => totals.income += transaction.amount,
            TransactionKind::Expense => totals.expense += transaction.amount,
        }
    }

    grouped
}

/// Produce one entry per calendar day of the given month, in ascending date
/// order, filling days absent from `grouped` with zeroes.
///
/// The last day of the month is computed as the day before the first day of
/// the following month.
pub fn dense_month_series(
    grouped: &HashMap<Date, DayTotals>,
    year: i32,
    month: Month,
) -> Vec<SeriesPoint> {
    let first = Date::from_calendar_date(year, month, 1).expect("day one is valid in every month");
    let (next_year, next_month) = match month {
        Month::December => (year + 1, Month::January),
        _ => (year, month.next()),
    };
    let last = Date::from_calendar_date(next_year, next_month, 1)
        .expect("day one is valid in every month")
        .previous_day()
        .expect("every month has a last day");

    let mut series = Vec::with_capacity(last.day() as usize);
    let mut day = first;
    loop {
        let totals = grouped.get(&day).copied().unwrap_or_default();
        series.push(SeriesPoint {
            date: day,
            income: totals.income,
            expense: totals.expense,
        });

        if day == last {
            break;
        }
        day = day.next_day().expect("next day exists within the month");
    }

    series
}

/// Keep the transactions passing `filter` and order them by date.
///
/// The sort is stable and snapshots arrive in id order, so same-date
/// transactions keep their insertion order.
pub fn filter_and_sort(
    transactions: &[Transaction],
    filter: &CategoryFilter,
    order: DateOrder,
) -> Vec<Transaction> {
    let mut selected: Vec<Transaction> = transactions
        .iter()
        .filter(|transaction| filter.matches(&transaction.category))
        .cloned()
        .collect();

    match order {
        DateOrder::Newest => selected.sort_by(|a, b| b.date.cmp(&a.date)),
        DateOrder::Oldest => selected.sort_by(|a, b| a.date.cmp(&b.date)),
    }

    selected
}
