//! The category lists offered in the add/edit forms and the dashboard
//! filter.
//!
//! These are suggestions for the form dropdowns, not an enforced invariant:
//! the store accepts any category string, so records written by older
//! versions of the app keep working.

use serde::{Deserialize, Serialize};

use crate::transaction::model::TransactionKind;

/// The categories offered when recording an income.
pub const INCOME_CATEGORIES: &[&str] = &["Salary", "Freelance", "Investment", "Other"];

/// The categories offered when recording an expense.
pub const EXPENSE_CATEGORIES: &[&str] = &[
    "Groceries",
    "Rent",
    "Utilities",
    "Transportation",
    "Entertainment",
    "Other",
];

/// The sentinel dropdown entry that disables category filtering.
pub const ALL_CATEGORIES: &str = "All";

/// The category dropdown for forms of the given kind.
pub fn categories_for(kind: TransactionKind) -> &'static [&'static str] {
    match kind {
        TransactionKind::Income => INCOME_CATEGORIES,
        TransactionKind::Expense => EXPENSE_CATEGORIES,
    }
}

/// The dashboard filter dropdown: "All" followed by every known category.
pub fn filter_options() -> Vec<&'static str> {
    let mut options = vec![ALL_CATEGORIES];
    options.extend(INCOME_CATEGORIES);
    let existing = options.clone();
    options.extend(
        EXPENSE_CATEGORIES
            .iter()
            .filter(|category| !existing.contains(category)),
    );

    options
}

/// A category filter: either the "All" sentinel or one exact category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CategoryFilter {
    /// Match every transaction.
    All,
    /// Match transactions with exactly this category.
    Category(String),
}

impl CategoryFilter {
    /// Whether a transaction with `category` passes the filter.
    pub fn matches(&self, category: &str) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Category(wanted) => wanted == category,
        }
    }

    /// The dropdown value this filter renders as.
    pub fn as_str(&self) -> &str {
        match self {
            CategoryFilter::All => ALL_CATEGORIES,
            CategoryFilter::Category(category) => category,
        }
    }
}

impl Default for CategoryFilter {
    fn default() -> Self {
        CategoryFilter::All
    }
}

impl From<String> for CategoryFilter {
    fn from(value: String) -> Self {
        if value == ALL_CATEGORIES {
            CategoryFilter::All
        } else {
            CategoryFilter::Category(value)
        }
    }
}

impl From<CategoryFilter> for String {
    fn from(value: CategoryFilter) -> Self {
        value.as_str().to_owned()
    }
}

#[cfg(test)]
mod category_filter_tests {
    use super::{ALL_CATEGORIES, CategoryFilter, filter_options};

    #[test]
    fn all_matches_everything() {
        let filter = CategoryFilter::All;

        assert!(filter.matches("Salary"));
        assert!(filter.matches("Something the app has never heard of"));
    }

    #[test]
    fn category_matches_exactly() {
        let filter = CategoryFilter::Category("Rent".to_owned());

        assert!(filter.matches("Rent"));
        assert!(!filter.matches("rent"));
        assert!(!filter.matches("Groceries"));
    }

    #[test]
    fn parses_the_all_sentinel() {
        assert_eq!(CategoryFilter::from(ALL_CATEGORIES.to_owned()), CategoryFilter::All);
        assert_eq!(
            CategoryFilter::from("Rent".to_owned()),
            CategoryFilter::Category("Rent".to_owned())
        );
    }

    #[test]
    fn filter_options_start_with_all_and_dedupe_other() {
        let options = filter_options();

        assert_eq!(options[0], ALL_CATEGORIES);
        assert_eq!(
            options.iter().filter(|option| **option == "Other").count(),
            1
        );
    }
}
