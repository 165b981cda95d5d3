//! The shared add/edit transaction form fields.

use maud::{Markup, html};
use time::Date;

use crate::{
    html::{FORM_LABEL_STYLE, FORM_SELECT_STYLE, FORM_TEXT_INPUT_STYLE},
    transaction::{category::categories_for, model::TransactionKind},
};

/// Prefilled values for the transaction form.
pub struct TransactionFormDefaults<'a> {
    /// The kind the form records; decides the category dropdown.
    pub kind: TransactionKind,
    /// The prefilled date, usually today or the record's date when editing.
    pub date: Date,
    /// The selected category, if any.
    pub category: Option<&'a str>,
    /// The prefilled amount, absent on the add form.
    pub amount: Option<f64>,
    /// The prefilled description.
    pub description: &'a str,
}

/// Render the date, category, amount, and description fields.
///
/// The wrapping `form` element with its submit button and endpoint is left to
/// the caller, since the add and edit flows target different endpoints.
pub fn transaction_form_fields(defaults: &TransactionFormDefaults<'_>) -> Markup {
    let amount_str = defaults.amount.map(|amount| format!("{amount:.2}"));

    html! {
        div class="grid grid-cols-1 md:grid-cols-2 gap-4"
        {
            div
            {
                label for="date" class=(FORM_LABEL_STYLE) { "Date" }

                input
                    name="date"
                    id="date"
                    type="date"
                    value=(defaults.date)
                    required
                    tabindex="0"
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="category" class=(FORM_LABEL_STYLE) { "Category" }

                select
                    name="category"
                    id="category"
                    required
                    tabindex="0"
                    class={ "w-full " (FORM_SELECT_STYLE) }
                {
                    option value="" disabled selected[defaults.category.is_none()]
                    {
                        "Select Category"
                    }

                    @for category in categories_for(defaults.kind) {
                        option
                            value=(category)
                            selected[defaults.category == Some(*category)]
                        {
                            (category)
                        }
                    }
                }
            }
        }

        div class="grid grid-cols-1 md:grid-cols-2 gap-4"
        {
            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                input
                    name="amount"
                    id="amount"
                    type="number"
                    step="0.01"
                    min="0"
                    placeholder="0.00"
                    value=[amount_str.as_deref()]
                    required
                    tabindex="0"
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="description" class=(FORM_LABEL_STYLE) { "Description" }

                input
                    name="description"
                    id="description"
                    type="text"
                    placeholder="Description"
                    value=(defaults.description)
                    tabindex="0"
                    class=(FORM_TEXT_INPUT_STYLE);
            }
        }
    }
}

#[cfg(test)]
mod form_tests {
    use time::macros::date;

    use crate::transaction::model::TransactionKind;

    use super::{TransactionFormDefaults, transaction_form_fields};

    #[test]
    fn income_form_offers_income_categories() {
        let markup = transaction_form_fields(&TransactionFormDefaults {
            kind: TransactionKind::Income,
            date: date!(2023 - 10 - 01),
            category: None,
            amount: None,
            description: "",
        })
        .into_string();

        assert!(markup.contains("Salary"));
        assert!(!markup.contains("Groceries"));
    }

    #[test]
    fn edit_form_preselects_the_record_values() {
        let markup = transaction_form_fields(&TransactionFormDefaults {
            kind: TransactionKind::Expense,
            date: date!(2023 - 10 - 02),
            category: Some("Rent"),
            amount: Some(1000.0),
            description: "October rent",
        })
        .into_string();

        assert!(markup.contains("2023-10-02"));
        assert!(markup.contains("value=\"1000.00\""));
        assert!(markup.contains("October rent"));
        assert!(markup.contains("option value=\"Rent\" selected"));
    }
}
