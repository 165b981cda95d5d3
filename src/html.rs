//! The base page template, shared style constants, and small rendering
//! helpers.

use std::sync::OnceLock;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use numfmt::{Formatter, Precision};

// Link styles
pub const LINK_STYLE: &str = "text-blue-600 hover:text-blue-500 \
    dark:text-blue-500 dark:hover:text-blue-400 underline";

// Button styles
pub const BUTTON_PRIMARY_STYLE: &str = "w-full px-4 py-2 bg-blue-500 \
    dark:bg-blue-600 disabled:bg-blue-700 hover:enabled:bg-blue-600 \
    hover:enabled:dark:bg-blue-700 text-white rounded";

pub const BUTTON_DELETE_STYLE: &str = "text-red-600 hover:text-red-500 \
    dark:text-red-500 dark:hover:text-red-400 underline bg-transparent \
    border-none cursor-pointer";

// Form styles
pub const FORM_LABEL_STYLE: &str = "block mb-2 text-sm font-medium text-gray-900 dark:text-white";
pub const FORM_TEXT_INPUT_STYLE: &str = "block w-full p-2.5 rounded text-sm \
    text-gray-900 dark:text-white disabled:text-gray-500 bg-gray-50 \
    dark:bg-gray-700 border border-gray-300 dark:border-gray-600 \
    dark:placeholder-gray-400 focus:ring-blue-600 focus:border-blue-600 \
    focus:dark:border-blue-500 focus:dark:ring-blue-500";
pub const FORM_SELECT_STYLE: &str = "p-2.5 rounded text-sm text-gray-900 \
    dark:text-white bg-gray-50 dark:bg-gray-700 border border-gray-300 \
    dark:border-gray-600";

// Table styles
pub const TABLE_HEADER_STYLE: &str = "text-xs text-gray-700 uppercase \
    bg-gray-50 dark:bg-gray-700 dark:text-gray-400";

pub const TABLE_ROW_STYLE: &str = "bg-white border-b dark:bg-gray-800 dark:border-gray-700";

pub const TABLE_CELL_STYLE: &str = "px-6 py-4";

// Cards and page containers
pub const CARD_STYLE: &str = "bg-white dark:bg-gray-800 p-6 rounded-lg shadow-md";

pub const PAGE_CONTAINER_STYLE: &str =
    "max-w-5xl px-6 py-8 mx-auto lg:py-5 text-gray-900 dark:text-white";

/// Extra elements a page can add to the document head.
pub enum HeadElement {
    /// The file path or URL to a JavaScript script.
    ScriptLink(String),
    /// JavaScript source code.
    ScriptSource(PreEscaped<String>),
}

/// The base page template: document head, scripts, and the page content.
pub fn base(title: &str, head_elements: &[HeadElement], content: &Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en"
        {
            head
            {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) " - Fintrack" }

                script src="https://unpkg.com/htmx.org@2.0.8" {}
                script src="https://unpkg.com/htmx-ext-response-targets@2.0.4" {}
                script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4" {}

                style
                {
                    r#"
                    #indicator.htmx-indicator {
                        display: none;
                    }

                    #indicator.htmx-request .htmx-indicator {
                        display: inline;
                    }

                    #indicator.htmx-request.htmx-indicator {
                        display: inline;
                    }
                    "#
                }

                @for element in head_elements
                {
                    @match element
                    {
                        HeadElement::ScriptSource(text) => script { (text) }
                        HeadElement::ScriptLink(path) => script src=(path) {}
                    }
                }
            }

            body class="bg-gray-100 dark:bg-gray-900"
            {
                (content)
            }
        }
    }
}

/// The centered card used by the sign-in and sign-up pages.
pub fn auth_card(title: &str, content: &Markup) -> Markup {
    html! {
        div class="min-h-screen flex items-center justify-center"
        {
            div class="bg-white dark:bg-gray-800 p-8 rounded-lg shadow-lg w-full max-w-md \
                text-gray-900 dark:text-white"
            {
                h2 class="text-2xl font-bold mb-6 text-center" { (title) }

                (content)
            }
        }
    }
}

/// An animated spinner shown while a request is in flight.
pub fn loading_spinner() -> Markup {
    html! {
        span
            class="inline-block w-4 h-4 mr-2 border-2 border-white border-t-transparent \
                rounded-full animate-spin align-middle"
        {}
    }
}

/// Render markup with the given status code.
#[inline]
pub fn render(status_code: StatusCode, markup: Markup) -> Response {
    (status_code, markup).into_response()
}

/// Format a number as a dollar amount, e.g. `1234.5` as `"$1,234.50"`.
pub fn format_currency(number: f64) -> String {
    static POSITIVE_FMT: OnceLock<Formatter> = OnceLock::new();

    let positive_fmt = POSITIVE_FMT.get_or_init(|| {
        Formatter::currency("$")
            .unwrap()
            .precision(Precision::Decimals(2))
    });

    static NEGATIVE_FMT: OnceLock<Formatter> = OnceLock::new();

    let negative_fmt = NEGATIVE_FMT.get_or_init(|| {
        Formatter::currency("-$")
            .unwrap()
            .precision(Precision::Decimals(2))
    });

    let mut formatted_string = if number < 0.0 {
        negative_fmt.fmt_string(number.abs())
    } else if number > 0.0 {
        positive_fmt.fmt_string(number)
    } else {
        // Zero is hardcoded as "0", so we must specify the formatted string for zero
        "$0.00".to_owned()
    };

    // numfmt omits the last trailing zero, so we must add it ourselves
    // For example, "12.30" is rendered as "12.3" so we append "0".
    if formatted_string.as_bytes()[formatted_string.len() - 3] != b'.' {
        formatted_string = format!("{formatted_string}0");
    }

    formatted_string
}

/// Format an amount with its sign and color decided by whether it is an
/// income or an expense.
pub fn signed_amount(amount: f64, is_income: bool) -> Markup {
    let (sign, color) = if is_income {
        ("+", "text-green-600 dark:text-green-500")
    } else {
        ("-", "text-red-600 dark:text-red-500")
    };

    html! {
        span class=(color) { (sign) (format_currency(amount)) }
    }
}
