//! Inline alerts for surfacing errors and confirmations to the user.

use maud::{Markup, html};

/// Render an error alert with a headline and supporting detail.
///
/// Pass an empty `details` string to render the headline alone.
pub fn alert_error(message: &str, details: &str) -> Markup {
    alert(
        message,
        details,
        "text-red-800 bg-red-50 dark:bg-gray-800 dark:text-red-400 border-red-300 \
            dark:border-red-800",
    )
}

fn alert(message: &str, details: &str, style: &str) -> Markup {
    html! {
        div class={ "p-4 mb-4 text-sm rounded-lg border " (style) } role="alert"
        {
            span class="font-medium" { (message) }

            @if !details.is_empty() {
                " " (details)
            }
        }
    }
}

#[cfg(test)]
mod alert_tests {
    use super::alert_error;

    #[test]
    fn error_alert_contains_message_and_details() {
        let markup = alert_error("Could not sign in", "Try again.").into_string();

        assert!(markup.contains("Could not sign in"));
        assert!(markup.contains("Try again."));
        assert!(markup.contains("role=\"alert\""));
    }

    #[test]
    fn alert_elides_empty_details() {
        let markup = alert_error("Something went wrong", "").into_string();

        assert!(markup.contains("Something went wrong"));
    }
}
