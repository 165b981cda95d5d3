//! The 404 page.

use axum::{http::StatusCode, response::Response};
use maud::html;

use crate::{
    endpoints,
    html::{LINK_STYLE, base, render},
};

/// The fallback handler for unknown routes.
pub async fn get_404_not_found() -> Response {
    get_404_not_found_response()
}

/// Build the 404 response directly, for handlers that discover a missing
/// resource themselves.
pub fn get_404_not_found_response() -> Response {
    let content = html! {
        div class="min-h-screen flex flex-col items-center justify-center \
            text-gray-900 dark:text-white"
        {
            h1 class="text-4xl font-bold mb-2" { "404" }
            p class="mb-4" { "The page you are looking for does not exist." }
            a href=(endpoints::DASHBOARD_VIEW) class=(LINK_STYLE) { "Back to the overview" }
        }
    };

    render(StatusCode::NOT_FOUND, base("Not Found", &[], &content))
}

#[cfg(test)]
mod not_found_tests {
    use axum::http::StatusCode;

    use super::get_404_not_found;

    #[tokio::test]
    async fn responds_with_404() {
        let response = get_404_not_found().await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
