//! Application router configuration with protected and unprotected route
//! definitions.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{get, post, put},
};

use crate::{
    AppState,
    auth::{
        auth_guard, auth_guard_hx, get_google_callback, get_google_sign_in, get_log_in_page,
        get_log_out, post_log_in,
    },
    auth::{get_register_page, register_user},
    dashboard::get_dashboard_page,
    endpoints,
    not_found::get_404_not_found,
    transaction::{
        create_expense_endpoint, create_income_endpoint, delete_expense_endpoint,
        delete_income_endpoint, get_edit_expense_page, get_edit_income_page, get_expense_page,
        get_income_page, get_transactions_fragment, update_expense_endpoint,
        update_income_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::USERS, post(register_user))
        .route(endpoints::OAUTH_GOOGLE, get(get_google_sign_in))
        .route(endpoints::OAUTH_GOOGLE_CALLBACK, get(get_google_callback));

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::INCOME_VIEW, get(get_income_page))
        .route(endpoints::EXPENSE_VIEW, get(get_expense_page))
        .route(endpoints::EDIT_INCOME_VIEW, get(get_edit_income_page))
        .route(endpoints::EDIT_EXPENSE_VIEW, get(get_edit_expense_page))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These routes are called by HTMX, so auth redirects must use the
    // HX-Redirect header to navigate the whole page.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(endpoints::INCOMES_API, post(create_income_endpoint))
            .route(
                endpoints::INCOME_API,
                put(update_income_endpoint).delete(delete_income_endpoint),
            )
            .route(endpoints::EXPENSES_API, post(create_expense_endpoint))
            .route(
                endpoints::EXPENSE_API,
                put(update_expense_endpoint).delete(delete_expense_endpoint),
            )
            .route(
                endpoints::TRANSACTIONS_FRAGMENT,
                get(get_transactions_fragment),
            )
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
    );

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}
