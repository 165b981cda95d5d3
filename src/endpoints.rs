//! The API endpoint URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/incomes/{transaction_id}',
//! use [format_endpoint].

/// The root route which redirects to the dashboard or sign-in page.
pub const ROOT: &str = "/";
/// The landing page for signed-in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page for recording and listing incomes.
pub const INCOME_VIEW: &str = "/income";
/// The page for recording and listing expenses.
pub const EXPENSE_VIEW: &str = "/expense";
/// The page for editing an existing income.
pub const EDIT_INCOME_VIEW: &str = "/income/{transaction_id}/edit";
/// The page for editing an existing expense.
pub const EDIT_EXPENSE_VIEW: &str = "/expense/{transaction_id}/edit";
/// The route for getting the sign-in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The route for getting the sign-up page.
pub const REGISTER_VIEW: &str = "/register";

/// The route for signing in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to sign out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to create users.
pub const USERS: &str = "/api/users";
/// The route that starts a Google sign-in.
pub const OAUTH_GOOGLE: &str = "/auth/google";
/// The route Google redirects back to after consent.
pub const OAUTH_GOOGLE_CALLBACK: &str = "/auth/google/callback";

/// The route to create incomes.
pub const INCOMES_API: &str = "/api/incomes";
/// The route to update or delete a single income.
pub const INCOME_API: &str = "/api/incomes/{transaction_id}";
/// The route to create expenses.
pub const EXPENSES_API: &str = "/api/expenses";
/// The route to update or delete a single expense.
pub const EXPENSE_API: &str = "/api/expenses/{transaction_id}";

/// The route for the transaction table fragment the dashboard filters and
/// polls.
pub const TRANSACTIONS_FRAGMENT: &str = "/fragments/transactions";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/incomes/{transaction_id}',
/// '{transaction_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
