//! Sessions: who is signed in right now, and who wants to know when that
//! changes.

mod gate;
mod hub;

pub use gate::{GateEffect, SessionGate};
pub use hub::{SessionCallback, SessionHub, SessionObserver};

use crate::auth::UserID;

/// The signed-in state for one user.
///
/// Sessions are created on sign-in (password or OAuth) and destroyed on
/// sign-out. Components never reach for a global; the session is looked up
/// through the [SessionHub] handle they were constructed with, or passed in
/// explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// The user this session belongs to.
    pub user_id: UserID,
    /// The name shown in the header and greeting.
    pub display_name: String,
    /// Profile picture, when the identity provider supplied one.
    pub photo_url: Option<String>,
}
