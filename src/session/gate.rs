//! The gate that protected views sit behind.
//!
//! A gate starts in `Checking` and holds back all protected content until the
//! first session-state resolution arrives. From then on it only moves between
//! `Authenticated` and `Unauthenticated`; `Checking` is never re-entered. A
//! redirect to the sign-in surface is issued exactly once per transition into
//! `Unauthenticated`, so repeated "still signed out" notifications do not
//! stack up redirects.

use crate::session::Session;

/// Where the gate currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    /// No session-state resolution has arrived yet.
    Checking,
    /// The last resolution reported a signed-in user.
    Authenticated,
    /// The last resolution reported no user.
    Unauthenticated,
}

/// What the caller should do after feeding a session resolution to the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEffect {
    /// A user is present: render the protected content.
    RenderProtected,
    /// The user became absent: redirect to the sign-in surface.
    Redirect,
    /// The user is still absent and the redirect has already been issued.
    AlreadyRedirected,
}

/// The session gate state machine.
///
/// Callers construct one gate per protected surface, feed it every
/// session-state resolution via [SessionGate::observe], and act on the
/// returned effect. While [SessionGate::is_checking] is true, only a
/// placeholder may be shown.
#[derive(Debug)]
pub struct SessionGate {
    state: GateState,
}

impl SessionGate {
    /// A fresh gate in the `Checking` state.
    pub fn new() -> Self {
        Self {
            state: GateState::Checking,
        }
    }

    /// Whether no session resolution has arrived yet.
    ///
    /// Protected content must not be rendered while this returns true.
    pub fn is_checking(&self) -> bool {
        self.state == GateState::Checking
    }

    /// Feed a session-state resolution to the gate.
    pub fn observe(&mut self, session: Option<&Session>) -> GateEffect {
        match session {
            Some(_) => {
                self.state = GateState::Authenticated;
                GateEffect::RenderProtected
            }
            None if self.state == GateState::Unauthenticated => GateEffect::AlreadyRedirected,
            None => {
                self.state = GateState::Unauthenticated;
                GateEffect::Redirect
            }
        }
    }
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}
