//! Identity, session state and role-based gating for the marketplace client.
//! Keep the public surface thin and split implementation across sub-modules.

mod role;
mod principal;
mod session;
mod gate;

pub use role::{Role, RoleSet};
pub use principal::Identity;
pub use session::{AccessToken, Session, SessionStore};
pub use gate::{check, GateDecision, RoleGate};
