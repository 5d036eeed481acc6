use super::{Identity, RoleSet};

/// Outcome of a role check for a route subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Permit,
    /// Signed in, but the role is not allowed here; send to the unauthorized page.
    DenyAuthenticated,
    /// Nobody signed in; send to login.
    DenyAnonymous,
}

/// Pure role check: no state, no allocation.
pub fn check(identity: Option<&Identity>, allowed: RoleSet) -> GateDecision {
    match identity {
        Some(id) if allowed.contains(id.role) => GateDecision::Permit,
        Some(_) => GateDecision::DenyAuthenticated,
        None => GateDecision::DenyAnonymous,
    }
}

/// Statically configured gate for one route group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleGate {
    pub allowed: RoleSet,
}

impl RoleGate {
    pub const fn new(allowed: RoleSet) -> Self { Self { allowed } }

    pub fn check(&self, identity: Option<&Identity>) -> GateDecision { check(identity, self.allowed) }
}
