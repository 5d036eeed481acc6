use std::fmt::{Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Marketplace roles. The canonical wire form is the capitalised name
/// (`"Client"`, `"Company"`, `"Admin"`). Some backend payloads carry the numeric
/// code instead; decoding maps `0 = Client`, `1 = Company`, `2 = Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Client,
    Company,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Client, Role::Company, Role::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Client => "Client",
            Role::Company => "Company",
            Role::Admin => "Admin",
        }
    }

    pub fn from_name(name: &str) -> Option<Role> {
        let name = name.trim();
        Role::ALL.into_iter().find(|r| r.as_str().eq_ignore_ascii_case(name))
    }

    pub fn from_code(code: i64) -> Option<Role> {
        match code {
            0 => Some(Role::Client),
            1 => Some(Role::Company),
            2 => Some(Role::Admin),
            _ => None,
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Role::Client => 1,
            Role::Company => 1 << 1,
            Role::Admin => 1 << 2,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RoleRepr {
    Name(String),
    Code(i64),
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RoleRepr::deserialize(deserializer)? {
            RoleRepr::Name(n) => Role::from_name(&n)
                .ok_or_else(|| serde::de::Error::custom(format!("unknown role '{}'", n))),
            RoleRepr::Code(c) => Role::from_code(c)
                .ok_or_else(|| serde::de::Error::custom(format!("unknown role code {}", c))),
        }
    }
}

/// Immutable set of roles permitted into a route subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    pub const EMPTY: RoleSet = RoleSet(0);
    pub const ALL: RoleSet = RoleSet::of(&Role::ALL);

    pub const fn of(roles: &[Role]) -> RoleSet {
        let mut bits = 0u8;
        let mut i = 0;
        while i < roles.len() {
            bits |= roles[i].bit();
            i += 1;
        }
        RoleSet(bits)
    }

    pub const fn contains(self, role: Role) -> bool { self.0 & role.bit() != 0 }

    pub const fn is_empty(self) -> bool { self.0 == 0 }

    pub fn iter(self) -> impl Iterator<Item = Role> {
        Role::ALL.into_iter().filter(move |r| self.contains(*r))
    }
}
