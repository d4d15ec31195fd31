//! Per-role exchange caps.
//!
//! The desk trusts exchangers up to the cap of their role. Members holding
//! several exchanger roles are held to the smallest cap, except that one
//! unlimited role clears every cap.

use std::collections::HashMap;

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Platform role ID (snowflake).
#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub struct RoleId(#[serde(with = "crate::snowflake")] u64);

impl From<u64> for RoleId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// One row of the configured role table.
#[derive(Clone, Debug, Deserialize)]
pub struct RoleLimit {
    pub role: RoleId,
    /// Cap in dollars. Absent means the role may take any amount.
    pub max_amount: Option<f64>,
}

/// Effective cap of one member.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Limit {
    Unlimited,
    Max(f64),
}

impl Limit {
    pub fn allows(&self, amount: f64) -> bool {
        match *self {
            Self::Unlimited => true,
            Self::Max(max) => amount <= max,
        }
    }
}

/// The configured role→cap table.
#[derive(Clone, Debug, Default)]
pub struct Limits(HashMap<RoleId, Option<f64>>);

impl Limits {
    pub fn new(rows: impl IntoIterator<Item = RoleLimit>) -> Self {
        Self(
            rows.into_iter()
                .map(|row| (row.role, row.max_amount))
                .collect(),
        )
    }

    /// Resolves the effective limit of a member holding `roles`.
    ///
    /// `None` means the member holds no exchanger role at all and may not
    /// claim or close tickets.
    pub fn resolve(&self, roles: &[RoleId]) -> Option<Limit> {
        let mut cap: Option<f64> = None;
        let mut held = false;
        for role in roles {
            match self.0.get(role) {
                Some(None) => return Some(Limit::Unlimited),
                Some(Some(max)) => {
                    held = true;
                    cap = Some(cap.map_or(*max, |c| c.min(*max)));
                }
                None => {}
            }
        }
        match (held, cap) {
            (true, Some(max)) => Some(Limit::Max(max)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Limits {
        Limits::new([
            RoleLimit { role: RoleId(1), max_amount: None },
            RoleLimit { role: RoleId(2), max_amount: Some(100.0) },
            RoleLimit { role: RoleId(3), max_amount: Some(250.0) },
        ])
    }

    #[test]
    fn unlimited_role_clears_every_cap() {
        let limit = table().resolve(&[RoleId(2), RoleId(1), RoleId(3)]);
        assert_eq!(limit, Some(Limit::Unlimited));
    }

    #[test]
    fn smallest_cap_wins() {
        let limit = table().resolve(&[RoleId(3), RoleId(2)]);
        assert_eq!(limit, Some(Limit::Max(100.0)));
    }

    #[test]
    fn unknown_roles_are_ignored() {
        let limit = table().resolve(&[RoleId(9), RoleId(3)]);
        assert_eq!(limit, Some(Limit::Max(250.0)));
    }

    #[test]
    fn no_exchanger_role_resolves_to_none() {
        assert_eq!(table().resolve(&[RoleId(9)]), None);
        assert_eq!(table().resolve(&[]), None);
    }

    #[test]
    fn cap_is_inclusive() {
        assert!(Limit::Max(100.0).allows(100.0));
        assert!(!Limit::Max(100.0).allows(100.01));
        assert!(Limit::Unlimited.allows(1_000_000.0));
    }
}
