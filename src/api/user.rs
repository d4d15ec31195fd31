use serde::{Deserialize, Serialize};

use crate::limits::RoleId;

pub use crate::db::user::Id;

/// The member behind an interaction, as reported by the relay.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Actor {
    pub id: Id,
    #[serde(default)]
    pub roles: Vec<RoleId>,
}
