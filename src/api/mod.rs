pub mod ticket;
pub mod user;

use serde::{Deserialize, Serialize};

use crate::relay;

pub use self::{ticket::Ticket, user::Actor};

/// Content of the intake panel, rendered by the relay.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Panel {
    pub card: relay::Card,
    pub methods: Vec<Method>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Method {
    pub name: String,
    pub fee_label: String,
}
