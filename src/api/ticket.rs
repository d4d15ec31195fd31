use serde::{Deserialize, Serialize};

use crate::{db::user, relay::ChannelId, ticket};

pub use crate::ticket::{Id, Status};

/// The wire view of a ticket, returned from every endpoint.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Id,
    pub channel: ChannelId,
    pub from: String,
    pub to: String,
    pub amount: f64,
    pub fee: f64,
    pub net: f64,
    pub opener: user::Id,
    pub claimant: Option<user::Id>,
    pub status: Status,
    pub pending: Option<Pending>,
}

/// A live prompt, with its expiry as a unix timestamp.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(
    rename_all = "camelCase",
    rename_all_fields = "camelCase",
    tag = "kind"
)]
pub enum Pending {
    ClaimApproval {
        exchanger: user::Id,
        limit: f64,
        expires_at: i64,
    },
    CloseConfirm { by: user::Id, expires_at: i64 },
    CompleteConfirm { by: user::Id, expires_at: i64 },
}

impl From<&ticket::Ticket> for Ticket {
    fn from(ticket: &ticket::Ticket) -> Self {
        Self {
            id: ticket.id,
            channel: ticket.channel,
            from: ticket.from.clone(),
            to: ticket.to.clone(),
            amount: ticket.amount,
            fee: ticket.fee,
            net: ticket.net,
            opener: ticket.opener,
            claimant: ticket.claimant,
            status: ticket.status,
            pending: ticket.pending.map(Into::into),
        }
    }
}

impl From<ticket::Pending> for Pending {
    fn from(pending: ticket::Pending) -> Self {
        match pending {
            ticket::Pending::ClaimApproval {
                exchanger,
                limit,
                expires_at,
            } => Self::ClaimApproval {
                exchanger,
                limit,
                expires_at: expires_at.unix_timestamp(),
            },
            ticket::Pending::Confirm { action, by, expires_at } => {
                let expires_at = expires_at.unix_timestamp();
                match action {
                    ticket::ConfirmAction::Close => {
                        Self::CloseConfirm { by, expires_at }
                    }
                    ticket::ConfirmAction::Complete => {
                        Self::CompleteConfirm { by, expires_at }
                    }
                }
            }
        }
    }
}
