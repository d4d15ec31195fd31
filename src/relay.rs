//! Outbound boundary to the chat-platform relay.
//!
//! The relay fronts the platform gateway and renders whatever this service
//! tells it to. Everything crosses the link as op-tagged JSON actions over
//! HTTP, authenticated with the shared secret.

use derive_more::Display;
use itertools::Itertools as _;
use serde::{Deserialize, Serialize};

use crate::{
    config,
    db::user,
    money,
    ticket::{LogEvent, Ticket, METHODS},
};

pub type Error = reqwest::Error;

/// Platform channel ID (snowflake).
#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize,
)]
pub struct ChannelId(#[serde(with = "crate::snowflake")] u64);

impl From<u64> for ChannelId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

pub const BRAND: u32 = 0x1E90FF;
pub const GOLD: u32 = 0xF1C40F;
pub const RED: u32 = 0xFF4500;
pub const GREEN: u32 = 0x00C853;

/// A rich message for the relay to render.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<CardField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    pub colour: u32,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CardField {
    pub name: String,
    pub value: String,
}

/// One instruction to the relay.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase",
    tag = "op"
)]
pub enum Action {
    /// Create the scoped ticket channel; the relay answers with its ID.
    CreateTicketChannel {
        category: ChannelId,
        name: String,
        opener: user::Id,
    },
    /// Re-render the ticket card in place.
    EditCard { channel: ChannelId, card: Card },
    /// Narrow channel visibility down to the claimant (and staff).
    GrantClaimant { channel: ChannelId, claimant: user::Id },
    /// Reopen channel visibility to every eligible claimant.
    RestorePool { channel: ChannelId },
    /// Show the opener an accept/deny prompt for an over-limit claim.
    AskClaimApproval {
        channel: ChannelId,
        opener: user::Id,
        card: Card,
        expires_at: i64,
    },
    Post { channel: ChannelId, card: Card },
    RenameCounter { channel: ChannelId, name: String },
    /// Edit the display titled `title` in recent channel history, or post
    /// it if none exists. Deduplication is the relay's contract.
    UpsertDisplay {
        channel: ChannelId,
        title: String,
        card: Card,
    },
    DeleteChannel { channel: ChannelId },
}

/// HTTP client delivering actions to the relay.
pub struct Client {
    http: reqwest::Client,
    url: String,
    secret: String,
}

impl Client {
    pub fn new(config: &config::Relay) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: config.url.trim_end_matches('/').to_owned(),
            secret: config.secret.clone(),
        }
    }

    /// Delivers one action.
    pub async fn send(&self, action: &Action) -> Result<(), Error> {
        self.http
            .post(format!("{}/action", self.url))
            .bearer_auth(&self.secret)
            .json(action)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Creates the scoped ticket channel and returns its ID.
    pub async fn create_ticket_channel(
        &self,
        category: ChannelId,
        name: &str,
        opener: user::Id,
    ) -> Result<ChannelId, Error> {
        #[derive(Deserialize)]
        struct Created {
            channel: ChannelId,
        }

        let created = self
            .http
            .post(format!("{}/action", self.url))
            .bearer_auth(&self.secret)
            .json(&Action::CreateTicketChannel {
                category,
                name: name.to_owned(),
                opener,
            })
            .send()
            .await?
            .error_for_status()?
            .json::<Created>()
            .await?;
        Ok(created.channel)
    }
}

pub fn tier_label(method: &str) -> &'static str {
    if method.eq_ignore_ascii_case("crypto") {
        "5 % Fee"
    } else {
        "10 % Fee"
    }
}

/// The intake panel, reposted by the slash command.
pub fn panel_card() -> Card {
    let methods = METHODS
        .iter()
        .map(|m| format!("• {m} — {}", tier_label(m)))
        .join("\n");
    Card {
        title: "Convert".to_owned(),
        description: Some(format!(
            "Pick what you send and what you receive. Minimum fee \
             ${:.2}.\n\n{methods}",
            money::MIN_FEE,
        )),
        fields: vec![],
        footer: None,
        colour: BRAND,
    }
}

/// The ticket card, re-rendered on every state change.
pub fn ticket_card(ticket: &Ticket) -> Card {
    let mut fields = vec![
        CardField {
            name: "From → To".to_owned(),
            value: format!("{} → {}", ticket.from, ticket.to),
        },
        CardField {
            name: "Amount".to_owned(),
            value: format!("$ {:.2}", ticket.amount),
        },
        CardField {
            name: "Fee".to_owned(),
            value: format!("$ {:.2}", ticket.fee),
        },
        CardField {
            name: "You Receive".to_owned(),
            value: format!("$ {:.2}", ticket.net),
        },
    ];
    if let Some(claimant) = ticket.claimant {
        fields.push(CardField {
            name: "🔒 Claimed by".to_owned(),
            value: claimant.mention(),
        });
    }
    Card {
        title: "🆕 New Exchange Request".to_owned(),
        description: None,
        fields,
        footer: Some(
            "Min $3 + 10% (5% crypto) fee • ⚡ Exchangers: Claim / Close"
                .to_owned(),
        ),
        colour: BRAND,
    }
}

/// The accept/deny prompt shown to the opener on an over-limit claim.
pub fn approval_card(ticket: &Ticket, exchanger: user::Id, limit: f64) -> Card {
    Card {
        title: "⚠️ Claim Needs Your Approval".to_owned(),
        description: Some(format!(
            "{} wants to claim this $ {:.2} exchange, which is over their \
             ${limit:.2} limit. Allow it?",
            exchanger.mention(),
            ticket.amount,
        )),
        fields: vec![],
        footer: None,
        colour: GOLD,
    }
}

/// The immutable record posted to the history channel on completion.
pub fn history_card(ticket: &Ticket) -> Card {
    let exchanger =
        ticket.claimant.map_or("unknown".to_owned(), |c| c.mention());
    Card {
        title: "✅ Exchange Complete ⚡".to_owned(),
        description: None,
        fields: vec![
            CardField { name: "Exchanger".to_owned(), value: exchanger },
            CardField {
                name: "Client Sent".to_owned(),
                value: format!("$ {:.2} via {}", ticket.amount, ticket.from),
            },
            CardField {
                name: "Client Received".to_owned(),
                value: format!("$ {:.2} via {}", ticket.net, ticket.to),
            },
            CardField {
                name: "Client".to_owned(),
                value: "Hidden — *For security purposes*".to_owned(),
            },
        ],
        footer: None,
        colour: GREEN,
    }
}

/// Counter channel name, e.g. `Total Converted: $12,345.67`.
pub fn counter_name(total: f64) -> String {
    format!("Total Converted: ${}", money::usd(total))
}

/// Operator-log card for one ticket event.
pub fn log_card(ticket: &Ticket, event: &LogEvent) -> Card {
    let (title, description, colour) = match event {
        LogEvent::Opened => (
            "🎫 Ticket opened",
            format!(
                "{} opened {} → {} for $ {:.2}.",
                ticket.opener.mention(),
                ticket.from,
                ticket.to,
                ticket.amount,
            ),
            BRAND,
        ),
        LogEvent::Claimed { by } => (
            "🔒 Ticket claimed",
            format!("{} claimed the ticket.", by.mention()),
            BRAND,
        ),
        LogEvent::EscalationRequested { by, limit } => (
            "⚠️ Over-limit claim requested",
            format!(
                "{} asked to claim $ {:.2}, over their ${limit:.2} limit.",
                by.mention(),
                ticket.amount,
            ),
            GOLD,
        ),
        LogEvent::EscalationAccepted { exchanger } => (
            "⚠️ Over-limit claim allowed",
            format!("The opener allowed {} to claim.", exchanger.mention()),
            GOLD,
        ),
        LogEvent::EscalationDenied { exchanger } => (
            "⚠️ Over-limit claim denied",
            format!(
                "The opener denied the claim by {}.",
                exchanger.mention(),
            ),
            GOLD,
        ),
        LogEvent::Unclaimed { by } => (
            "🔓 Ticket unclaimed",
            format!(
                "{} released the ticket back to the pool.",
                by.mention(),
            ),
            BRAND,
        ),
        LogEvent::NegativeNet { fee, net } => (
            "⚠️ Fee exceeds amount",
            format!("Fee set to $ {fee:.2}; the net payout is $ {net:.2}."),
            GOLD,
        ),
        LogEvent::Closed { by } => (
            "🗑️ Ticket closed",
            format!(
                "{} closed the ticket without an exchange.",
                by.mention(),
            ),
            RED,
        ),
        LogEvent::Completed { by, amount } => (
            "✅ Exchange completed",
            format!("{} completed a $ {amount:.2} exchange.", by.mention()),
            GREEN,
        ),
        LogEvent::LedgerWriteFailed => (
            "🚨 Ledger write failed",
            "The completion was not recorded; the ticket stays claimed so \
             it can be retried."
                .to_owned(),
            RED,
        ),
    };
    Card {
        title: title.to_owned(),
        description: Some(description),
        fields: vec![],
        footer: Some(format!("Ticket {} • {}", ticket.id, ticket.channel)),
        colour,
    }
}
