//! Periodic leaderboard upkeep.
//!
//! Stateless between runs: each cycle re-reads the ledger, renders both
//! boards and tells the relay to upsert them. A failed read or render is
//! logged and skipped; the next cycle starts from scratch anyway.

use futures::future;
use itertools::Itertools as _;

use crate::{
    config,
    db::{self, ledger::Side, Standing},
    money,
    relay::{self, Action, Card},
};

pub const EXCHANGER_TITLE: &str = "🏆 All-Time Top Exchangers";
pub const CUSTOMER_TITLE: &str = "🥇 All-Time Top Customers";

/// Runs the refresh loop forever.
pub async fn run(
    db: &db::Client,
    relay: &relay::Client,
    config: &config::Leaderboard,
    exchanger_board: relay::ChannelId,
    customer_board: relay::ChannelId,
) {
    let mut interval = tokio::time::interval(config.refresh_interval);
    loop {
        interval.tick().await;
        refresh(db, relay, config.size, exchanger_board, customer_board)
            .await;
    }
}

/// One refresh cycle.
pub async fn refresh(
    db: &db::Client,
    relay: &relay::Client,
    size: usize,
    exchanger_board: relay::ChannelId,
    customer_board: relay::ChannelId,
) {
    let (exchangers, customers) = future::join(
        db.fetch_top(Side::Exchanger, size),
        db.fetch_top(Side::Customer, size),
    )
    .await;

    let boards = [
        (EXCHANGER_TITLE, exchanger_board, exchangers),
        (CUSTOMER_TITLE, customer_board, customers),
    ];
    for (title, channel, standings) in boards {
        let standings = match standings {
            Ok(standings) => standings,
            Err(e) => {
                tracing::warn!("failed to read the {title} standings: {e}");
                continue;
            }
        };
        let action = Action::UpsertDisplay {
            channel,
            title: title.to_owned(),
            card: board_card(title, &standings),
        };
        if let Err(e) = relay.send(&action).await {
            tracing::warn!("failed to refresh {title}: {e}");
        }
    }
}

/// Renders one board. Identical standings render identically, so an
/// unchanged ledger refreshes into the very same display.
pub fn board_card(title: &str, standings: &[Standing]) -> Card {
    let body = if standings.is_empty() {
        "No data.".to_owned()
    } else {
        standings
            .iter()
            .enumerate()
            .map(|(i, s)| {
                format!(
                    "**{}.** {} — ${}",
                    i + 1,
                    s.user.mention(),
                    money::usd(s.total),
                )
            })
            .join("\n")
    };
    Card {
        title: title.to_owned(),
        description: Some(body),
        fields: vec![],
        footer: None,
        colour: relay::BRAND,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::user;

    fn standings() -> Vec<Standing> {
        vec![
            Standing { user: user::Id::from(1), total: 1500.0 },
            Standing { user: user::Id::from(2), total: 200.5 },
        ]
    }

    #[test]
    fn renders_ranked_lines() {
        let card = board_card(EXCHANGER_TITLE, &standings());
        assert_eq!(card.title, EXCHANGER_TITLE);
        assert_eq!(
            card.description.as_deref(),
            Some("**1.** <@1> — $1,500.00\n**2.** <@2> — $200.50"),
        );
    }

    #[test]
    fn rendering_is_idempotent() {
        assert_eq!(
            board_card(CUSTOMER_TITLE, &standings()),
            board_card(CUSTOMER_TITLE, &standings()),
        );
    }

    #[test]
    fn empty_board_renders_a_placeholder() {
        let card = board_card(EXCHANGER_TITLE, &[]);
        assert_eq!(card.description.as_deref(), Some("No data."));
    }
}
