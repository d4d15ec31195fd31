use std::{net, time};

use serde::Deserialize;

use crate::{limits::RoleLimit, relay::ChannelId};

#[derive(Deserialize)]
pub struct Config {
    pub db: Db,
    pub http: Http,
    pub relay: Relay,
    pub channels: Channels,
    pub tickets: Tickets,
    pub leaderboard: Leaderboard,
    #[serde(default)]
    pub limits: Vec<RoleLimit>,
}

#[derive(Deserialize)]
pub struct Db {
    pub url: String,
}

#[derive(Deserialize)]
pub struct Http {
    pub server: Server,
}

#[derive(Deserialize)]
pub struct Server {
    pub addr: net::SocketAddr,
}

/// The relay process fronting the chat platform.
#[derive(Deserialize)]
pub struct Relay {
    pub url: String,
    pub secret: String,
}

/// Fixed channels the desk posts into.
#[derive(Deserialize)]
pub struct Channels {
    pub history: ChannelId,
    pub log: ChannelId,
    pub counter: ChannelId,
    pub exchanger_board: ChannelId,
    pub customer_board: ChannelId,
}

#[derive(Deserialize)]
pub struct Tickets {
    /// Category the ticket channels are created under.
    pub category: ChannelId,
    #[serde(with = "humantime_serde")]
    pub claim_approval_window: time::Duration,
    #[serde(with = "humantime_serde")]
    pub confirm_window: time::Duration,
}

#[derive(Deserialize)]
pub struct Leaderboard {
    #[serde(with = "humantime_serde")]
    pub refresh_interval: time::Duration,
    pub size: usize,
}
