use std::time::Duration;

use convert_desk::{
    db::user,
    limits::{Limit, Limits, RoleId, RoleLimit},
    relay::ChannelId,
    ticket::{Event, Ticket, Windows},
};
use time::OffsetDateTime;

pub fn opener() -> user::Id {
    user::Id::from(11)
}

pub fn exchanger() -> user::Id {
    user::Id::from(22)
}

pub fn outsider() -> user::Id {
    user::Id::from(33)
}

pub fn windows() -> Windows {
    Windows {
        claim_approval: Duration::from_secs(24 * 60 * 60),
        confirm: Duration::from_secs(30),
    }
}

pub fn now() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
}

/// A fresh open ticket in channel 500, opened by `opener()`.
pub fn open_ticket(from: &str, to: &str, amount: f64) -> Ticket {
    Ticket::open(
        opener(),
        ChannelId::from(500),
        from.to_owned(),
        to.to_owned(),
        amount,
        now(),
    )
}

/// A PayPal → Crypto ticket already claimed by `exchanger()` with no cap.
pub fn claimed_ticket(amount: f64) -> Ticket {
    let mut ticket = open_ticket("PayPal", "Crypto", amount);
    ticket
        .handle(
            Event::Claim {
                by: exchanger(),
                limit: Some(Limit::Unlimited),
            },
            now(),
            &windows(),
        )
        .unwrap();
    ticket
}

/// Role table used across tests: role 1 unlimited, role 2 capped at $100,
/// role 3 at $250.
pub fn limit_table() -> Limits {
    Limits::new([
        RoleLimit { role: RoleId::from(1), max_amount: None },
        RoleLimit { role: RoleId::from(2), max_amount: Some(100.0) },
        RoleLimit { role: RoleId::from(3), max_amount: Some(250.0) },
    ])
}
