pub mod common;

use convert_desk::{
    limits::Limit,
    ticket::{Effect, Event, LogEvent, Rejection, Status},
};

#[test]
fn claimant_changes_the_amount() {
    let mut ticket = common::claimed_ticket(200.0);
    let effects = ticket
        .handle(
            Event::ChangeAmount { by: common::exchanger(), amount: 300.0 },
            common::now(),
            &common::windows(),
        )
        .unwrap();

    assert_eq!(ticket.amount, 300.0);
    assert_eq!(ticket.fee, 30.0);
    assert_eq!(ticket.net, 270.0);
    assert_eq!(effects, vec![Effect::RefreshCard]);
}

#[test]
fn amount_change_keeps_the_send_method_rate() {
    let mut ticket = common::open_ticket("Crypto", "PayPal", 100.0);
    ticket
        .handle(
            Event::Claim {
                by: common::exchanger(),
                limit: Some(Limit::Unlimited),
            },
            common::now(),
            &common::windows(),
        )
        .unwrap();
    ticket
        .handle(
            Event::ChangeAmount { by: common::exchanger(), amount: 200.0 },
            common::now(),
            &common::windows(),
        )
        .unwrap();

    // Still the crypto tier: 5 % of 200.
    assert_eq!(ticket.fee, 10.0);
    assert_eq!(ticket.net, 190.0);
}

#[test]
fn claimant_overrides_the_fee() {
    let mut ticket = common::claimed_ticket(200.0);
    let effects = ticket
        .handle(
            Event::ChangeFee { by: common::exchanger(), fee: 5.0 },
            common::now(),
            &common::windows(),
        )
        .unwrap();

    assert_eq!(ticket.fee, 5.0);
    assert_eq!(ticket.net, 195.0);
    assert_eq!(effects, vec![Effect::RefreshCard]);
}

#[test]
fn fee_above_the_amount_is_allowed_but_flagged() {
    let mut ticket = common::claimed_ticket(50.0);
    let effects = ticket
        .handle(
            Event::ChangeFee { by: common::exchanger(), fee: 60.0 },
            common::now(),
            &common::windows(),
        )
        .unwrap();

    assert_eq!(ticket.net, -10.0);
    assert!(effects.contains(&Effect::Log(LogEvent::NegativeNet {
        fee: 60.0,
        net: -10.0,
    })));
}

#[test]
fn negative_fee_is_rejected() {
    let mut ticket = common::claimed_ticket(50.0);
    let rejection = ticket
        .handle(
            Event::ChangeFee { by: common::exchanger(), fee: -1.0 },
            common::now(),
            &common::windows(),
        )
        .unwrap_err();

    assert_eq!(rejection, Rejection::NegativeFee);
    assert_eq!(ticket.fee, 5.0);
    assert_eq!(ticket.net, 45.0);
}

#[test]
fn only_the_claimant_renegotiates() {
    let mut ticket = common::claimed_ticket(200.0);
    let rejection = ticket
        .handle(
            Event::ChangeAmount { by: common::outsider(), amount: 10.0 },
            common::now(),
            &common::windows(),
        )
        .unwrap_err();

    assert_eq!(rejection, Rejection::NotTheClaimant);
    assert_eq!(ticket.amount, 200.0);
}

#[test]
fn open_ticket_has_nothing_to_renegotiate() {
    let mut ticket = common::open_ticket("PayPal", "Crypto", 200.0);
    let rejection = ticket
        .handle(
            Event::ChangeAmount { by: common::opener(), amount: 10.0 },
            common::now(),
            &common::windows(),
        )
        .unwrap_err();
    assert_eq!(rejection, Rejection::NotClaimed);
}

#[test]
fn claimant_releases_the_ticket() {
    let mut ticket = common::claimed_ticket(200.0);
    let effects = ticket
        .handle(
            Event::Unclaim { by: common::exchanger() },
            common::now(),
            &common::windows(),
        )
        .unwrap();

    assert_eq!(ticket.status, Status::Open);
    assert_eq!(ticket.claimant, None);
    assert_eq!(
        effects,
        vec![
            Effect::RestorePool,
            Effect::RefreshCard,
            Effect::Log(LogEvent::Unclaimed { by: common::exchanger() }),
        ],
    );
}

#[test]
fn released_ticket_keeps_its_renegotiated_figures() {
    let mut ticket = common::claimed_ticket(200.0);
    ticket
        .handle(
            Event::ChangeAmount { by: common::exchanger(), amount: 150.0 },
            common::now(),
            &common::windows(),
        )
        .unwrap();
    ticket
        .handle(
            Event::Unclaim { by: common::exchanger() },
            common::now(),
            &common::windows(),
        )
        .unwrap();

    // Structured state survives the unclaim; nothing is re-parsed from a
    // rendered card.
    assert_eq!(ticket.amount, 150.0);
    assert_eq!(ticket.fee, 15.0);
    assert_eq!(ticket.net, 135.0);
}
