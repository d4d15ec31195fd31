pub mod common;

use std::time::Duration;

use convert_desk::{
    limits::{Limit, RoleId},
    ticket::{Effect, Event, LogEvent, Pending, Rejection, Status},
};

#[test]
fn claims_within_limit() {
    let mut ticket = common::open_ticket("PayPal", "Crypto", 80.0);
    let effects = ticket
        .handle(
            Event::Claim {
                by: common::exchanger(),
                limit: Some(Limit::Max(100.0)),
            },
            common::now(),
            &common::windows(),
        )
        .unwrap();

    assert_eq!(ticket.status, Status::Claimed);
    assert_eq!(ticket.claimant, Some(common::exchanger()));
    assert_eq!(
        effects,
        vec![
            Effect::GrantClaimant { claimant: common::exchanger() },
            Effect::RefreshCard,
            Effect::Log(LogEvent::Claimed { by: common::exchanger() }),
        ],
    );
}

#[test]
fn claim_at_the_exact_cap_goes_through() {
    let mut ticket = common::open_ticket("PayPal", "Crypto", 100.0);
    ticket
        .handle(
            Event::Claim {
                by: common::exchanger(),
                limit: Some(Limit::Max(100.0)),
            },
            common::now(),
            &common::windows(),
        )
        .unwrap();
    assert_eq!(ticket.status, Status::Claimed);
}

#[test]
fn over_limit_claim_escalates() {
    // $200 via PayPal against a $100 cap: approval, not a claim.
    let mut ticket = common::open_ticket("PayPal", "Crypto", 200.0);
    let effects = ticket
        .handle(
            Event::Claim {
                by: common::exchanger(),
                limit: Some(Limit::Max(100.0)),
            },
            common::now(),
            &common::windows(),
        )
        .unwrap();

    assert_eq!(ticket.status, Status::PendingClaimApproval);
    assert_eq!(ticket.claimant, None);

    let expires_at = common::now() + Duration::from_secs(24 * 60 * 60);
    assert_eq!(
        ticket.pending,
        Some(Pending::ClaimApproval {
            exchanger: common::exchanger(),
            limit: 100.0,
            expires_at,
        }),
    );
    assert_eq!(
        effects[0],
        Effect::AskClaimApproval {
            exchanger: common::exchanger(),
            limit: 100.0,
            expires_at,
        },
    );
}

#[test]
fn no_role_cannot_claim() {
    let mut ticket = common::open_ticket("PayPal", "Crypto", 10.0);
    let rejection = ticket
        .handle(
            Event::Claim { by: common::outsider(), limit: None },
            common::now(),
            &common::windows(),
        )
        .unwrap_err();

    assert_eq!(rejection, Rejection::ExchangerRoleRequired);
    assert!(rejection.is_authorization());
    assert_eq!(ticket.status, Status::Open);
}

#[test]
fn claimed_ticket_cannot_be_claimed_again() {
    let mut ticket = common::claimed_ticket(50.0);
    let rejection = ticket
        .handle(
            Event::Claim {
                by: common::outsider(),
                limit: Some(Limit::Unlimited),
            },
            common::now(),
            &common::windows(),
        )
        .unwrap_err();

    assert_eq!(rejection, Rejection::NotClaimable);
    assert_eq!(ticket.claimant, Some(common::exchanger()));
}

#[test]
fn resolved_role_caps_drive_the_claim_guard() {
    // Roles 2 ($100) and 3 ($250) resolve to the stricter cap.
    let limit =
        common::limit_table().resolve(&[RoleId::from(2), RoleId::from(3)]);
    assert_eq!(limit, Some(Limit::Max(100.0)));

    let mut ticket = common::open_ticket("PayPal", "Venmo", 200.0);
    ticket
        .handle(
            Event::Claim { by: common::exchanger(), limit },
            common::now(),
            &common::windows(),
        )
        .unwrap();
    assert_eq!(ticket.status, Status::PendingClaimApproval);
}

#[test]
fn unlimited_role_claims_anything() {
    let limit =
        common::limit_table().resolve(&[RoleId::from(2), RoleId::from(1)]);
    assert_eq!(limit, Some(Limit::Unlimited));

    let mut ticket = common::open_ticket("PayPal", "Venmo", 1_000_000.0);
    ticket
        .handle(
            Event::Claim { by: common::exchanger(), limit },
            common::now(),
            &common::windows(),
        )
        .unwrap();
    assert_eq!(ticket.status, Status::Claimed);
}
