//! The ticket state machine.
//!
//! A ticket reacts to interaction events through [`Ticket::handle`], which
//! validates the actor against the current state, applies the transition and
//! returns the side effects for the caller to execute in order. The machine
//! never touches the clock, the store or the relay, so every transition is
//! testable without a running stack.

use std::time::Duration;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    db::user,
    limits::Limit,
    money::{self, Quote},
    relay::ChannelId,
};

/// Payment methods offered by the intake panel.
pub const METHODS: [&str; 7] =
    ["PayPal", "Venmo", "ApplePay", "Zelle", "Chime", "Cashapp", "Crypto"];

pub fn is_method(name: &str) -> bool {
    METHODS.iter().any(|m| m.eq_ignore_ascii_case(name))
}

/// Channel name for a fresh ticket: `paypal-crypto-200` (`200-50` when the
/// amount is fractional).
pub fn channel_name(from: &str, to: &str, amount: f64) -> String {
    let amount = if amount.fract() == 0.0 {
        format!("{amount:.0}")
    } else {
        format!("{amount:.2}").replace('.', "-")
    };
    format!("{}-{}-{amount}", from.to_lowercase(), to.to_lowercase())
}

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq,
    Serialize,
)]
pub struct Id(Uuid);

impl Id {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<u128> for Id {
    fn from(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Open,
    PendingClaimApproval,
    Claimed,
    Completed,
    Closed,
}

/// Validity windows of the two-step prompts.
#[derive(Clone, Copy, Debug)]
pub struct Windows {
    /// How long the opener has to answer a claim escalation.
    pub claim_approval: Duration,
    /// How long a close/complete confirmation stays valid.
    pub confirm: Duration,
}

/// An unanswered prompt attached to the ticket.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Pending {
    /// An exchanger asked to claim over their cap; the opener decides.
    ClaimApproval {
        exchanger: user::Id,
        limit: f64,
        expires_at: OffsetDateTime,
    },
    /// A destructive action awaits its second, confirming press.
    Confirm {
        action: ConfirmAction,
        by: user::Id,
        expires_at: OffsetDateTime,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfirmAction {
    Close,
    Complete,
}

#[derive(Clone, Debug)]
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
    pub opened_at: OffsetDateTime,
}

/// An interaction event, already resolved by the transport layer: amounts
/// parsed, the actor's effective limit looked up.
#[derive(Clone, Copy, Debug)]
pub enum Event {
    Claim { by: user::Id, limit: Option<Limit> },
    AcceptClaim { by: user::Id },
    DenyClaim { by: user::Id },
    Unclaim { by: user::Id },
    ChangeAmount { by: user::Id, amount: f64 },
    ChangeFee { by: user::Id, fee: f64 },
    RequestClose { by: user::Id, limit: Option<Limit> },
    ConfirmClose { by: user::Id },
    CancelClose { by: user::Id },
    RequestComplete { by: user::Id },
    ConfirmComplete { by: user::Id },
    CancelComplete { by: user::Id },
}

/// Ordered side effects of a successful transition.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Narrow the channel down to the claimant.
    GrantClaimant { claimant: user::Id },
    /// Reopen the channel to every eligible claimant.
    RestorePool,
    /// Re-render the ticket card from the current state.
    RefreshCard,
    /// Prompt the opener to allow an over-limit claim.
    AskClaimApproval {
        exchanger: user::Id,
        limit: f64,
        expires_at: OffsetDateTime,
    },
    /// Tally the exchange into the ledger. Gates completion: the caller must
    /// not report the ticket Completed until this has succeeded.
    RecordExchange {
        exchanger: user::Id,
        customer: user::Id,
        amount: f64,
    },
    /// Post the immutable completion record to the history channel.
    PostHistory,
    /// Re-derive and re-render the global counter.
    RefreshCounter,
    /// Mirror an event to the operator log channel.
    Log(LogEvent),
    /// Delete the backing channel.
    Archive,
}

/// Operator-log events; the relay boundary decides how they render.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LogEvent {
    Opened,
    Claimed { by: user::Id },
    EscalationRequested { by: user::Id, limit: f64 },
    EscalationAccepted { exchanger: user::Id },
    EscalationDenied { exchanger: user::Id },
    Unclaimed { by: user::Id },
    NegativeNet { fee: f64, net: f64 },
    Closed { by: user::Id },
    Completed { by: user::Id, amount: f64 },
    LedgerWriteFailed,
}

/// Why an event was refused. A rejected event changes no state.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Rejection {
    #[display("only exchangers may do that")]
    ExchangerRoleRequired,
    #[display("this ticket is not open for claims")]
    NotClaimable,
    #[display("no claim is awaiting approval")]
    NoPendingApproval,
    #[display("only the ticket opener may answer this request")]
    NotYourApproval,
    #[display("this ticket has no claimant yet")]
    NotClaimed,
    #[display("only the claimant may do that")]
    NotTheClaimant,
    #[display("the fee cannot be negative")]
    NegativeFee,
    #[display("this ticket cannot be closed now")]
    NotClosable,
    #[display("nothing awaits confirmation")]
    NothingToConfirm,
    #[display("this confirmation belongs to someone else")]
    NotYourConfirmation,
}

impl Rejection {
    /// Whether the refusal is about who pressed, not about ticket state.
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            Self::ExchangerRoleRequired
                | Self::NotYourApproval
                | Self::NotTheClaimant
                | Self::NotYourConfirmation
        )
    }
}

impl Ticket {
    /// A fresh ticket in its newly created channel, quoted from the send
    /// method. The caller has already validated the methods and the amount.
    pub fn open(
        opener: user::Id,
        channel: ChannelId,
        from: String,
        to: String,
        amount: f64,
        now: OffsetDateTime,
    ) -> Self {
        let Quote { fee, net } = money::quote(amount, &from);
        Self {
            id: Id::new(),
            channel,
            from,
            to,
            amount,
            fee,
            net,
            opener,
            claimant: None,
            status: Status::Open,
            pending: None,
            opened_at: now,
        }
    }

    /// Applies one event, returning the side effects to execute in order.
    pub fn handle(
        &mut self,
        event: Event,
        now: OffsetDateTime,
        windows: &Windows,
    ) -> Result<Vec<Effect>, Rejection> {
        self.lapse(now);
        match event {
            Event::Claim { by, limit } => self.claim(by, limit, now, windows),
            Event::AcceptClaim { by } => self.accept_claim(by),
            Event::DenyClaim { by } => self.deny_claim(by),
            Event::Unclaim { by } => self.unclaim(by),
            Event::ChangeAmount { by, amount } => {
                self.change_amount(by, amount)
            }
            Event::ChangeFee { by, fee } => self.change_fee(by, fee),
            Event::RequestClose { by, limit } => {
                self.request_close(by, limit, now, windows)
            }
            Event::ConfirmClose { by } => self.confirm_close(by),
            Event::CancelClose { by } => self.cancel(ConfirmAction::Close, by),
            Event::RequestComplete { by } => {
                self.request_complete(by, now, windows)
            }
            Event::ConfirmComplete { by } => self.confirm_complete(by),
            Event::CancelComplete { by } => {
                self.cancel(ConfirmAction::Complete, by)
            }
        }
    }

    /// Drops prompts whose window has passed. An expired claim approval
    /// counts as denied and reopens the ticket; an expired confirmation is
    /// simply forgotten.
    fn lapse(&mut self, now: OffsetDateTime) {
        match self.pending {
            Some(Pending::ClaimApproval { expires_at, .. })
                if now >= expires_at =>
            {
                self.pending = None;
                self.status = Status::Open;
            }
            Some(Pending::Confirm { expires_at, .. }) if now >= expires_at => {
                self.pending = None;
            }
            _ => {}
        }
    }

    fn claim(
        &mut self,
        by: user::Id,
        limit: Option<Limit>,
        now: OffsetDateTime,
        windows: &Windows,
    ) -> Result<Vec<Effect>, Rejection> {
        if self.status != Status::Open {
            return Err(Rejection::NotClaimable);
        }
        // Roleless members are refused outright: escalation vouches for a
        // known exchanger above their cap, which they are not.
        let limit = limit.ok_or(Rejection::ExchangerRoleRequired)?;

        let exceeded = match limit {
            Limit::Unlimited => None,
            Limit::Max(max) if self.amount <= max => None,
            Limit::Max(max) => Some(max),
        };
        if let Some(max) = exceeded {
            let expires_at = now + windows.claim_approval;
            self.status = Status::PendingClaimApproval;
            self.pending = Some(Pending::ClaimApproval {
                exchanger: by,
                limit: max,
                expires_at,
            });
            Ok(vec![
                Effect::AskClaimApproval {
                    exchanger: by,
                    limit: max,
                    expires_at,
                },
                Effect::Log(LogEvent::EscalationRequested { by, limit: max }),
            ])
        } else {
            self.status = Status::Claimed;
            self.claimant = Some(by);
            self.pending = None;
            Ok(vec![
                Effect::GrantClaimant { claimant: by },
                Effect::RefreshCard,
                Effect::Log(LogEvent::Claimed { by }),
            ])
        }
    }

    fn accept_claim(&mut self, by: user::Id) -> Result<Vec<Effect>, Rejection> {
        let Some(Pending::ClaimApproval { exchanger, .. }) = self.pending
        else {
            return Err(Rejection::NoPendingApproval);
        };
        if by != self.opener {
            return Err(Rejection::NotYourApproval);
        }
        self.pending = None;
        self.status = Status::Claimed;
        self.claimant = Some(exchanger);
        Ok(vec![
            Effect::GrantClaimant { claimant: exchanger },
            Effect::RefreshCard,
            Effect::Log(LogEvent::EscalationAccepted { exchanger }),
        ])
    }

    fn deny_claim(&mut self, by: user::Id) -> Result<Vec<Effect>, Rejection> {
        let Some(Pending::ClaimApproval { exchanger, .. }) = self.pending
        else {
            return Err(Rejection::NoPendingApproval);
        };
        if by != self.opener {
            return Err(Rejection::NotYourApproval);
        }
        self.pending = None;
        self.status = Status::Open;
        Ok(vec![Effect::Log(LogEvent::EscalationDenied { exchanger })])
    }

    fn unclaim(&mut self, by: user::Id) -> Result<Vec<Effect>, Rejection> {
        self.claimant_only(by)?;
        self.status = Status::Open;
        self.claimant = None;
        self.pending = None;
        Ok(vec![
            Effect::RestorePool,
            Effect::RefreshCard,
            Effect::Log(LogEvent::Unclaimed { by }),
        ])
    }

    fn change_amount(
        &mut self,
        by: user::Id,
        amount: f64,
    ) -> Result<Vec<Effect>, Rejection> {
        self.claimant_only(by)?;
        // Requote with the ticket's own send method, so a crypto ticket
        // keeps its 5 % rate.
        let Quote { fee, net } = money::quote(amount, &self.from);
        self.amount = amount;
        self.fee = fee;
        self.net = net;
        self.pending = None;
        Ok(vec![Effect::RefreshCard])
    }

    fn change_fee(
        &mut self,
        by: user::Id,
        fee: f64,
    ) -> Result<Vec<Effect>, Rejection> {
        self.claimant_only(by)?;
        if fee < 0.0 {
            return Err(Rejection::NegativeFee);
        }
        self.fee = money::round2(fee);
        self.net = money::round2(self.amount - self.fee);
        self.pending = None;
        let mut effects = vec![Effect::RefreshCard];
        if self.net < 0.0 {
            // Permitted (rebates happen), but worth an operator's glance.
            effects.push(Effect::Log(LogEvent::NegativeNet {
                fee: self.fee,
                net: self.net,
            }));
        }
        Ok(effects)
    }

    fn request_close(
        &mut self,
        by: user::Id,
        limit: Option<Limit>,
        now: OffsetDateTime,
        windows: &Windows,
    ) -> Result<Vec<Effect>, Rejection> {
        if !matches!(self.status, Status::Open | Status::Claimed) {
            return Err(Rejection::NotClosable);
        }
        if limit.is_none() {
            return Err(Rejection::ExchangerRoleRequired);
        }
        self.pending = Some(Pending::Confirm {
            action: ConfirmAction::Close,
            by,
            expires_at: now + windows.confirm,
        });
        Ok(vec![])
    }

    fn confirm_close(&mut self, by: user::Id) -> Result<Vec<Effect>, Rejection> {
        self.take_confirmation(ConfirmAction::Close, by)?;
        self.status = Status::Closed;
        Ok(vec![Effect::Log(LogEvent::Closed { by }), Effect::Archive])
    }

    fn request_complete(
        &mut self,
        by: user::Id,
        now: OffsetDateTime,
        windows: &Windows,
    ) -> Result<Vec<Effect>, Rejection> {
        self.claimant_only(by)?;
        self.pending = Some(Pending::Confirm {
            action: ConfirmAction::Complete,
            by,
            expires_at: now + windows.confirm,
        });
        Ok(vec![])
    }

    fn confirm_complete(
        &mut self,
        by: user::Id,
    ) -> Result<Vec<Effect>, Rejection> {
        self.claimant_only(by)?;
        self.take_confirmation(ConfirmAction::Complete, by)?;
        self.status = Status::Completed;
        Ok(vec![
            Effect::RecordExchange {
                exchanger: by,
                customer: self.opener,
                amount: self.amount,
            },
            Effect::PostHistory,
            Effect::RefreshCounter,
            Effect::Log(LogEvent::Completed { by, amount: self.amount }),
            Effect::Archive,
        ])
    }

    fn cancel(
        &mut self,
        action: ConfirmAction,
        by: user::Id,
    ) -> Result<Vec<Effect>, Rejection> {
        self.take_confirmation(action, by)?;
        Ok(vec![])
    }

    /// Claimed-ticket actions only the claimant may take.
    fn claimant_only(&self, by: user::Id) -> Result<(), Rejection> {
        if self.status != Status::Claimed {
            return Err(Rejection::NotClaimed);
        }
        if self.claimant != Some(by) {
            return Err(Rejection::NotTheClaimant);
        }
        Ok(())
    }

    /// Consumes a live confirmation, enforcing the two-step pattern: only
    /// the member who requested the action may confirm or cancel it.
    fn take_confirmation(
        &mut self,
        action: ConfirmAction,
        by: user::Id,
    ) -> Result<(), Rejection> {
        match self.pending {
            Some(Pending::Confirm { action: pending, by: holder, .. })
                if pending == action =>
            {
                if holder != by {
                    return Err(Rejection::NotYourConfirmation);
                }
                self.pending = None;
                Ok(())
            }
            _ => Err(Rejection::NothingToConfirm),
        }
    }
}
