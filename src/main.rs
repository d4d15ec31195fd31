use std::{collections::HashMap, error::Error, sync::Arc};

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path, State},
    http::{request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, RequestPartsExt as _, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use derive_more::{Display, From};
use serde::Deserialize;
use time::OffsetDateTime;
use tokio::{fs, net, signal, sync::Mutex, task};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{
    layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

use convert_desk::{
    api, config, db, leaderboard,
    limits::Limits,
    money, relay,
    ticket::{self, Effect, LogEvent, Ticket},
    Config,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = fs::read_to_string("config.toml").await?;
    let config = toml::from_str::<Config>(&config)?;

    let (db_client, db_connection) = db::connect(config.db).await?;

    task::spawn(async move {
        if let Err(e) = db_connection.await {
            panic!("database connection failed: {e}");
        }
    });

    db_client.init_ledger().await?;

    let state = Arc::new(AppState {
        relay: relay::Client::new(&config.relay),
        relay_secret: config.relay.secret,
        db_client,
        tickets: Mutex::new(HashMap::new()),
        limits: Limits::new(config.limits),
        windows: ticket::Windows {
            claim_approval: config.tickets.claim_approval_window,
            confirm: config.tickets.confirm_window,
        },
        category: config.tickets.category,
        channels: config.channels,
    });

    task::spawn({
        let state = Arc::clone(&state);
        let config = config.leaderboard;
        async move {
            leaderboard::run(
                &state.db_client,
                &state.relay,
                &config,
                state.channels.exchanger_board,
                state.channels.customer_board,
            )
            .await;
        }
    });

    let app = Router::new()
        .route("/health", get(health))
        .route("/panel", get(panel))
        .route("/ticket", post(add_ticket))
        .route("/ticket/:id", get(get_ticket).patch(edit_ticket))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = net::TcpListener::bind(config.http.server.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

async fn health() -> &'static str {
    "OK"
}

async fn panel(_: RelayAuth) -> Json<api::Panel> {
    Json(api::Panel {
        card: relay::panel_card(),
        methods: ticket::METHODS
            .iter()
            .map(|m| api::Method {
                name: (*m).to_owned(),
                fee_label: relay::tier_label(m).to_owned(),
            })
            .collect(),
    })
}

#[derive(Deserialize)]
struct AddTicketInput {
    actor: api::Actor,
    from: String,
    to: String,
    /// Free text from the modal; sanitized before parsing.
    amount: String,
}

async fn add_ticket(
    State(state): State<SharedAppState>,
    _: RelayAuth,
    Json(AddTicketInput { actor, from, to, amount }): Json<AddTicketInput>,
) -> Result<Json<api::Ticket>, AddTicketError> {
    use AddTicketError as E;

    if !ticket::is_method(&from) || !ticket::is_method(&to) {
        return Err(E::UnknownMethod);
    }
    if from.eq_ignore_ascii_case(&to) {
        return Err(E::SameMethod);
    }
    let amount = money::parse(&amount)
        .filter(|a| *a > 0.0)
        .ok_or(E::BadAmount)?;

    let name = ticket::channel_name(&from, &to, amount);
    let channel = state
        .relay
        .create_ticket_channel(state.category, &name, actor.id)
        .await?;

    let ticket = Ticket::open(
        actor.id,
        channel,
        from,
        to,
        amount,
        OffsetDateTime::now_utc(),
    );
    best_effort(
        &state,
        relay::Action::Post { channel, card: relay::ticket_card(&ticket) },
    )
    .await;
    best_effort(
        &state,
        relay::Action::Post {
            channel: state.channels.log,
            card: relay::log_card(&ticket, &LogEvent::Opened),
        },
    )
    .await;

    let view = api::Ticket::from(&ticket);
    state.tickets.lock().await.insert(ticket.id, ticket);
    Ok(Json(view))
}

#[derive(Debug, Display, From)]
enum AddTicketError {
    #[display("relay error: {_0}")]
    #[from]
    RelayError(relay::Error),
    #[display("unknown payment method")]
    UnknownMethod,
    #[display("pick two different methods")]
    SameMethod,
    #[display("the amount must be a positive number")]
    BadAmount,
}

impl IntoResponse for AddTicketError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::RelayError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UnknownMethod | Self::SameMethod | Self::BadAmount => {
                StatusCode::BAD_REQUEST
            }
        };
        (status, self.to_string()).into_response()
    }
}

async fn get_ticket(
    State(state): State<SharedAppState>,
    _: RelayAuth,
    Path(id): Path<api::ticket::Id>,
) -> Result<Json<api::Ticket>, GetTicketError> {
    use GetTicketError as E;

    let tickets = state.tickets.lock().await;
    let ticket = tickets.get(&id).ok_or(E::TicketNotFound)?;
    Ok(Json(api::Ticket::from(ticket)))
}

#[derive(Debug, Display)]
enum GetTicketError {
    #[display("the ticket does not exist")]
    TicketNotFound,
}

impl IntoResponse for GetTicketError {
    fn into_response(self) -> Response {
        (StatusCode::NOT_FOUND, self.to_string()).into_response()
    }
}

#[derive(Deserialize)]
struct EditTicketInput {
    actor: api::Actor,
    #[serde(flatten)]
    op: EditTicketOp,
}

#[derive(Deserialize)]
#[serde(content = "data", rename_all = "camelCase", tag = "op")]
enum EditTicketOp {
    Claim,
    AcceptClaim,
    DenyClaim,
    Unclaim,
    ChangeAmount { amount: String },
    ChangeFee { fee: String },
    RequestClose,
    ConfirmClose,
    CancelClose,
    RequestComplete,
    ConfirmComplete,
    CancelComplete,
}

async fn edit_ticket(
    State(state): State<SharedAppState>,
    _: RelayAuth,
    Path(id): Path<api::ticket::Id>,
    Json(EditTicketInput { actor, op }): Json<EditTicketInput>,
) -> Result<Json<api::Ticket>, EditTicketError> {
    use convert_desk::ticket::Event;
    use EditTicketError as E;
    use EditTicketOp as Op;

    let by = actor.id;
    let limit = state.limits.resolve(&actor.roles);

    let event = match op {
        Op::Claim => Event::Claim { by, limit },
        Op::AcceptClaim => Event::AcceptClaim { by },
        Op::DenyClaim => Event::DenyClaim { by },
        Op::Unclaim => Event::Unclaim { by },
        Op::ChangeAmount { amount } => Event::ChangeAmount {
            by,
            amount: money::parse(&amount)
                .filter(|a| *a > 0.0)
                .ok_or(E::BadAmount)?,
        },
        Op::ChangeFee { fee } => Event::ChangeFee {
            by,
            fee: money::parse(&fee).ok_or(E::BadFee)?,
        },
        Op::RequestClose => Event::RequestClose { by, limit },
        Op::ConfirmClose => Event::ConfirmClose { by },
        Op::CancelClose => Event::CancelClose { by },
        Op::RequestComplete => Event::RequestComplete { by },
        Op::ConfirmComplete => Event::ConfirmComplete { by },
        Op::CancelComplete => Event::CancelComplete { by },
    };

    let mut tickets = state.tickets.lock().await;
    let ticket = tickets.get_mut(&id).ok_or(E::TicketNotFound)?;

    let effects =
        ticket.handle(event, OffsetDateTime::now_utc(), &state.windows)?;
    apply_effects(&state, ticket, effects).await?;

    let view = api::Ticket::from(&*ticket);
    if matches!(
        ticket.status,
        ticket::Status::Completed | ticket::Status::Closed,
    ) {
        tickets.remove(&id);
    }
    Ok(Json(view))
}

#[derive(Debug, Display, From)]
enum EditTicketError {
    #[display("storage error: {_0}")]
    #[from]
    DbError(db::Error),
    #[display("{_0}")]
    #[from]
    Rejected(ticket::Rejection),
    #[display("the ticket does not exist")]
    TicketNotFound,
    #[display("the amount must be a positive number")]
    BadAmount,
    #[display("the fee must be a non-negative number")]
    BadFee,
}

impl IntoResponse for EditTicketError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::DbError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Rejected(r) if r.is_authorization() => {
                StatusCode::FORBIDDEN
            }
            Self::Rejected(_) | Self::BadAmount | Self::BadFee => {
                StatusCode::BAD_REQUEST
            }
            Self::TicketNotFound => StatusCode::NOT_FOUND,
        };
        (status, self.to_string()).into_response()
    }
}

/// Executes machine effects in order. The ledger write gates completion;
/// everything else is best-effort against the relay.
async fn apply_effects(
    state: &AppState,
    ticket: &mut Ticket,
    effects: Vec<Effect>,
) -> Result<(), db::Error> {
    use relay::Action;

    for effect in effects {
        match effect {
            Effect::RecordExchange { exchanger, customer, amount } => {
                if let Err(e) = state
                    .db_client
                    .record_exchange(exchanger, customer, amount)
                    .await
                {
                    tracing::error!(
                        "ledger write failed for ticket {}: {e}",
                        ticket.id,
                    );
                    best_effort(
                        state,
                        Action::Post {
                            channel: state.channels.log,
                            card: relay::log_card(
                                ticket,
                                &LogEvent::LedgerWriteFailed,
                            ),
                        },
                    )
                    .await;
                    // Completion is not done until the money is recorded;
                    // the claimant can confirm again.
                    ticket.status = ticket::Status::Claimed;
                    return Err(e);
                }
            }
            Effect::GrantClaimant { claimant } => {
                best_effort(
                    state,
                    Action::GrantClaimant {
                        channel: ticket.channel,
                        claimant,
                    },
                )
                .await;
            }
            Effect::RestorePool => {
                best_effort(
                    state,
                    Action::RestorePool { channel: ticket.channel },
                )
                .await;
            }
            Effect::RefreshCard => {
                best_effort(
                    state,
                    Action::EditCard {
                        channel: ticket.channel,
                        card: relay::ticket_card(ticket),
                    },
                )
                .await;
            }
            Effect::AskClaimApproval { exchanger, limit, expires_at } => {
                best_effort(
                    state,
                    Action::AskClaimApproval {
                        channel: ticket.channel,
                        opener: ticket.opener,
                        card: relay::approval_card(ticket, exchanger, limit),
                        expires_at: expires_at.unix_timestamp(),
                    },
                )
                .await;
            }
            Effect::PostHistory => {
                best_effort(
                    state,
                    Action::Post {
                        channel: state.channels.history,
                        card: relay::history_card(ticket),
                    },
                )
                .await;
            }
            Effect::RefreshCounter => {
                match state.db_client.global_total().await {
                    Ok(total) => {
                        best_effort(
                            state,
                            Action::RenameCounter {
                                channel: state.channels.counter,
                                name: relay::counter_name(total),
                            },
                        )
                        .await;
                    }
                    Err(e) => {
                        tracing::warn!(
                            "failed to read the global total: {e}",
                        );
                    }
                }
            }
            Effect::Log(event) => {
                best_effort(
                    state,
                    Action::Post {
                        channel: state.channels.log,
                        card: relay::log_card(ticket, &event),
                    },
                )
                .await;
            }
            Effect::Archive => {
                best_effort(
                    state,
                    Action::DeleteChannel { channel: ticket.channel },
                )
                .await;
            }
        }
    }

    Ok(())
}

async fn best_effort(state: &AppState, action: relay::Action) {
    if let Err(e) = state.relay.send(&action).await {
        tracing::warn!("relay action failed: {e}");
    }
}

type SharedAppState = Arc<AppState>;

struct AppState {
    db_client: db::Client,

    relay: relay::Client,

    relay_secret: String,

    /// Live tickets. Short-lived conversations only; the ledger is the
    /// durable part.
    tickets: Mutex<HashMap<ticket::Id, Ticket>>,

    limits: Limits,

    windows: ticket::Windows,

    category: relay::ChannelId,

    channels: config::Channels,
}

/// Proof that the request carries the relay's shared secret.
struct RelayAuth;

#[async_trait]
impl FromRequestParts<SharedAppState> for RelayAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut request::Parts,
        state: &SharedAppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AuthError::MissingSecret)?;
        if bearer.token() != state.relay_secret {
            return Err(AuthError::WrongSecret);
        }
        Ok(Self)
    }
}

#[derive(Debug, Display)]
enum AuthError {
    #[display("missing relay secret")]
    MissingSecret,
    #[display("wrong relay secret")]
    WrongSecret,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
    }
}
