use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Integer partition of the event log. Sequence numbers and fill dedup keys
/// are scoped to one epoch; a new epoch is opened per process or recovery
/// boundary.
pub type EpochId = i64;

/// Constructor-time invariant violation. No domain value is ever partially
/// constructed; the first failing field aborts construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{entity}.{field} {reason}")]
    InvalidArgument {
        entity: &'static str,
        field: &'static str,
        reason: &'static str,
    },
}

impl DomainError {
    pub fn invalid(entity: &'static str, field: &'static str, reason: &'static str) -> Self {
        DomainError::InvalidArgument {
            entity,
            field,
            reason,
        }
    }
}

pub(crate) fn require_str(
    entity: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), DomainError> {
    if value.is_empty() {
        return Err(DomainError::invalid(entity, field, "must be non-empty"));
    }
    Ok(())
}

pub(crate) fn require_str_opt(
    entity: &'static str,
    field: &'static str,
    value: Option<&str>,
) -> Result<(), DomainError> {
    match value {
        Some(v) => require_str(entity, field, v),
        None => Ok(()),
    }
}

/// Buy or sell direction for orders, fills, and positions.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Buy,
    Sell,
}

impl AsRef<str> for Side {
    fn as_ref(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

/// Order types accepted by the venue contract. Only the first three are
/// translatable by the Binance Spot adapter's submit path today; the rest are
/// reserved for bracket and composite execution.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
    Limit,
    LimitIoc,
    Stop,
    StopLimit,
    TakeProfit,
    TpLimit,
    Oco,
}

/// Order lifecycle states. Transitions are append-only: non-terminal states
/// may advance, terminal states never change again.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Submitting,
    Open,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Canceled
                | OrderStatus::Rejected
                | OrderStatus::Expired
        )
    }
}

/// Trade-level execution state reported to the upstream manager.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    Pending,
    Partial,
    Paused,
    Filled,
    Canceled,
    Rejected,
    Expired,
}

impl TradeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TradeStatus::Filled
                | TradeStatus::Canceled
                | TradeStatus::Rejected
                | TradeStatus::Expired
        )
    }
}

/// Execution strategy requested by a command. Only `SingleShot` is executed
/// by this core; the others are routed to strategy workers upstream.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionMode {
    SingleShot,
    Bracket,
    Twap,
    ScheduledVwap,
    Iceberg,
    TimeDca,
    LadderDca,
}

/// Maker/taker preference carried on a command.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MakerPreference {
    MakerOnly,
    MakerPreferred,
    NoPreference,
}

/// Venue-side self-trade prevention policy.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StpMode {
    ExpireTaker,
    ExpireMaker,
    ExpireBoth,
    None,
}

/// Time in force for limit orders.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeInForce {
    Gtc,
    Gtx,
    Fok,
    Ioc,
}

impl AsRef<str> for TimeInForce {
    fn as_ref(&self) -> &'static str {
        match self {
            TimeInForce::Gtc => "GTC",
            TimeInForce::Gtx => "GTX",
            TimeInForce::Fok => "FOK",
            TimeInForce::Ioc => "IOC",
        }
    }
}
