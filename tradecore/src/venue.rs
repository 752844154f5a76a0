//! Venue-neutral adapter contract and normalised result/error types.
//!
//! Implementations own transport, signing, retry, and rate-limit handling;
//! the executor sees only these types. All operations are idempotent at the
//! logical level: re-submitting with the same `client_order_id` or
//! re-cancelling an already-gone order must not create new venue state.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{OrderStatus, OrderType, Side, TimeInForce};

/// Venue adapter failure taxonomy.
///
/// Only `Transient` is retried, and only inside the adapter; everything else
/// surfaces to the caller unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VenueError {
    /// Business rejection from the venue. Never retried; the caller projects
    /// it into an `OrderSubmitFailed` or `OrderRejected` event.
    #[error("order rejected: {reason} (code {venue_code})")]
    OrderRejected { venue_code: i64, reason: String },
    /// The caller backs off; the adapter does not retry these.
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// Idempotent success for cancel/query follow-ups, fatal for submits.
    #[error("not found: {0}")]
    NotFound(String),
    /// Raised only after the adapter's internal retries are exhausted.
    #[error("transient venue error: {0}")]
    Transient(String),
    /// Adapter precondition violated. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl VenueError {
    pub fn is_retriable(&self) -> bool {
        matches!(self, VenueError::Transient(_))
    }
}

/// A fill returned inline with an order submission response.
#[derive(Clone, Debug, PartialEq)]
pub struct ImmediateFill {
    pub venue_trade_id: String,
    pub qty: Decimal,
    pub price: Decimal,
    pub fee: Decimal,
    pub fee_asset: String,
    pub is_maker: bool,
}

/// Venue response to an order submission.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitResult {
    pub venue_order_id: String,
    pub status: OrderStatus,
    pub immediate_fills: Vec<ImmediateFill>,
}

/// Venue response to an order cancellation.
#[derive(Clone, Debug, PartialEq)]
pub struct CancelResult {
    pub venue_order_id: String,
    pub status: OrderStatus,
}

/// An order as reported by the venue on query.
#[derive(Clone, Debug, PartialEq)]
pub struct VenueOrder {
    pub venue_order_id: String,
    pub client_order_id: String,
    pub status: OrderStatus,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub qty: Decimal,
    pub filled_qty: Decimal,
    /// `None` exactly when `order_type` is market.
    pub price: Option<Decimal>,
}

/// A historical trade record from the venue.
#[derive(Clone, Debug, PartialEq)]
pub struct VenueTrade {
    pub venue_trade_id: String,
    pub venue_order_id: String,
    /// Empty when the venue's trade history does not echo it back.
    pub client_order_id: String,
    pub symbol: String,
    pub side: Side,
    pub qty: Decimal,
    pub price: Decimal,
    pub fee: Decimal,
    pub fee_asset: String,
    pub is_maker: bool,
    pub timestamp: DateTime<Utc>,
}

/// A single asset balance.
#[derive(Clone, Debug, PartialEq)]
pub struct BalanceEntry {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
}

/// Venue-imposed trading filters for a symbol.
#[derive(Clone, Debug, PartialEq)]
pub struct SymbolFilters {
    pub symbol: String,
    pub tick_size: Decimal,
    pub lot_step: Decimal,
    pub lot_min: Decimal,
    pub lot_max: Decimal,
    pub min_notional: Decimal,
}

/// Optional submit parameters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubmitOpts {
    /// Limit price; required for limit orders.
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    /// Deterministic client order identifier assigned by the core.
    pub client_order_id: Option<String>,
    pub time_in_force: Option<TimeInForce>,
}

/// Venue-agnostic capability set consumed by the executor.
#[async_trait]
pub trait VenueAdapter: Send + Sync {
    async fn submit_order(
        &self,
        account_id: &str,
        symbol: &str,
        side: Side,
        order_type: OrderType,
        qty: Decimal,
        opts: SubmitOpts,
    ) -> Result<SubmitResult, VenueError>;

    /// At least one of `venue_order_id` / `client_order_id` must be supplied.
    async fn cancel_order(
        &self,
        account_id: &str,
        symbol: &str,
        venue_order_id: Option<&str>,
        client_order_id: Option<&str>,
    ) -> Result<CancelResult, VenueError>;

    /// At least one of `venue_order_id` / `client_order_id` must be supplied.
    async fn query_order(
        &self,
        account_id: &str,
        symbol: &str,
        venue_order_id: Option<&str>,
        client_order_id: Option<&str>,
    ) -> Result<VenueOrder, VenueError>;

    async fn query_open_orders(
        &self,
        account_id: &str,
        symbol: &str,
    ) -> Result<Vec<VenueOrder>, VenueError>;

    /// An empty `assets` set short-circuits to an empty result without a
    /// network call.
    async fn query_balance(
        &self,
        account_id: &str,
        assets: &HashSet<String>,
    ) -> Result<Vec<BalanceEntry>, VenueError>;

    async fn query_trades(
        &self,
        account_id: &str,
        symbol: &str,
        start_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<VenueTrade>, VenueError>;

    async fn get_exchange_info(&self, symbol: &str) -> Result<SymbolFilters, VenueError>;

    /// Venue server time in milliseconds since the Unix epoch.
    async fn get_server_time(&self) -> Result<i64, VenueError>;
}
