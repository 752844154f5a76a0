use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::types::{DomainError, Side, require_str};

/// A single execution reported by the venue. Immutable once constructed; one
/// order may produce many fills.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    /// Venue-assigned trade identifier; primary dedup key. May be empty when
    /// the venue does not report one, in which case the composite fallback
    /// key applies.
    pub venue_trade_id: String,
    pub venue_order_id: String,
    pub client_order_id: String,
    pub account_id: String,
    pub trade_id: String,
    pub command_id: String,
    pub symbol: String,
    pub side: Side,
    pub qty: Decimal,
    pub price: Decimal,
    pub fee: Decimal,
    pub fee_asset: String,
    pub is_maker: bool,
    pub timestamp: DateTime<Utc>,
}

impl Fill {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        venue_trade_id: String,
        venue_order_id: String,
        client_order_id: String,
        account_id: String,
        trade_id: String,
        command_id: String,
        symbol: String,
        side: Side,
        qty: Decimal,
        price: Decimal,
        fee: Decimal,
        fee_asset: String,
        is_maker: bool,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        require_str("Fill", "venue_order_id", &venue_order_id)?;
        require_str("Fill", "client_order_id", &client_order_id)?;
        require_str("Fill", "account_id", &account_id)?;
        require_str("Fill", "trade_id", &trade_id)?;
        require_str("Fill", "command_id", &command_id)?;
        require_str("Fill", "symbol", &symbol)?;
        require_str("Fill", "fee_asset", &fee_asset)?;
        if qty <= Decimal::ZERO {
            return Err(DomainError::invalid("Fill", "qty", "must be positive"));
        }
        if price <= Decimal::ZERO {
            return Err(DomainError::invalid("Fill", "price", "must be positive"));
        }
        if fee < Decimal::ZERO {
            return Err(DomainError::invalid("Fill", "fee", "must be non-negative"));
        }
        Ok(Self {
            venue_trade_id,
            venue_order_id,
            client_order_id,
            account_id,
            trade_id,
            command_id,
            symbol,
            side,
            qty,
            price,
            fee,
            fee_asset,
            is_maker,
            timestamp,
        })
    }

    /// Deduplication key: `venue_trade_id` when the venue supplied one,
    /// otherwise a canonical JSON encoding of
    /// `(venue_order_id, price, qty, timestamp)`.
    pub fn dedup_key(&self) -> String {
        dedup_key(
            &self.venue_trade_id,
            &self.venue_order_id,
            self.price,
            self.qty,
            self.timestamp,
        )
    }
}

/// Shared with the spine so that `FillReceived` events produce the same key
/// as the `Fill` value they describe.
pub(crate) fn dedup_key(
    venue_trade_id: &str,
    venue_order_id: &str,
    price: Decimal,
    qty: Decimal,
    timestamp: DateTime<Utc>,
) -> String {
    if !venue_trade_id.is_empty() {
        return venue_trade_id.to_string();
    }
    json!([venue_order_id, price, qty, timestamp]).to_string()
}
