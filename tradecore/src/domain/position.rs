use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{DomainError, Side, require_str};

/// An open position, one per `(trade_id, account_id)`.
///
/// Positions are mutable: `qty` and `avg_entry_price` change as fills arrive.
/// Same-side fills merge with a volume-weighted entry price; opposite-side
/// fills only decrement `qty`. The mutation logic lives in
/// [`TradingState`](crate::projection::TradingState).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub account_id: String,
    pub trade_id: String,
    pub symbol: String,
    pub side: Side,
    pub qty: Decimal,
    pub avg_entry_price: Decimal,
}

impl Position {
    pub fn new(
        account_id: String,
        trade_id: String,
        symbol: String,
        side: Side,
        qty: Decimal,
        avg_entry_price: Decimal,
    ) -> Result<Self, DomainError> {
        require_str("Position", "account_id", &account_id)?;
        require_str("Position", "trade_id", &trade_id)?;
        require_str("Position", "symbol", &symbol)?;
        if qty < Decimal::ZERO {
            return Err(DomainError::invalid(
                "Position",
                "qty",
                "must be non-negative",
            ));
        }
        if avg_entry_price < Decimal::ZERO {
            return Err(DomainError::invalid(
                "Position",
                "avg_entry_price",
                "must be non-negative",
            ));
        }
        Ok(Self {
            account_id,
            trade_id,
            symbol,
            side,
            qty,
            avg_entry_price,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.qty == Decimal::ZERO
    }
}
