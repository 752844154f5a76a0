use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{DomainError, OrderStatus, OrderType, Side, require_str, require_str_opt};

/// A trading order tracked from submit intent through a terminal state.
///
/// Orders are mutable: `status`, `filled_qty`, `venue_order_id`, and
/// `updated_at` change as the venue reports events. The mutation logic lives
/// in [`TradingState`](crate::projection::TradingState).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub client_order_id: String,
    /// Venue-assigned identifier, `None` until the venue acknowledges.
    pub venue_order_id: Option<String>,
    pub account_id: String,
    pub command_id: String,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub qty: Decimal,
    pub filled_qty: Decimal,
    /// Limit price, `None` for market orders.
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client_order_id: String,
        venue_order_id: Option<String>,
        account_id: String,
        command_id: String,
        symbol: String,
        side: Side,
        order_type: OrderType,
        qty: Decimal,
        filled_qty: Decimal,
        price: Option<Decimal>,
        stop_price: Option<Decimal>,
        status: OrderStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        require_str("Order", "client_order_id", &client_order_id)?;
        require_str_opt("Order", "venue_order_id", venue_order_id.as_deref())?;
        require_str("Order", "account_id", &account_id)?;
        require_str("Order", "command_id", &command_id)?;
        require_str("Order", "symbol", &symbol)?;
        if qty <= Decimal::ZERO {
            return Err(DomainError::invalid("Order", "qty", "must be positive"));
        }
        if filled_qty < Decimal::ZERO {
            return Err(DomainError::invalid(
                "Order",
                "filled_qty",
                "must be non-negative",
            ));
        }
        if filled_qty > qty {
            return Err(DomainError::invalid(
                "Order",
                "filled_qty",
                "cannot exceed qty",
            ));
        }
        if price.is_some_and(|p| p < Decimal::ZERO) {
            return Err(DomainError::invalid("Order", "price", "must be non-negative"));
        }
        if stop_price.is_some_and(|p| p < Decimal::ZERO) {
            return Err(DomainError::invalid(
                "Order",
                "stop_price",
                "must be non-negative",
            ));
        }
        Ok(Self {
            client_order_id,
            venue_order_id,
            account_id,
            command_id,
            symbol,
            side,
            order_type,
            qty,
            filled_qty,
            price,
            stop_price,
            status,
            created_at,
            updated_at,
        })
    }

    /// True once the order has reached a state it can never leave.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn remaining_qty(&self) -> Decimal {
        self.qty - self.filled_qty
    }
}
