use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{DomainError, TradeStatus, require_str};

/// Point-in-time snapshot of trade execution status pushed to the upstream
/// manager. Both intermediate progress and terminal completion use this
/// type; at-most-one terminal outcome per `command_id` is enforced by the
/// emitter, not here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub command_id: String,
    pub trade_id: String,
    pub account_id: String,
    pub status: TradeStatus,
    pub target_qty: Decimal,
    pub filled_qty: Decimal,
    /// VWAP across all fills; `None` exactly when nothing filled.
    pub avg_fill_price: Option<Decimal>,
    pub slices_completed: u32,
    pub slices_total: u32,
    pub reason: Option<String>,
    pub missed_iterations: Option<u32>,
    pub missed_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TradeOutcome {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        command_id: String,
        trade_id: String,
        account_id: String,
        status: TradeStatus,
        target_qty: Decimal,
        filled_qty: Decimal,
        avg_fill_price: Option<Decimal>,
        slices_completed: u32,
        slices_total: u32,
        reason: Option<String>,
        missed_iterations: Option<u32>,
        missed_reason: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        require_str("TradeOutcome", "command_id", &command_id)?;
        require_str("TradeOutcome", "trade_id", &trade_id)?;
        require_str("TradeOutcome", "account_id", &account_id)?;
        if target_qty <= Decimal::ZERO {
            return Err(DomainError::invalid(
                "TradeOutcome",
                "target_qty",
                "must be positive",
            ));
        }
        if filled_qty < Decimal::ZERO {
            return Err(DomainError::invalid(
                "TradeOutcome",
                "filled_qty",
                "must be non-negative",
            ));
        }
        if filled_qty > target_qty {
            return Err(DomainError::invalid(
                "TradeOutcome",
                "filled_qty",
                "cannot exceed target_qty",
            ));
        }
        if avg_fill_price.is_some_and(|p| p <= Decimal::ZERO) {
            return Err(DomainError::invalid(
                "TradeOutcome",
                "avg_fill_price",
                "must be positive",
            ));
        }
        if filled_qty == Decimal::ZERO && avg_fill_price.is_some() {
            return Err(DomainError::invalid(
                "TradeOutcome",
                "avg_fill_price",
                "must be absent when filled_qty is zero",
            ));
        }
        if filled_qty > Decimal::ZERO && avg_fill_price.is_none() {
            return Err(DomainError::invalid(
                "TradeOutcome",
                "avg_fill_price",
                "must be present when filled_qty is non-zero",
            ));
        }
        if slices_total == 0 {
            return Err(DomainError::invalid(
                "TradeOutcome",
                "slices_total",
                "must be positive",
            ));
        }
        if slices_completed > slices_total {
            return Err(DomainError::invalid(
                "TradeOutcome",
                "slices_completed",
                "cannot exceed slices_total",
            ));
        }
        Ok(Self {
            command_id,
            trade_id,
            account_id,
            status,
            target_qty,
            filled_qty,
            avg_fill_price,
            slices_completed,
            slices_total,
            reason,
            missed_iterations,
            missed_reason,
            created_at,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn fill_ratio(&self) -> Decimal {
        self.filled_qty / self.target_qty
    }
}
