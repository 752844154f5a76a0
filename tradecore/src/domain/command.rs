use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{
    DomainError,
    ExecutionMode,
    MakerPreference,
    OrderType,
    Side,
    StpMode,
    require_str,
};

/// Price parameters for `SingleShot` execution. Other execution modes carry
/// their own parameter types upstream.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SingleShotParams {
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    /// Stop leg price for OCO orders.
    pub stop_limit_price: Option<Decimal>,
}

impl SingleShotParams {
    pub fn new(
        price: Option<Decimal>,
        stop_price: Option<Decimal>,
        stop_limit_price: Option<Decimal>,
    ) -> Result<Self, DomainError> {
        for (field, value) in [
            ("price", price),
            ("stop_price", stop_price),
            ("stop_limit_price", stop_limit_price),
        ] {
            if value.is_some_and(|v| v <= Decimal::ZERO) {
                return Err(DomainError::invalid(
                    "SingleShotParams",
                    field,
                    "must be positive",
                ));
            }
        }
        Ok(Self {
            price,
            stop_price,
            stop_limit_price,
        })
    }
}

/// An execution instruction from the upstream manager. Immutable: once
/// issued, no field changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeCommand {
    pub command_id: String,
    pub trade_id: String,
    pub account_id: String,
    pub symbol: String,
    pub side: Side,
    pub qty: Decimal,
    pub order_type: OrderType,
    pub execution_mode: ExecutionMode,
    pub execution_params: SingleShotParams,
    /// Application-level execution deadline in seconds. Surfaced to the
    /// executor, not enforced by the venue adapter.
    pub timeout_secs: u64,
    pub reference_price: Option<Decimal>,
    pub maker_preference: MakerPreference,
    pub stp_mode: StpMode,
    pub created_at: DateTime<Utc>,
}

impl TradeCommand {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        command_id: String,
        trade_id: String,
        account_id: String,
        symbol: String,
        side: Side,
        qty: Decimal,
        order_type: OrderType,
        execution_mode: ExecutionMode,
        execution_params: SingleShotParams,
        timeout_secs: u64,
        reference_price: Option<Decimal>,
        maker_preference: MakerPreference,
        stp_mode: StpMode,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        require_str("TradeCommand", "command_id", &command_id)?;
        require_str("TradeCommand", "trade_id", &trade_id)?;
        require_str("TradeCommand", "account_id", &account_id)?;
        require_str("TradeCommand", "symbol", &symbol)?;
        if qty <= Decimal::ZERO {
            return Err(DomainError::invalid(
                "TradeCommand",
                "qty",
                "must be positive",
            ));
        }
        if timeout_secs == 0 {
            return Err(DomainError::invalid(
                "TradeCommand",
                "timeout_secs",
                "must be positive",
            ));
        }
        if reference_price.is_some_and(|p| p <= Decimal::ZERO) {
            return Err(DomainError::invalid(
                "TradeCommand",
                "reference_price",
                "must be positive",
            ));
        }
        Ok(Self {
            command_id,
            trade_id,
            account_id,
            symbol,
            side,
            qty,
            order_type,
            execution_mode,
            execution_params,
            timeout_secs,
            reference_price,
            maker_preference,
            stp_mode,
            created_at,
        })
    }
}

/// A cancel instruction addressing a previously issued command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeAbort {
    pub command_id: String,
    pub account_id: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl TradeAbort {
    pub fn new(
        command_id: String,
        account_id: String,
        reason: String,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        require_str("TradeAbort", "command_id", &command_id)?;
        require_str("TradeAbort", "account_id", &account_id)?;
        require_str("TradeAbort", "reason", &reason)?;
        Ok(Self {
            command_id,
            account_id,
            reason,
            created_at,
        })
    }
}
