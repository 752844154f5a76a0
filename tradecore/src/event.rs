//! Domain events appended to the spine and folded by the projection.
//!
//! Each concrete variant is an immutable fact carrying `account_id` and a
//! UTC timestamp. The enum is closed over the known variants plus
//! [`Event::Unknown`], which preserves the raw tag and payload of a
//! forward-incompatible event instead of dropping it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{DomainError, OrderType, Side, require_str, require_str_opt};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandAccepted {
    pub account_id: String,
    pub timestamp: DateTime<Utc>,
    pub command_id: String,
    pub trade_id: String,
}

impl CommandAccepted {
    pub fn new(
        account_id: String,
        timestamp: DateTime<Utc>,
        command_id: String,
        trade_id: String,
    ) -> Result<Self, DomainError> {
        require_str("CommandAccepted", "account_id", &account_id)?;
        require_str("CommandAccepted", "command_id", &command_id)?;
        require_str("CommandAccepted", "trade_id", &trade_id)?;
        Ok(Self {
            account_id,
            timestamp,
            command_id,
            trade_id,
        })
    }
}

/// Intent to submit an order, recorded before the venue is contacted. This is
/// the event that creates the order in the projection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderSubmitIntent {
    pub account_id: String,
    pub timestamp: DateTime<Utc>,
    pub command_id: String,
    pub trade_id: String,
    pub client_order_id: String,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub qty: Decimal,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
}

impl OrderSubmitIntent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        account_id: String,
        timestamp: DateTime<Utc>,
        command_id: String,
        trade_id: String,
        client_order_id: String,
        symbol: String,
        side: Side,
        order_type: OrderType,
        qty: Decimal,
        price: Option<Decimal>,
        stop_price: Option<Decimal>,
    ) -> Result<Self, DomainError> {
        require_str("OrderSubmitIntent", "account_id", &account_id)?;
        require_str("OrderSubmitIntent", "command_id", &command_id)?;
        require_str("OrderSubmitIntent", "trade_id", &trade_id)?;
        require_str("OrderSubmitIntent", "client_order_id", &client_order_id)?;
        require_str("OrderSubmitIntent", "symbol", &symbol)?;
        if qty <= Decimal::ZERO {
            return Err(DomainError::invalid(
                "OrderSubmitIntent",
                "qty",
                "must be positive",
            ));
        }
        if price.is_some_and(|p| p <= Decimal::ZERO) {
            return Err(DomainError::invalid(
                "OrderSubmitIntent",
                "price",
                "must be positive",
            ));
        }
        if stop_price.is_some_and(|p| p <= Decimal::ZERO) {
            return Err(DomainError::invalid(
                "OrderSubmitIntent",
                "stop_price",
                "must be positive",
            ));
        }
        Ok(Self {
            account_id,
            timestamp,
            command_id,
            trade_id,
            client_order_id,
            symbol,
            side,
            order_type,
            qty,
            price,
            stop_price,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderSubmitted {
    pub account_id: String,
    pub timestamp: DateTime<Utc>,
    pub client_order_id: String,
    pub venue_order_id: String,
}

impl OrderSubmitted {
    pub fn new(
        account_id: String,
        timestamp: DateTime<Utc>,
        client_order_id: String,
        venue_order_id: String,
    ) -> Result<Self, DomainError> {
        require_str("OrderSubmitted", "account_id", &account_id)?;
        require_str("OrderSubmitted", "client_order_id", &client_order_id)?;
        require_str("OrderSubmitted", "venue_order_id", &venue_order_id)?;
        Ok(Self {
            account_id,
            timestamp,
            client_order_id,
            venue_order_id,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderSubmitFailed {
    pub account_id: String,
    pub timestamp: DateTime<Utc>,
    pub client_order_id: String,
    pub reason: String,
}

impl OrderSubmitFailed {
    pub fn new(
        account_id: String,
        timestamp: DateTime<Utc>,
        client_order_id: String,
        reason: String,
    ) -> Result<Self, DomainError> {
        require_str("OrderSubmitFailed", "account_id", &account_id)?;
        require_str("OrderSubmitFailed", "client_order_id", &client_order_id)?;
        require_str("OrderSubmitFailed", "reason", &reason)?;
        Ok(Self {
            account_id,
            timestamp,
            client_order_id,
            reason,
        })
    }
}

/// Venue acknowledgement observed out-of-band (user-data stream). May arrive
/// before or after `OrderSubmitted`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderAcked {
    pub account_id: String,
    pub timestamp: DateTime<Utc>,
    pub client_order_id: String,
    pub venue_order_id: String,
}

impl OrderAcked {
    pub fn new(
        account_id: String,
        timestamp: DateTime<Utc>,
        client_order_id: String,
        venue_order_id: String,
    ) -> Result<Self, DomainError> {
        require_str("OrderAcked", "account_id", &account_id)?;
        require_str("OrderAcked", "client_order_id", &client_order_id)?;
        require_str("OrderAcked", "venue_order_id", &venue_order_id)?;
        Ok(Self {
            account_id,
            timestamp,
            client_order_id,
            venue_order_id,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FillReceived {
    pub account_id: String,
    pub timestamp: DateTime<Utc>,
    pub client_order_id: String,
    pub venue_order_id: String,
    /// Primary dedup key; empty when the venue did not report one.
    pub venue_trade_id: String,
    pub trade_id: String,
    pub command_id: String,
    pub symbol: String,
    pub side: Side,
    pub qty: Decimal,
    pub price: Decimal,
    pub fee: Decimal,
    pub fee_asset: String,
    pub is_maker: bool,
}

impl FillReceived {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        account_id: String,
        timestamp: DateTime<Utc>,
        client_order_id: String,
        venue_order_id: String,
        venue_trade_id: String,
        trade_id: String,
        command_id: String,
        symbol: String,
        side: Side,
        qty: Decimal,
        price: Decimal,
        fee: Decimal,
        fee_asset: String,
        is_maker: bool,
    ) -> Result<Self, DomainError> {
        require_str("FillReceived", "account_id", &account_id)?;
        require_str("FillReceived", "client_order_id", &client_order_id)?;
        require_str("FillReceived", "venue_order_id", &venue_order_id)?;
        require_str("FillReceived", "trade_id", &trade_id)?;
        require_str("FillReceived", "command_id", &command_id)?;
        require_str("FillReceived", "symbol", &symbol)?;
        require_str("FillReceived", "fee_asset", &fee_asset)?;
        if qty <= Decimal::ZERO {
            return Err(DomainError::invalid(
                "FillReceived",
                "qty",
                "must be positive",
            ));
        }
        if price <= Decimal::ZERO {
            return Err(DomainError::invalid(
                "FillReceived",
                "price",
                "must be positive",
            ));
        }
        if fee < Decimal::ZERO {
            return Err(DomainError::invalid(
                "FillReceived",
                "fee",
                "must be non-negative",
            ));
        }
        Ok(Self {
            account_id,
            timestamp,
            client_order_id,
            venue_order_id,
            venue_trade_id,
            trade_id,
            command_id,
            symbol,
            side,
            qty,
            price,
            fee,
            fee_asset,
            is_maker,
        })
    }

    /// Same key the equivalent [`Fill`](crate::domain::Fill) would produce.
    pub fn dedup_key(&self) -> String {
        crate::domain::fill_dedup_key(
            &self.venue_trade_id,
            &self.venue_order_id,
            self.price,
            self.qty,
            self.timestamp,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderRejected {
    pub account_id: String,
    pub timestamp: DateTime<Utc>,
    pub client_order_id: String,
    /// The venue may not return an identifier on rejection.
    pub venue_order_id: Option<String>,
    pub reason: String,
}

impl OrderRejected {
    pub fn new(
        account_id: String,
        timestamp: DateTime<Utc>,
        client_order_id: String,
        venue_order_id: Option<String>,
        reason: String,
    ) -> Result<Self, DomainError> {
        require_str("OrderRejected", "account_id", &account_id)?;
        require_str("OrderRejected", "client_order_id", &client_order_id)?;
        require_str_opt("OrderRejected", "venue_order_id", venue_order_id.as_deref())?;
        require_str("OrderRejected", "reason", &reason)?;
        Ok(Self {
            account_id,
            timestamp,
            client_order_id,
            venue_order_id,
            reason,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderCanceled {
    pub account_id: String,
    pub timestamp: DateTime<Utc>,
    pub client_order_id: String,
    pub venue_order_id: Option<String>,
    pub reason: Option<String>,
}

impl OrderCanceled {
    pub fn new(
        account_id: String,
        timestamp: DateTime<Utc>,
        client_order_id: String,
        venue_order_id: Option<String>,
        reason: Option<String>,
    ) -> Result<Self, DomainError> {
        require_str("OrderCanceled", "account_id", &account_id)?;
        require_str("OrderCanceled", "client_order_id", &client_order_id)?;
        require_str_opt("OrderCanceled", "venue_order_id", venue_order_id.as_deref())?;
        require_str_opt("OrderCanceled", "reason", reason.as_deref())?;
        Ok(Self {
            account_id,
            timestamp,
            client_order_id,
            venue_order_id,
            reason,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderExpired {
    pub account_id: String,
    pub timestamp: DateTime<Utc>,
    pub client_order_id: String,
    pub venue_order_id: Option<String>,
}

impl OrderExpired {
    pub fn new(
        account_id: String,
        timestamp: DateTime<Utc>,
        client_order_id: String,
        venue_order_id: Option<String>,
    ) -> Result<Self, DomainError> {
        require_str("OrderExpired", "account_id", &account_id)?;
        require_str("OrderExpired", "client_order_id", &client_order_id)?;
        require_str_opt("OrderExpired", "venue_order_id", venue_order_id.as_deref())?;
        Ok(Self {
            account_id,
            timestamp,
            client_order_id,
            venue_order_id,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeClosed {
    pub account_id: String,
    pub timestamp: DateTime<Utc>,
    pub trade_id: String,
    pub command_id: String,
}

impl TradeClosed {
    pub fn new(
        account_id: String,
        timestamp: DateTime<Utc>,
        trade_id: String,
        command_id: String,
    ) -> Result<Self, DomainError> {
        require_str("TradeClosed", "account_id", &account_id)?;
        require_str("TradeClosed", "trade_id", &trade_id)?;
        require_str("TradeClosed", "command_id", &command_id)?;
        Ok(Self {
            account_id,
            timestamp,
            trade_id,
            command_id,
        })
    }
}

/// Closed union of domain events.
///
/// `Unknown` carries the tag and raw payload of an event type this build does
/// not know; it is logged and ignored by the projection, never silently
/// dropped. The spine refuses to append it and fails hard when reading one,
/// since a forward-incompatible log cannot be replayed faithfully.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    CommandAccepted(CommandAccepted),
    OrderSubmitIntent(OrderSubmitIntent),
    OrderSubmitted(OrderSubmitted),
    OrderSubmitFailed(OrderSubmitFailed),
    OrderAcked(OrderAcked),
    FillReceived(FillReceived),
    OrderRejected(OrderRejected),
    OrderCanceled(OrderCanceled),
    OrderExpired(OrderExpired),
    TradeClosed(TradeClosed),
    Unknown {
        event_type: String,
        payload: serde_json::Value,
    },
}

impl Event {
    /// Registry tag used as the `event_type` column in the spine.
    pub fn event_type(&self) -> &str {
        match self {
            Event::CommandAccepted(_) => "CommandAccepted",
            Event::OrderSubmitIntent(_) => "OrderSubmitIntent",
            Event::OrderSubmitted(_) => "OrderSubmitted",
            Event::OrderSubmitFailed(_) => "OrderSubmitFailed",
            Event::OrderAcked(_) => "OrderAcked",
            Event::FillReceived(_) => "FillReceived",
            Event::OrderRejected(_) => "OrderRejected",
            Event::OrderCanceled(_) => "OrderCanceled",
            Event::OrderExpired(_) => "OrderExpired",
            Event::TradeClosed(_) => "TradeClosed",
            Event::Unknown { event_type, .. } => event_type,
        }
    }

    pub fn account_id(&self) -> Option<&str> {
        match self {
            Event::CommandAccepted(e) => Some(&e.account_id),
            Event::OrderSubmitIntent(e) => Some(&e.account_id),
            Event::OrderSubmitted(e) => Some(&e.account_id),
            Event::OrderSubmitFailed(e) => Some(&e.account_id),
            Event::OrderAcked(e) => Some(&e.account_id),
            Event::FillReceived(e) => Some(&e.account_id),
            Event::OrderRejected(e) => Some(&e.account_id),
            Event::OrderCanceled(e) => Some(&e.account_id),
            Event::OrderExpired(e) => Some(&e.account_id),
            Event::TradeClosed(e) => Some(&e.account_id),
            Event::Unknown { .. } => None,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Event::CommandAccepted(e) => Some(e.timestamp),
            Event::OrderSubmitIntent(e) => Some(e.timestamp),
            Event::OrderSubmitted(e) => Some(e.timestamp),
            Event::OrderSubmitFailed(e) => Some(e.timestamp),
            Event::OrderAcked(e) => Some(e.timestamp),
            Event::FillReceived(e) => Some(e.timestamp),
            Event::OrderRejected(e) => Some(e.timestamp),
            Event::OrderCanceled(e) => Some(e.timestamp),
            Event::OrderExpired(e) => Some(e.timestamp),
            Event::TradeClosed(e) => Some(e.timestamp),
            Event::Unknown { .. } => None,
        }
    }
}

macro_rules! impl_from_event {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Event {
                fn from(e: $variant) -> Self {
                    Event::$variant(e)
                }
            }
        )*
    };
}

impl_from_event!(
    CommandAccepted,
    OrderSubmitIntent,
    OrderSubmitted,
    OrderSubmitFailed,
    OrderAcked,
    FillReceived,
    OrderRejected,
    OrderCanceled,
    OrderExpired,
    TradeClosed,
);

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn intent(
        qty: Decimal,
        price: Option<Decimal>,
        stop_price: Option<Decimal>,
    ) -> Result<OrderSubmitIntent, DomainError> {
        OrderSubmitIntent::new(
            "acct".to_string(),
            Utc::now(),
            "cmd-1".to_string(),
            "t-1".to_string(),
            "c-1".to_string(),
            "BTCUSDT".to_string(),
            Side::Buy,
            OrderType::Limit,
            qty,
            price,
            stop_price,
        )
    }

    #[test]
    fn intent_accepts_valid_fields() {
        assert!(intent(dec!(1), Some(dec!(50000)), None).is_ok());
        assert!(intent(dec!(0.001), None, None).is_ok());
    }

    #[test]
    fn intent_rejects_exactly_non_positive_qty_and_prices() {
        assert!(intent(dec!(0), None, None).is_err());
        assert!(intent(dec!(-1), None, None).is_err());
        assert!(intent(dec!(1), Some(dec!(0)), None).is_err());
        assert!(intent(dec!(1), None, Some(dec!(-2))).is_err());
    }

    #[test]
    fn event_type_tags() {
        let e: Event = TradeClosed::new(
            "acct".to_string(),
            Utc::now(),
            "t-1".to_string(),
            "cmd-1".to_string(),
        )
        .unwrap()
        .into();
        assert_eq!(e.event_type(), "TradeClosed");
        assert_eq!(e.account_id(), Some("acct"));

        let u = Event::Unknown {
            event_type: "SomethingNew".to_string(),
            payload: serde_json::json!({"a": 1}),
        };
        assert_eq!(u.event_type(), "SomethingNew");
        assert_eq!(u.account_id(), None);
        assert!(u.timestamp().is_none());
    }

    #[test]
    fn fill_event_dedup_key_matches_fill() {
        let ts = Utc::now();
        let ev = FillReceived::new(
            "acct".to_string(),
            ts,
            "c-1".to_string(),
            "12345".to_string(),
            String::new(),
            "t-1".to_string(),
            "cmd-1".to_string(),
            "BTCUSDT".to_string(),
            Side::Buy,
            dec!(0.5),
            dec!(50000),
            dec!(0),
            "BTC".to_string(),
            false,
        )
        .unwrap();
        let fill = crate::domain::Fill::new(
            String::new(),
            "12345".to_string(),
            "c-1".to_string(),
            "acct".to_string(),
            "t-1".to_string(),
            "cmd-1".to_string(),
            "BTCUSDT".to_string(),
            Side::Buy,
            dec!(0.5),
            dec!(50000),
            dec!(0),
            "BTC".to_string(),
            false,
            ts,
        )
        .unwrap();
        assert_eq!(ev.dedup_key(), fill.dedup_key());
    }

    #[test]
    fn fill_event_serde_roundtrip() {
        let ev = FillReceived::new(
            "acct".to_string(),
            Utc::now(),
            "c-1".to_string(),
            "12345".to_string(),
            "99".to_string(),
            "t-1".to_string(),
            "cmd-1".to_string(),
            "BTCUSDT".to_string(),
            Side::Sell,
            dec!(0.5),
            dec!(50000.00),
            dec!(0.001),
            "BTC".to_string(),
            true,
        )
        .unwrap();
        let json = serde_json::to_string(&ev).unwrap();
        // Decimals ride as strings, enums by wire name.
        assert!(json.contains("\"qty\":\"0.5\""));
        assert!(json.contains("\"side\":\"SELL\""));
        let back: FillReceived = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ev);
    }
}
