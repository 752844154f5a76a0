//! In-memory projection of the event spine.
//!
//! `TradingState` is a pure fold, scoped to one account: replaying an epoch
//! from the spine and applying each event in sequence order reconstructs the
//! exact state a live pipeline would have reached. `apply` never fails; every
//! anomaly is a warning, because the log is the truth and the projection has
//! no authority to reject it.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::warn;

use crate::{
    domain::{Order, Position},
    event::{Event, FillReceived},
    types::OrderStatus,
};

/// Derived view of open/closed orders and positions for one account.
#[derive(Debug, Default, PartialEq)]
pub struct TradingState {
    pub account_id: String,
    /// Open positions keyed by `(trade_id, account_id)`.
    pub positions: HashMap<(String, String), Position>,
    /// Orders not yet in a terminal state, keyed by `client_order_id`.
    pub orders: HashMap<String, Order>,
    /// Terminal orders, keyed by `client_order_id`.
    pub closed_orders: HashMap<String, Order>,
}

impl TradingState {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            ..Default::default()
        }
    }

    /// Apply one event. Must be called in strictly increasing sequence order;
    /// all effects are O(1) map operations.
    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::CommandAccepted(_) => {}
            Event::OrderSubmitIntent(e) => {
                self.orders.insert(
                    e.client_order_id.clone(),
                    Order {
                        client_order_id: e.client_order_id.clone(),
                        venue_order_id: None,
                        account_id: e.account_id.clone(),
                        command_id: e.command_id.clone(),
                        symbol: e.symbol.clone(),
                        side: e.side,
                        order_type: e.order_type,
                        qty: e.qty,
                        filled_qty: Decimal::ZERO,
                        price: e.price,
                        stop_price: e.stop_price,
                        status: OrderStatus::Submitting,
                        created_at: e.timestamp,
                        updated_at: e.timestamp,
                    },
                );
            }
            Event::OrderSubmitted(e) => {
                if let Some(order) = self.get_order("OrderSubmitted", &e.client_order_id) {
                    order.venue_order_id = Some(e.venue_order_id.clone());
                    order.status = OrderStatus::Open;
                    order.updated_at = e.timestamp;
                }
            }
            Event::OrderSubmitFailed(e) => {
                if let Some(order) = self.get_order("OrderSubmitFailed", &e.client_order_id) {
                    order.status = OrderStatus::Rejected;
                    order.updated_at = e.timestamp;
                    self.close_order(&e.client_order_id);
                }
            }
            Event::OrderAcked(e) => {
                if let Some(order) = self.get_order("OrderAcked", &e.client_order_id) {
                    order.venue_order_id = Some(e.venue_order_id.clone());
                    // An ack may race a fill; never regress from PartiallyFilled.
                    if order.status == OrderStatus::Submitting {
                        order.status = OrderStatus::Open;
                    }
                    order.updated_at = e.timestamp;
                }
            }
            Event::FillReceived(e) => {
                self.fill_order(e);
                self.fill_position(e);
            }
            Event::OrderRejected(e) => {
                if let Some(order) = self.get_order("OrderRejected", &e.client_order_id) {
                    if let Some(venue_order_id) = &e.venue_order_id {
                        order.venue_order_id = Some(venue_order_id.clone());
                    }
                    order.status = OrderStatus::Rejected;
                    order.updated_at = e.timestamp;
                    self.close_order(&e.client_order_id);
                }
            }
            Event::OrderCanceled(e) => {
                if let Some(order) = self.get_order("OrderCanceled", &e.client_order_id) {
                    if let Some(venue_order_id) = &e.venue_order_id {
                        order.venue_order_id = Some(venue_order_id.clone());
                    }
                    order.status = OrderStatus::Canceled;
                    order.updated_at = e.timestamp;
                    self.close_order(&e.client_order_id);
                }
            }
            Event::OrderExpired(e) => {
                if let Some(order) = self.get_order("OrderExpired", &e.client_order_id) {
                    if let Some(venue_order_id) = &e.venue_order_id {
                        order.venue_order_id = Some(venue_order_id.clone());
                    }
                    order.status = OrderStatus::Expired;
                    order.updated_at = e.timestamp;
                    self.close_order(&e.client_order_id);
                }
            }
            Event::TradeClosed(e) => {
                let key = (e.trade_id.clone(), self.account_id.clone());
                if self.positions.remove(&key).is_none() {
                    warn!(
                        trade_id = %e.trade_id,
                        account_id = %self.account_id,
                        "no position for TradeClosed"
                    );
                }
            }
            Event::Unknown { event_type, .. } => {
                warn!(
                    event_type = %event_type,
                    account_id = %self.account_id,
                    "unhandled event type in apply"
                );
            }
        }
    }

    fn get_order(&mut self, event_type: &str, client_order_id: &str) -> Option<&mut Order> {
        if !self.orders.contains_key(client_order_id) {
            warn!(
                event_type,
                client_order_id,
                account_id = %self.account_id,
                "unknown order in event"
            );
            return None;
        }
        self.orders.get_mut(client_order_id)
    }

    fn fill_order(&mut self, e: &FillReceived) {
        let Some(order) = self.get_order("FillReceived", &e.client_order_id) else {
            return;
        };
        order.filled_qty += e.qty;
        order.updated_at = e.timestamp;
        if order.filled_qty >= order.qty {
            order.status = OrderStatus::Filled;
            self.close_order(&e.client_order_id);
        } else {
            order.status = OrderStatus::PartiallyFilled;
        }
    }

    fn fill_position(&mut self, e: &FillReceived) {
        let key = (e.trade_id.clone(), e.account_id.clone());
        let Some(pos) = self.positions.get_mut(&key) else {
            self.positions.insert(
                key,
                Position {
                    account_id: e.account_id.clone(),
                    trade_id: e.trade_id.clone(),
                    symbol: e.symbol.clone(),
                    side: e.side,
                    qty: e.qty,
                    avg_entry_price: e.price,
                },
            );
            return;
        };

        if e.side == pos.side {
            let new_qty = pos.qty + e.qty;
            pos.avg_entry_price = (pos.qty * pos.avg_entry_price + e.qty * e.price) / new_qty;
            pos.qty = new_qty;
        } else {
            // Opposite-side fills reduce exposure; entry price is preserved.
            pos.qty -= e.qty;
            if pos.qty < Decimal::ZERO {
                warn!(
                    trade_id = %e.trade_id,
                    account_id = %e.account_id,
                    qty = %pos.qty,
                    "position qty went negative"
                );
            }
        }
    }

    fn close_order(&mut self, client_order_id: &str) {
        match self.orders.remove(client_order_id) {
            Some(order) => {
                self.closed_orders.insert(client_order_id.to_string(), order);
            }
            None => warn!(
                client_order_id,
                account_id = %self.account_id,
                "close requested for unknown order"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{
        event::{
            OrderAcked,
            OrderCanceled,
            OrderExpired,
            OrderRejected,
            OrderSubmitFailed,
            OrderSubmitIntent,
            OrderSubmitted,
            TradeClosed,
        },
        types::{OrderType, Side},
    };

    const ACCT: &str = "acct";

    fn intent(client_order_id: &str, qty: Decimal) -> Event {
        OrderSubmitIntent::new(
            ACCT.to_string(),
            Utc::now(),
            "cmd-1".to_string(),
            "t-1".to_string(),
            client_order_id.to_string(),
            "BTCUSDT".to_string(),
            Side::Buy,
            OrderType::Limit,
            qty,
            Some(dec!(50000)),
            None,
        )
        .unwrap()
        .into()
    }

    fn fill(client_order_id: &str, trade: &str, side: Side, qty: Decimal, price: Decimal) -> Event {
        FillReceived::new(
            ACCT.to_string(),
            Utc::now(),
            client_order_id.to_string(),
            "12345".to_string(),
            format!("vt-{qty}-{price}"),
            "t-1".to_string(),
            "cmd-1".to_string(),
            "BTCUSDT".to_string(),
            side,
            qty,
            price,
            dec!(0),
            "BTC".to_string(),
            false,
        )
        .map(|mut f| {
            f.trade_id = trade.to_string();
            Event::FillReceived(f)
        })
        .unwrap()
    }

    #[test]
    fn intent_creates_submitting_order() {
        let mut state = TradingState::new(ACCT);
        state.apply(&intent("c-1", dec!(2)));
        let order = &state.orders["c-1"];
        assert_eq!(order.status, OrderStatus::Submitting);
        assert_eq!(order.filled_qty, Decimal::ZERO);
        assert!(order.venue_order_id.is_none());
    }

    #[test]
    fn submitted_opens_order_with_venue_id() {
        let mut state = TradingState::new(ACCT);
        state.apply(&intent("c-1", dec!(1)));
        state.apply(
            &OrderSubmitted::new(
                ACCT.to_string(),
                Utc::now(),
                "c-1".to_string(),
                "12345".to_string(),
            )
            .unwrap()
            .into(),
        );
        let order = &state.orders["c-1"];
        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(order.venue_order_id.as_deref(), Some("12345"));
    }

    #[test]
    fn unknown_order_update_is_dropped() {
        let mut state = TradingState::new(ACCT);
        state.apply(
            &OrderSubmitted::new(
                ACCT.to_string(),
                Utc::now(),
                "ghost".to_string(),
                "12345".to_string(),
            )
            .unwrap()
            .into(),
        );
        assert!(state.orders.is_empty());
        assert!(state.closed_orders.is_empty());
    }

    #[test]
    fn submit_failed_closes_as_rejected() {
        let mut state = TradingState::new(ACCT);
        state.apply(&intent("c-1", dec!(1)));
        state.apply(
            &OrderSubmitFailed::new(
                ACCT.to_string(),
                Utc::now(),
                "c-1".to_string(),
                "MIN_NOTIONAL".to_string(),
            )
            .unwrap()
            .into(),
        );
        assert!(state.orders.is_empty());
        assert_eq!(state.closed_orders["c-1"].status, OrderStatus::Rejected);
    }

    #[test]
    fn ack_promotes_submitting_but_not_partially_filled() {
        let mut state = TradingState::new(ACCT);
        state.apply(&intent("c-1", dec!(2)));
        state.apply(&fill("c-1", "t-1", Side::Buy, dec!(1), dec!(100)));
        assert_eq!(state.orders["c-1"].status, OrderStatus::PartiallyFilled);

        state.apply(
            &OrderAcked::new(
                ACCT.to_string(),
                Utc::now(),
                "c-1".to_string(),
                "777".to_string(),
            )
            .unwrap()
            .into(),
        );
        let order = &state.orders["c-1"];
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert_eq!(order.venue_order_id.as_deref(), Some("777"));

        state.apply(&intent("c-2", dec!(1)));
        state.apply(
            &OrderAcked::new(
                ACCT.to_string(),
                Utc::now(),
                "c-2".to_string(),
                "778".to_string(),
            )
            .unwrap()
            .into(),
        );
        assert_eq!(state.orders["c-2"].status, OrderStatus::Open);
    }

    #[test]
    fn partial_then_full_fill_closes_order() {
        let mut state = TradingState::new(ACCT);
        state.apply(&intent("c-1", dec!(2)));
        state.apply(&fill("c-1", "t-1", Side::Buy, dec!(1), dec!(100)));
        assert_eq!(state.orders["c-1"].status, OrderStatus::PartiallyFilled);
        state.apply(&fill("c-1", "t-1", Side::Buy, dec!(1), dec!(130)));
        assert!(state.orders.is_empty());
        let closed = &state.closed_orders["c-1"];
        assert_eq!(closed.status, OrderStatus::Filled);
        assert_eq!(closed.filled_qty, dec!(2));
    }

    #[test]
    fn same_side_fills_merge_with_vwap() {
        let mut state = TradingState::new(ACCT);
        state.apply(&intent("c-1", dec!(2)));
        state.apply(&fill("c-1", "t-1", Side::Buy, dec!(1), dec!(100)));
        state.apply(&fill("c-1", "t-1", Side::Buy, dec!(1), dec!(130)));
        let pos = &state.positions[&("t-1".to_string(), ACCT.to_string())];
        assert_eq!(pos.qty, dec!(2));
        assert_eq!(pos.avg_entry_price, dec!(115));
    }

    #[test]
    fn opposite_side_fill_decrements_and_preserves_entry() {
        let mut state = TradingState::new(ACCT);
        state.apply(&intent("c-1", dec!(10)));
        state.apply(&fill("c-1", "t-1", Side::Buy, dec!(2), dec!(100)));
        state.apply(&fill("c-1", "t-1", Side::Sell, dec!(1), dec!(120)));
        let pos = &state.positions[&("t-1".to_string(), ACCT.to_string())];
        assert_eq!(pos.qty, dec!(1));
        assert_eq!(pos.avg_entry_price, dec!(100));
        assert_eq!(pos.side, Side::Buy);
    }

    #[test]
    fn negative_position_is_tolerated_not_clamped() {
        let mut state = TradingState::new(ACCT);
        state.apply(&intent("c-1", dec!(10)));
        state.apply(&fill("c-1", "t-1", Side::Buy, dec!(1), dec!(100)));
        state.apply(&fill("c-1", "t-1", Side::Sell, dec!(2), dec!(100)));
        let pos = &state.positions[&("t-1".to_string(), ACCT.to_string())];
        assert_eq!(pos.qty, dec!(-1));
    }

    #[test]
    fn terminal_events_attach_venue_id_and_close() {
        let mut state = TradingState::new(ACCT);

        state.apply(&intent("c-1", dec!(1)));
        state.apply(
            &OrderRejected::new(
                ACCT.to_string(),
                Utc::now(),
                "c-1".to_string(),
                Some("901".to_string()),
                "filter".to_string(),
            )
            .unwrap()
            .into(),
        );
        assert_eq!(state.closed_orders["c-1"].status, OrderStatus::Rejected);
        assert_eq!(
            state.closed_orders["c-1"].venue_order_id.as_deref(),
            Some("901")
        );

        state.apply(&intent("c-2", dec!(1)));
        state.apply(
            &OrderCanceled::new(
                ACCT.to_string(),
                Utc::now(),
                "c-2".to_string(),
                None,
                None,
            )
            .unwrap()
            .into(),
        );
        assert_eq!(state.closed_orders["c-2"].status, OrderStatus::Canceled);
        assert!(state.closed_orders["c-2"].venue_order_id.is_none());

        state.apply(&intent("c-3", dec!(1)));
        state.apply(
            &OrderExpired::new(ACCT.to_string(), Utc::now(), "c-3".to_string(), None)
                .unwrap()
                .into(),
        );
        assert_eq!(state.closed_orders["c-3"].status, OrderStatus::Expired);
        assert!(state.orders.is_empty());
    }

    #[test]
    fn trade_closed_removes_position() {
        let mut state = TradingState::new(ACCT);
        state.apply(&intent("c-1", dec!(1)));
        state.apply(&fill("c-1", "t-1", Side::Buy, dec!(1), dec!(100)));
        assert_eq!(state.positions.len(), 1);
        state.apply(
            &TradeClosed::new(
                ACCT.to_string(),
                Utc::now(),
                "t-1".to_string(),
                "cmd-1".to_string(),
            )
            .unwrap()
            .into(),
        );
        assert!(state.positions.is_empty());
        // Absent position is only a warning.
        state.apply(
            &TradeClosed::new(
                ACCT.to_string(),
                Utc::now(),
                "t-1".to_string(),
                "cmd-1".to_string(),
            )
            .unwrap()
            .into(),
        );
    }

    #[test]
    fn unknown_event_variant_is_ignored() {
        let mut state = TradingState::new(ACCT);
        state.apply(&Event::Unknown {
            event_type: "SomethingNew".to_string(),
            payload: serde_json::json!({"x": 1}),
        });
        assert!(state.orders.is_empty());
        assert!(state.positions.is_empty());
    }

    #[test]
    fn market_buy_scenario_single_fill() {
        // Market order filled in one shot: closed FILLED order, one position.
        let mut state = TradingState::new(ACCT);
        state.apply(&intent("c-1", dec!(0.5)));
        state.apply(&fill("c-1", "t-1", Side::Buy, dec!(0.5), dec!(50000)));
        assert!(state.orders.is_empty());
        assert_eq!(state.closed_orders["c-1"].status, OrderStatus::Filled);
        assert_eq!(state.closed_orders["c-1"].filled_qty, dec!(0.5));
        let pos = &state.positions[&("t-1".to_string(), ACCT.to_string())];
        assert_eq!(pos.qty, dec!(0.5));
        assert_eq!(pos.avg_entry_price, dec!(50000));
    }
}
