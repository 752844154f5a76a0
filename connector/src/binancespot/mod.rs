//! Binance Spot venue adapter.
//!
//! Normalises the Binance Spot REST API into the venue-neutral contract:
//! per-account HMAC credentials, parameter construction, response mapping,
//! HTTP error classification, and transient-error retry all live here.

pub mod msg;
mod rest;

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use rust_decimal::Decimal;
use tradecore::{
    types::{OrderStatus, OrderType, Side, TimeInForce},
    venue::{
        BalanceEntry,
        CancelResult,
        ImmediateFill,
        SubmitOpts,
        SubmitResult,
        SymbolFilters,
        VenueAdapter,
        VenueError,
        VenueOrder,
        VenueTrade,
    },
};

pub use rest::BinanceSpotClient;

use crate::utils::{fmt_decimal, retry_transient};

pub const MAINNET_REST_URL: &str = "https://api.binance.com";
pub const TESTNET_REST_URL: &str = "https://testnet.binance.vision";
pub const TESTNET_WS_URL: &str = "wss://stream.testnet.binance.vision";

/// Env vars holding testnet credentials for the integration surface.
pub const TESTNET_API_KEY_ENV: &str = "BINANCE_TESTNET_API_KEY";
pub const TESTNET_API_SECRET_ENV: &str = "BINANCE_TESTNET_API_SECRET";

#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

/// Binance Spot implementation of [`VenueAdapter`].
///
/// One shared pooled HTTP client; credential mutation is a cheap synchronous
/// map operation, safe to call while requests are in flight.
pub struct BinanceSpot {
    client: BinanceSpotClient,
    credentials: Mutex<HashMap<String, Credentials>>,
}

impl BinanceSpot {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: BinanceSpotClient::new(base_url),
            credentials: Mutex::new(HashMap::new()),
        }
    }

    pub fn testnet() -> Self {
        Self::new(TESTNET_REST_URL)
    }

    pub fn register_account(&self, account_id: &str, api_key: &str, api_secret: &str) {
        self.credentials.lock().unwrap().insert(
            account_id.to_string(),
            Credentials {
                api_key: api_key.to_string(),
                api_secret: api_secret.to_string(),
            },
        );
    }

    /// Returns whether the account was registered.
    pub fn unregister_account(&self, account_id: &str) -> bool {
        self.credentials.lock().unwrap().remove(account_id).is_some()
    }

    fn credentials_for(&self, account_id: &str) -> Result<Credentials, VenueError> {
        self.credentials
            .lock()
            .unwrap()
            .get(account_id)
            .cloned()
            .ok_or_else(|| {
                VenueError::Authentication(format!(
                    "no credentials registered for account '{account_id}'"
                ))
            })
    }

    /// Open a user-data stream, returning the listen key. The stream consumer
    /// itself lives outside the adapter.
    pub async fn start_user_data_stream(&self, account_id: &str) -> Result<String, VenueError> {
        let credentials = self.credentials_for(account_id)?;
        let resp: msg::ListenKey = retry_transient("start_user_data_stream", || {
            self.client
                .post_keyed("/api/v3/userDataStream", "", &credentials.api_key)
        })
        .await?;
        Ok(resp.listen_key)
    }

    pub async fn keepalive_user_data_stream(
        &self,
        account_id: &str,
        listen_key: &str,
    ) -> Result<(), VenueError> {
        let credentials = self.credentials_for(account_id)?;
        let query = format!("listenKey={listen_key}");
        let _: serde_json::Value = retry_transient("keepalive_user_data_stream", || {
            self.client
                .put_keyed("/api/v3/userDataStream", &query, &credentials.api_key)
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl VenueAdapter for BinanceSpot {
    async fn submit_order(
        &self,
        account_id: &str,
        symbol: &str,
        side: Side,
        order_type: OrderType,
        qty: Decimal,
        opts: SubmitOpts,
    ) -> Result<SubmitResult, VenueError> {
        let parts = build_order_params(order_type, qty, &opts)?;
        let credentials = self.credentials_for(account_id)?;

        let client_order_id = opts.client_order_id.as_deref();
        let resp: msg::NewOrderResponse = retry_transient("submit_order", || {
            let credentials = &credentials;
            let parts = &parts;
            async move {
                // Fresh timestamp and signature per attempt.
                let params = msg::NewOrderParams {
                    symbol,
                    side: side.as_ref(),
                    order_type: parts.order_type,
                    quantity: &parts.quantity,
                    price: parts.price.as_deref(),
                    time_in_force: parts.time_in_force,
                    new_client_order_id: client_order_id,
                    new_order_resp_type: "FULL",
                    timestamp: Utc::now().timestamp_millis(),
                };
                self.client
                    .post_signed("/api/v3/order", &params, credentials)
                    .await
            }
        })
        .await?;

        parse_submit_response(resp)
    }

    async fn cancel_order(
        &self,
        account_id: &str,
        symbol: &str,
        venue_order_id: Option<&str>,
        client_order_id: Option<&str>,
    ) -> Result<CancelResult, VenueError> {
        require_order_ref(venue_order_id, client_order_id)?;
        let credentials = self.credentials_for(account_id)?;

        let resp: msg::CancelOrderResponse = retry_transient("cancel_order", || {
            let credentials = &credentials;
            async move {
                let params = msg::OrderRefParams {
                    symbol,
                    order_id: venue_order_id,
                    orig_client_order_id: client_order_id,
                    timestamp: Utc::now().timestamp_millis(),
                };
                self.client
                    .delete_signed("/api/v3/order", &params, credentials)
                    .await
            }
        })
        .await?;

        Ok(CancelResult {
            venue_order_id: resp.order_id.to_string(),
            status: map_order_status(&resp.status)?,
        })
    }

    async fn query_order(
        &self,
        account_id: &str,
        symbol: &str,
        venue_order_id: Option<&str>,
        client_order_id: Option<&str>,
    ) -> Result<VenueOrder, VenueError> {
        require_order_ref(venue_order_id, client_order_id)?;
        let credentials = self.credentials_for(account_id)?;

        let resp: msg::OrderInfo = retry_transient("query_order", || {
            let credentials = &credentials;
            async move {
                let params = msg::OrderRefParams {
                    symbol,
                    order_id: venue_order_id,
                    orig_client_order_id: client_order_id,
                    timestamp: Utc::now().timestamp_millis(),
                };
                self.client
                    .get_signed("/api/v3/order", &params, credentials)
                    .await
            }
        })
        .await?;

        to_venue_order(resp)
    }

    async fn query_open_orders(
        &self,
        account_id: &str,
        symbol: &str,
    ) -> Result<Vec<VenueOrder>, VenueError> {
        let credentials = self.credentials_for(account_id)?;

        let resp: Vec<msg::OrderInfo> = retry_transient("query_open_orders", || {
            let credentials = &credentials;
            async move {
                let params = msg::SymbolParams {
                    symbol,
                    timestamp: Utc::now().timestamp_millis(),
                };
                self.client
                    .get_signed("/api/v3/openOrders", &params, credentials)
                    .await
            }
        })
        .await?;

        resp.into_iter().map(to_venue_order).collect()
    }

    async fn query_balance(
        &self,
        account_id: &str,
        assets: &std::collections::HashSet<String>,
    ) -> Result<Vec<BalanceEntry>, VenueError> {
        if assets.is_empty() {
            return Ok(Vec::new());
        }
        let credentials = self.credentials_for(account_id)?;

        let resp: msg::AccountInformation = retry_transient("query_balance", || {
            let credentials = &credentials;
            async move {
                let params = msg::AccountParams {
                    timestamp: Utc::now().timestamp_millis(),
                };
                self.client
                    .get_signed("/api/v3/account", &params, credentials)
                    .await
            }
        })
        .await?;

        Ok(resp
            .balances
            .into_iter()
            .filter(|b| assets.contains(&b.asset))
            .map(|b| BalanceEntry {
                asset: b.asset,
                free: b.free,
                locked: b.locked,
            })
            .collect())
    }

    async fn query_trades(
        &self,
        account_id: &str,
        symbol: &str,
        start_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<VenueTrade>, VenueError> {
        let credentials = self.credentials_for(account_id)?;
        let start_time = start_time.map(|t| t.timestamp_millis());

        let resp: Vec<msg::MyTrade> = retry_transient("query_trades", || {
            let credentials = &credentials;
            async move {
                let params = msg::MyTradesParams {
                    symbol,
                    start_time,
                    timestamp: Utc::now().timestamp_millis(),
                };
                self.client
                    .get_signed("/api/v3/myTrades", &params, credentials)
                    .await
            }
        })
        .await?;

        resp.into_iter().map(to_venue_trade).collect()
    }

    async fn get_exchange_info(&self, symbol: &str) -> Result<SymbolFilters, VenueError> {
        let query = format!("symbol={symbol}");
        let resp: msg::ExchangeInfo = retry_transient("get_exchange_info", || {
            self.client.get_public("/api/v3/exchangeInfo", &query)
        })
        .await?;

        let info = resp
            .symbols
            .into_iter()
            .next()
            .ok_or_else(|| VenueError::NotFound(format!("symbol '{symbol}' not on venue")))?;
        to_symbol_filters(info)
    }

    async fn get_server_time(&self) -> Result<i64, VenueError> {
        let resp: msg::ServerTime =
            retry_transient("get_server_time", || self.client.get_public("/api/v3/time", ""))
                .await?;
        Ok(resp.server_time)
    }
}

struct OrderParams {
    order_type: &'static str,
    quantity: String,
    price: Option<String>,
    time_in_force: Option<&'static str>,
}

fn build_order_params(
    order_type: OrderType,
    qty: Decimal,
    opts: &SubmitOpts,
) -> Result<OrderParams, VenueError> {
    let quantity = fmt_decimal(qty);
    let params = match order_type {
        OrderType::Market => OrderParams {
            order_type: "MARKET",
            quantity,
            price: None,
            time_in_force: None,
        },
        OrderType::Limit => {
            let price = opts.price.ok_or_else(|| {
                VenueError::InvalidArgument("price is required for LIMIT orders".to_string())
            })?;
            OrderParams {
                order_type: "LIMIT",
                quantity,
                price: Some(fmt_decimal(price)),
                time_in_force: Some(tif_wire(opts.time_in_force.unwrap_or(TimeInForce::Gtc))),
            }
        }
        OrderType::LimitIoc => {
            let price = opts.price.ok_or_else(|| {
                VenueError::InvalidArgument("price is required for LIMIT_IOC orders".to_string())
            })?;
            // IOC regardless of any caller-supplied time in force.
            OrderParams {
                order_type: "LIMIT",
                quantity,
                price: Some(fmt_decimal(price)),
                time_in_force: Some("IOC"),
            }
        }
        other => {
            return Err(VenueError::InvalidArgument(format!(
                "unsupported order type: {other:?}"
            )));
        }
    };

    if opts.stop_price.is_some() {
        return Err(VenueError::InvalidArgument(
            "stop_price is not supported for MARKET, LIMIT, or LIMIT_IOC orders".to_string(),
        ));
    }
    Ok(params)
}

fn tif_wire(tif: TimeInForce) -> &'static str {
    match tif {
        TimeInForce::Gtc => "GTC",
        TimeInForce::Gtx => "GTX",
        TimeInForce::Fok => "FOK",
        TimeInForce::Ioc => "IOC",
    }
}

fn map_order_status(status: &str) -> Result<OrderStatus, VenueError> {
    match status {
        "NEW" => Ok(OrderStatus::Open),
        "PARTIALLY_FILLED" => Ok(OrderStatus::PartiallyFilled),
        "FILLED" => Ok(OrderStatus::Filled),
        "CANCELED" => Ok(OrderStatus::Canceled),
        "REJECTED" => Ok(OrderStatus::Rejected),
        "EXPIRED" | "EXPIRED_IN_MATCH" => Ok(OrderStatus::Expired),
        other => Err(VenueError::InvalidArgument(format!(
            "unknown venue order status: '{other}'"
        ))),
    }
}

fn map_order_type(order_type: &str, time_in_force: &str) -> Result<OrderType, VenueError> {
    match (order_type, time_in_force) {
        ("MARKET", _) => Ok(OrderType::Market),
        ("LIMIT", "IOC") => Ok(OrderType::LimitIoc),
        ("LIMIT", _) => Ok(OrderType::Limit),
        (other, _) => Err(VenueError::InvalidArgument(format!(
            "unknown venue order type: '{other}'"
        ))),
    }
}

fn map_side(side: &str) -> Result<Side, VenueError> {
    match side {
        "BUY" => Ok(Side::Buy),
        "SELL" => Ok(Side::Sell),
        other => Err(VenueError::InvalidArgument(format!(
            "unknown venue side: '{other}'"
        ))),
    }
}

fn require_order_ref(
    venue_order_id: Option<&str>,
    client_order_id: Option<&str>,
) -> Result<(), VenueError> {
    if venue_order_id.is_none() && client_order_id.is_none() {
        return Err(VenueError::InvalidArgument(
            "either venue_order_id or client_order_id is required".to_string(),
        ));
    }
    Ok(())
}

fn parse_submit_response(resp: msg::NewOrderResponse) -> Result<SubmitResult, VenueError> {
    let status = map_order_status(&resp.status)?;
    let immediate_fills = resp
        .fills
        .into_iter()
        .map(|f| ImmediateFill {
            venue_trade_id: f.trade_id.to_string(),
            qty: f.qty,
            price: f.price,
            fee: f.commission,
            fee_asset: f.commission_asset,
            // The FULL response does not disambiguate maker fills.
            is_maker: false,
        })
        .collect();
    Ok(SubmitResult {
        venue_order_id: resp.order_id.to_string(),
        status,
        immediate_fills,
    })
}

fn to_venue_order(info: msg::OrderInfo) -> Result<VenueOrder, VenueError> {
    let order_type = map_order_type(&info.order_type, &info.time_in_force)?;
    Ok(VenueOrder {
        venue_order_id: info.order_id.to_string(),
        client_order_id: info.client_order_id,
        status: map_order_status(&info.status)?,
        symbol: info.symbol,
        side: map_side(&info.side)?,
        order_type,
        qty: info.orig_qty,
        filled_qty: info.executed_qty,
        price: if order_type == OrderType::Market {
            None
        } else {
            Some(info.price)
        },
    })
}

fn to_venue_trade(trade: msg::MyTrade) -> Result<VenueTrade, VenueError> {
    let timestamp = DateTime::<Utc>::from_timestamp_millis(trade.time).ok_or_else(|| {
        VenueError::InvalidArgument(format!("trade timestamp out of range: {}", trade.time))
    })?;
    Ok(VenueTrade {
        venue_trade_id: trade.id.to_string(),
        venue_order_id: trade.order_id.to_string(),
        // Trade history does not echo the client order id.
        client_order_id: String::new(),
        symbol: trade.symbol,
        side: if trade.is_buyer { Side::Buy } else { Side::Sell },
        qty: trade.qty,
        price: trade.price,
        fee: trade.commission,
        fee_asset: trade.commission_asset,
        is_maker: trade.is_maker,
        timestamp,
    })
}

fn to_symbol_filters(info: msg::SymbolInfo) -> Result<SymbolFilters, VenueError> {
    let mut tick_size = None;
    let mut lot = None;
    let mut min_notional = None;
    for filter in info.filters {
        match filter {
            msg::SymbolFilterWire::PriceFilter { tick_size: t } => tick_size = Some(t),
            msg::SymbolFilterWire::LotSize {
                step_size,
                min_qty,
                max_qty,
            } => lot = Some((step_size, min_qty, max_qty)),
            msg::SymbolFilterWire::Notional { min_notional: m }
            | msg::SymbolFilterWire::MinNotional { min_notional: m } => min_notional = Some(m),
            msg::SymbolFilterWire::Unknown => {}
        }
    }
    let tick_size = tick_size.ok_or_else(|| {
        VenueError::InvalidArgument(format!("missing PRICE_FILTER for '{}'", info.symbol))
    })?;
    let (lot_step, lot_min, lot_max) = lot.ok_or_else(|| {
        VenueError::InvalidArgument(format!("missing LOT_SIZE for '{}'", info.symbol))
    })?;
    let min_notional = min_notional.ok_or_else(|| {
        VenueError::InvalidArgument(format!("missing NOTIONAL for '{}'", info.symbol))
    })?;
    Ok(SymbolFilters {
        symbol: info.symbol,
        tick_size,
        lot_step,
        lot_min,
        lot_max,
        min_notional,
    })
}
