//! `OkxClient` — the Trading API (spec.md §4.G): orchestrates the signer,
//! transport, instrument cache, precision engine, and account-state cache
//! into the high-level operations callers use.
//!
//! Grounded on the teacher's `arbitrage::executor::TradeExecutor<M>`: a
//! struct that owns its provider/config and exposes `pub async fn`
//! operations performing an ordered sequence of side effects, returning a
//! plain result struct rather than propagating a provider-native type.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::account_cache::AccountStateCache;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::instrument::{decimal_field, InstrumentCache, InstrumentSpec};
use crate::normalize::{NormalizedBalance, NormalizedPosition, PositionSide};
use crate::precision::{format_price_with_precision, format_quantity};
use crate::symbol::{from_inst_id, to_inst_id};
use crate::transport::Transport;
use crate::venue::{OrderResult, PerpVenue};

/// Leverage cooldown after a successful `set-leverage` call (spec.md §4.G.1,
/// §9: keep inside `set_leverage` so every caller benefits).
const LEVERAGE_COOLDOWN: Duration = Duration::from_secs(3);

/// One client instance per user credential set (spec.md §3). Owns its
/// transport and caches exclusively — caches are never shared across
/// clients.
pub struct OkxClient {
    transport: Transport,
    instruments: InstrumentCache,
    account: AccountStateCache,
}

impl OkxClient {
    pub fn new(config: ClientConfig) -> Self {
        let transport = Transport::new(
            config.api_key,
            config.api_secret,
            config.passphrase,
            config.testnet,
        );
        Self {
            transport,
            instruments: InstrumentCache::new(),
            account: AccountStateCache::new(config.account_ttl),
        }
    }

    /// Construct from `OKX_API_KEY`/`OKX_API_SECRET`/`OKX_PASSPHRASE`/`OKX_TESTNET`.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(ClientConfig::from_env()?))
    }

    /// Same as `new`, but targeting an arbitrary base URL. Used by
    /// integration tests to point the client at a `mockito` stub server;
    /// production callers should always use `new`.
    pub fn with_base_url(base_url: String, config: ClientConfig) -> Self {
        let transport = Transport::with_base_url(
            base_url,
            config.api_key,
            config.api_secret,
            config.passphrase,
            config.testnet,
        );
        Self {
            transport,
            instruments: InstrumentCache::new(),
            account: AccountStateCache::new(config.account_ttl),
        }
    }

    /// Read-only accessor for an instrument's contract spec (beyond what
    /// spec.md's internal `getPrecision` exposes) — see SPEC_FULL.md.
    pub async fn instrument_spec(&self, symbol: &str) -> Result<InstrumentSpec> {
        let inst_id = to_inst_id(symbol);
        Ok(self.instruments.get_precision(&self.transport, &inst_id).await?.spec)
    }

    /// Read-through, TTL-cached balance (spec.md §4.F).
    pub async fn balance(&self) -> Result<NormalizedBalance> {
        if let Some(cached) = self.account.balance.get_fresh() {
            return Ok(cached);
        }

        let data = self
            .transport
            .request(Method::GET, "/api/v5/account/balance?ccy=USDT", None)
            .await?;
        let accounts: Vec<Value> = serde_json::from_value(data)?;
        let account = accounts
            .first()
            .ok_or_else(|| Error::Precondition("empty balance response".into()))?;
        let details = account
            .get("details")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::Decode("balance response missing details".into()))?;
        let detail = details
            .first()
            .ok_or_else(|| Error::Precondition("no USDT balance details returned".into()))?;

        let total_equity = decimal_field(detail, "eq");
        let unrealized_pnl = decimal_field(detail, "upl");
        let available_balance = decimal_field(detail, "availEq");

        let balance = NormalizedBalance {
            total_wallet_balance: total_equity - unrealized_pnl,
            available_balance,
            total_unrealized_profit: unrealized_pnl,
        };
        self.account.balance.store(balance);
        Ok(balance)
    }

    /// Read-through, TTL-cached open positions (spec.md §4.F). An empty
    /// list is a valid, cacheable result.
    pub async fn positions(&self) -> Result<Vec<NormalizedPosition>> {
        if let Some(cached) = self.account.positions.get_fresh() {
            return Ok(cached);
        }

        let data = self
            .transport
            .request(Method::GET, "/api/v5/account/positions", None)
            .await?;
        let raw: Vec<Value> = serde_json::from_value(data)?;

        let mut positions = Vec::with_capacity(raw.len());
        for item in &raw {
            let pos = decimal_field(item, "pos");
            if pos.is_zero() {
                continue;
            }
            let (side, amt) = if pos < Decimal::ZERO {
                (PositionSide::Short, -pos)
            } else {
                (PositionSide::Long, pos)
            };
            let inst_id = item.get("instId").and_then(Value::as_str).unwrap_or_default();
            let margin_mode = item
                .get("mgnMode")
                .and_then(Value::as_str)
                .unwrap_or("cross")
                .to_string();

            positions.push(NormalizedPosition {
                symbol: from_inst_id(inst_id),
                position_amt: amt,
                entry_price: decimal_field(item, "avgPx"),
                mark_price: decimal_field(item, "markPx"),
                unrealized_profit: decimal_field(item, "upl"),
                leverage: decimal_field(item, "lever"),
                margin: decimal_field(item, "margin"),
                notional: decimal_field(item, "notionalUsd"),
                liquidation_price: decimal_field(item, "liqPx"),
                side,
                margin_mode,
            });
        }

        self.account.positions.store(positions.clone());
        Ok(positions)
    }

    pub async fn get_market_price(&self, symbol: &str) -> Result<f64> {
        let inst_id = to_inst_id(symbol);
        let path = format!("/api/v5/market/ticker?instId={inst_id}");
        let data = self.transport.request(Method::GET, &path, None).await?;
        let tickers: Vec<Value> = serde_json::from_value(data)?;
        let ticker = tickers
            .first()
            .ok_or_else(|| Error::Precondition(format!("no ticker returned for {symbol}")))?;

        let raw = ticker
            .get("last")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| ticker.get("markPx").and_then(Value::as_str))
            .ok_or_else(|| Error::Decode("ticker missing both last and markPx".into()))?;

        raw.parse::<f64>().map_err(|e| Error::Decode(e.to_string()))
    }

    /// Sets leverage for `symbol`, skipping the API call if already set
    /// (spec.md §4.G.1). Sleeps 3s after a successful change.
    pub async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<()> {
        let target = Decimal::from(leverage);
        let positions = self.positions().await?;
        if positions.iter().any(|p| p.symbol == symbol && p.leverage == target) {
            return Ok(());
        }

        let inst_id = to_inst_id(symbol);
        let body = json!({ "instId": inst_id, "lever": leverage.to_string(), "mgnMode": "cross" });
        match self
            .transport
            .request(Method::POST, "/api/v5/account/set-leverage", Some(&body))
            .await
        {
            Ok(_) => {}
            Err(Error::Envelope { msg, .. }) if msg.contains("already") || msg.contains("same") => {
                debug!(symbol, %msg, "leverage already set on exchange, treating as success");
            }
            Err(e) => return Err(e),
        }

        tokio::time::sleep(LEVERAGE_COOLDOWN).await;
        Ok(())
    }

    /// No-op: margin mode is selected per-order (`tdMode`) on this venue,
    /// not per-account (spec.md §6).
    pub async fn set_margin_mode(&self, _symbol: &str, _is_cross: bool) -> Result<()> {
        Ok(())
    }

    async fn place_market_order(
        &self,
        symbol: &str,
        side: &str,
        qty: Decimal,
        reduce_only: bool,
    ) -> Result<OrderResult> {
        let sz = format_quantity(&self.instruments, &self.transport, symbol, qty).await?;
        if Decimal::from_str(&sz).unwrap_or(Decimal::ZERO) <= Decimal::ZERO {
            return Err(Error::Precondition(format!(
                "formatted quantity is non-positive: {sz}"
            )));
        }

        let inst_id = to_inst_id(symbol);
        let mut body = json!({
            "instId": inst_id,
            "tdMode": "cross",
            "side": side,
            "ordType": "market",
            "sz": sz,
        });
        if reduce_only {
            body["reduceOnly"] = Value::Bool(true);
        }

        let data = self.transport.request(Method::POST, "/api/v5/trade/order", Some(&body)).await?;
        let orders: Vec<Value> = serde_json::from_value(data)?;
        let order = orders
            .first()
            .ok_or_else(|| Error::Precondition("empty order response".into()))?;

        let s_code = order.get("sCode").and_then(Value::as_str).unwrap_or("");
        if s_code != "0" {
            let s_msg = order
                .get("sMsg")
                .and_then(Value::as_str)
                .unwrap_or("unknown order rejection")
                .to_string();
            return Err(Error::Envelope { code: s_code.to_string(), msg: s_msg });
        }

        let order_id = order.get("ordId").and_then(Value::as_str).unwrap_or_default().to_string();
        Ok(OrderResult { order_id, symbol: symbol.to_string(), status: "FILLED" })
    }

    async fn open_position(
        &self,
        symbol: &str,
        qty: Decimal,
        leverage: u32,
        side: &str,
    ) -> Result<OrderResult> {
        if let Err(e) = self.cancel_all_orders(symbol).await {
            warn!(symbol, error = %e, "pre-open order cleanup failed, continuing");
        }
        self.set_leverage(symbol, leverage).await?;
        self.place_market_order(symbol, side, qty, false).await
    }

    pub async fn open_long(&self, symbol: &str, qty: Decimal, leverage: u32) -> Result<OrderResult> {
        self.open_position(symbol, qty, leverage, "buy").await
    }

    pub async fn open_short(&self, symbol: &str, qty: Decimal, leverage: u32) -> Result<OrderResult> {
        self.open_position(symbol, qty, leverage, "sell").await
    }

    async fn close_position(
        &self,
        symbol: &str,
        qty: Decimal,
        position_side: PositionSide,
    ) -> Result<OrderResult> {
        let qty = if qty.is_zero() {
            let positions = self.positions().await?;
            positions
                .iter()
                .find(|p| p.symbol == symbol && p.side == position_side)
                .map(|p| p.position_amt)
                .ok_or_else(|| {
                    Error::Precondition(format!(
                        "no open {} position for {symbol}",
                        position_side.as_str()
                    ))
                })?
        } else {
            qty
        };

        let side = position_side.closing_order_side();
        self.place_market_order(symbol, side, qty, true).await
    }

    pub async fn close_long(&self, symbol: &str, qty: Decimal) -> Result<OrderResult> {
        self.close_position(symbol, qty, PositionSide::Long).await
    }

    pub async fn close_short(&self, symbol: &str, qty: Decimal) -> Result<OrderResult> {
        self.close_position(symbol, qty, PositionSide::Short).await
    }

    async fn set_algo_order(
        &self,
        symbol: &str,
        side: PositionSide,
        qty: Decimal,
        trigger_price: Decimal,
        trigger_field: &str,
    ) -> Result<()> {
        let sz = format_quantity(&self.instruments, &self.transport, symbol, qty).await?;
        let inst_id = to_inst_id(symbol);
        let precision = self.instruments.get_precision(&self.transport, &inst_id).await?;
        let px = format_price_with_precision(&precision, trigger_price);

        let mut body = json!({
            "instId": inst_id,
            "tdMode": "cross",
            "side": side.closing_order_side(),
            "ordType": "conditional",
            "sz": sz,
            "reduceOnly": true,
            "triggerPxType": "last",
        });
        body[trigger_field] = Value::String(px);

        self.transport.request(Method::POST, "/api/v5/trade/order-algo", Some(&body)).await?;
        Ok(())
    }

    pub async fn set_stop_loss(
        &self,
        symbol: &str,
        side: PositionSide,
        qty: Decimal,
        trigger_price: Decimal,
    ) -> Result<()> {
        self.set_algo_order(symbol, side, qty, trigger_price, "slTriggerPx").await
    }

    pub async fn set_take_profit(
        &self,
        symbol: &str,
        side: PositionSide,
        qty: Decimal,
        trigger_price: Decimal,
    ) -> Result<()> {
        self.set_algo_order(symbol, side, qty, trigger_price, "tpTriggerPx").await
    }

    async fn cancel_algo_orders_where(&self, symbol: &str, trigger_field: &str) -> Result<()> {
        let inst_id = to_inst_id(symbol);
        let path = format!(
            "/api/v5/trade/orders-algo-pending?instId={inst_id}&ordType=conditional"
        );
        let data = match self.transport.request(Method::GET, &path, None).await {
            Ok(d) => d,
            Err(e) => {
                warn!(symbol, error = %e, "failed to list pending algo orders");
                return Ok(());
            }
        };
        let orders: Vec<Value> = serde_json::from_value(data).unwrap_or_default();

        for order in orders {
            let trigger = order.get(trigger_field).and_then(Value::as_str).unwrap_or("");
            if trigger.is_empty() || trigger == "0" {
                continue;
            }
            let algo_id = order.get("algoId").and_then(Value::as_str).unwrap_or_default();
            let body = json!([{ "instId": inst_id, "algoId": algo_id }]);
            if let Err(e) = self
                .transport
                .request(Method::POST, "/api/v5/trade/cancel-algo", Some(&body))
                .await
            {
                warn!(symbol, algo_id, error = %e, "failed to cancel algo order");
            }
        }
        Ok(())
    }

    pub async fn cancel_stop_loss_orders(&self, symbol: &str) -> Result<()> {
        self.cancel_algo_orders_where(symbol, "slTriggerPx").await
    }

    pub async fn cancel_take_profit_orders(&self, symbol: &str) -> Result<()> {
        self.cancel_algo_orders_where(symbol, "tpTriggerPx").await
    }

    pub async fn cancel_stop_orders(&self, symbol: &str) -> Result<()> {
        self.cancel_stop_loss_orders(symbol).await?;
        self.cancel_take_profit_orders(symbol).await?;
        Ok(())
    }

    async fn cancel_pending_orders_individually(&self, inst_id: &str) -> Result<()> {
        let path = format!("/api/v5/trade/orders-pending?instId={inst_id}");
        let data = self.transport.request(Method::GET, &path, None).await?;
        let orders: Vec<Value> = serde_json::from_value(data)?;
        for order in orders {
            let ord_id = order.get("ordId").and_then(Value::as_str).unwrap_or_default();
            let body = json!({ "instId": inst_id, "ordId": ord_id });
            if let Err(e) = self
                .transport
                .request(Method::POST, "/api/v5/trade/cancel-order", Some(&body))
                .await
            {
                warn!(inst_id, ord_id, error = %e, "failed to cancel order");
            }
        }
        Ok(())
    }

    /// Best-effort cleanup: cancel pending normal orders individually (per
    /// spec.md §6's endpoint list, `trade/cancel-order` — there is no batch
    /// variant in scope here), then cancel both stop-loss and take-profit
    /// algo orders. All sub-failures are logged; the aggregate operation
    /// always returns success (spec.md §4.G.5).
    pub async fn cancel_all_orders(&self, symbol: &str) -> Result<()> {
        let inst_id = to_inst_id(symbol);

        if let Err(e) = self.cancel_pending_orders_individually(&inst_id).await {
            warn!(symbol, error = %e, "failed to cancel pending orders");
        }

        if let Err(e) = self.cancel_stop_loss_orders(symbol).await {
            warn!(symbol, error = %e, "failed to cancel stop-loss orders");
        }
        if let Err(e) = self.cancel_take_profit_orders(symbol).await {
            warn!(symbol, error = %e, "failed to cancel take-profit orders");
        }
        Ok(())
    }

    /// Arms OKX's dead-man's-switch: cancels all open orders for the account
    /// if no further request arrives within `timeout` (supplemental; see
    /// SPEC_FULL.md).
    pub async fn arm_dead_mans_switch(&self, timeout: Duration) -> Result<()> {
        let body = json!({ "timeOut": timeout.as_secs().to_string() });
        self.transport
            .request(Method::POST, "/api/v5/trade/cancel-all-after", Some(&body))
            .await?;
        Ok(())
    }

    pub async fn disarm_dead_mans_switch(&self) -> Result<()> {
        let body = json!({ "timeOut": "0" });
        self.transport
            .request(Method::POST, "/api/v5/trade/cancel-all-after", Some(&body))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PerpVenue for OkxClient {
    async fn get_balance(&self) -> Result<HashMap<String, Value>> {
        Ok(self.balance().await?.to_map())
    }

    async fn get_positions(&self) -> Result<Vec<HashMap<String, Value>>> {
        Ok(self.positions().await?.iter().map(NormalizedPosition::to_map).collect())
    }

    async fn get_market_price(&self, symbol: &str) -> Result<f64> {
        OkxClient::get_market_price(self, symbol).await
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<()> {
        OkxClient::set_leverage(self, symbol, leverage).await
    }

    async fn set_margin_mode(&self, symbol: &str, is_cross: bool) -> Result<()> {
        OkxClient::set_margin_mode(self, symbol, is_cross).await
    }

    async fn open_long(&self, symbol: &str, qty: Decimal, leverage: u32) -> Result<OrderResult> {
        OkxClient::open_long(self, symbol, qty, leverage).await
    }

    async fn open_short(&self, symbol: &str, qty: Decimal, leverage: u32) -> Result<OrderResult> {
        OkxClient::open_short(self, symbol, qty, leverage).await
    }

    async fn close_long(&self, symbol: &str, qty: Decimal) -> Result<OrderResult> {
        OkxClient::close_long(self, symbol, qty).await
    }

    async fn close_short(&self, symbol: &str, qty: Decimal) -> Result<OrderResult> {
        OkxClient::close_short(self, symbol, qty).await
    }

    async fn set_stop_loss(
        &self,
        symbol: &str,
        side: PositionSide,
        qty: Decimal,
        trigger_price: Decimal,
    ) -> Result<()> {
        OkxClient::set_stop_loss(self, symbol, side, qty, trigger_price).await
    }

    async fn set_take_profit(
        &self,
        symbol: &str,
        side: PositionSide,
        qty: Decimal,
        trigger_price: Decimal,
    ) -> Result<()> {
        OkxClient::set_take_profit(self, symbol, side, qty, trigger_price).await
    }

    async fn cancel_stop_loss_orders(&self, symbol: &str) -> Result<()> {
        OkxClient::cancel_stop_loss_orders(self, symbol).await
    }

    async fn cancel_take_profit_orders(&self, symbol: &str) -> Result<()> {
        OkxClient::cancel_take_profit_orders(self, symbol).await
    }

    async fn cancel_stop_orders(&self, symbol: &str) -> Result<()> {
        OkxClient::cancel_stop_orders(self, symbol).await
    }

    async fn cancel_all_orders(&self, symbol: &str) -> Result<()> {
        OkxClient::cancel_all_orders(self, symbol).await
    }
}
