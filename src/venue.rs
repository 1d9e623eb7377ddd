//! `PerpVenue` — the cross-venue trading interface (spec.md §6, §9).
//!
//! Grounded on `other_examples/…titan-trading-system…exchange/adapter.rs`'s
//! `#[async_trait] trait ExchangeAdapter`: the spec names this "uniform
//! polymorphism across venues" directly, and that file is the pack's own
//! instance of exactly this pattern — an async trait any per-venue client
//! implements, so callers written against one venue's vocabulary keep
//! working against another.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::Result;
use crate::normalize::PositionSide;

/// Result of a market order placement (open or close).
#[derive(Debug, Clone, PartialEq)]
pub struct OrderResult {
    pub order_id: String,
    pub symbol: String,
    pub status: &'static str,
}

/// The shared trading-venue capability set. A caller coded against this
/// trait can be pointed at any implementing venue without change — symbol
/// format and field-naming differences stay inside the implementation.
#[async_trait]
pub trait PerpVenue: Send + Sync {
    async fn get_balance(&self) -> Result<HashMap<String, Value>>;
    async fn get_positions(&self) -> Result<Vec<HashMap<String, Value>>>;
    async fn get_market_price(&self, symbol: &str) -> Result<f64>;

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<()>;
    /// No-op on venues where margin mode is selected per-order rather than
    /// per-account (spec.md §6).
    async fn set_margin_mode(&self, symbol: &str, is_cross: bool) -> Result<()>;

    async fn open_long(&self, symbol: &str, qty: Decimal, leverage: u32) -> Result<OrderResult>;
    async fn open_short(&self, symbol: &str, qty: Decimal, leverage: u32) -> Result<OrderResult>;
    /// `qty == Decimal::ZERO` closes the full position.
    async fn close_long(&self, symbol: &str, qty: Decimal) -> Result<OrderResult>;
    async fn close_short(&self, symbol: &str, qty: Decimal) -> Result<OrderResult>;

    async fn set_stop_loss(
        &self,
        symbol: &str,
        side: PositionSide,
        qty: Decimal,
        trigger_price: Decimal,
    ) -> Result<()>;
    async fn set_take_profit(
        &self,
        symbol: &str,
        side: PositionSide,
        qty: Decimal,
        trigger_price: Decimal,
    ) -> Result<()>;

    async fn cancel_stop_loss_orders(&self, symbol: &str) -> Result<()>;
    async fn cancel_take_profit_orders(&self, symbol: &str) -> Result<()>;
    /// Cancels both stop-loss and take-profit algo orders for `symbol`.
    async fn cancel_stop_orders(&self, symbol: &str) -> Result<()>;
    async fn cancel_all_orders(&self, symbol: &str) -> Result<()>;
}
