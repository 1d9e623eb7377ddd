//! Normalized account-state shapes (spec.md §3) returned to callers.
//!
//! Field doc comments here carry the Binance-flavored compatibility names
//! verbatim (spec.md §9): the crate never leaks OKX-native field names
//! upward. Internally these are typed `Decimal` structs (cached by
//! `account_cache::TtlCache`); `to_map` renders the flat, string-valued map
//! shape the cross-venue trait (`venue::PerpVenue`) returns, matching the
//! teacher's `TradeResult`/`BotConfig` convention of plain serializable
//! structs without builders.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn dec_value(d: Decimal) -> Value {
    Value::String(d.to_string())
}

/// Normalized account balance. `total_wallet_balance = total_equity -
/// unrealized_pnl` (spec.md §3); every field is non-negative except
/// `total_unrealized_profit`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBalance {
    pub total_wallet_balance: Decimal,
    pub available_balance: Decimal,
    pub total_unrealized_profit: Decimal,
}

impl NormalizedBalance {
    /// Render the compatibility map: `totalWalletBalance`/`total_balance`,
    /// `availableBalance`/`available_balance`, `equity`, `totalUnrealizedProfit`.
    pub fn to_map(&self) -> HashMap<String, Value> {
        let mut m = HashMap::new();
        m.insert("totalWalletBalance".to_string(), dec_value(self.total_wallet_balance));
        m.insert("total_balance".to_string(), dec_value(self.total_wallet_balance));
        m.insert("availableBalance".to_string(), dec_value(self.available_balance));
        m.insert("available_balance".to_string(), dec_value(self.available_balance));
        m.insert("equity".to_string(), dec_value(self.total_wallet_balance));
        m.insert("totalUnrealizedProfit".to_string(), dec_value(self.total_unrealized_profit));
        m
    }
}

/// Position side, derived from the sign of the raw OKX position quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSide::Long => "long",
            PositionSide::Short => "short",
        }
    }

    /// The side of an order that would close a position on this side.
    pub fn closing_order_side(&self) -> &'static str {
        match self {
            PositionSide::Long => "sell",
            PositionSide::Short => "buy",
        }
    }
}

/// A single open position (one per non-zero exchange position, spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPosition {
    pub symbol: String,
    /// Always positive; sign information lives in `side`.
    pub position_amt: Decimal,
    pub entry_price: Decimal,
    pub mark_price: Decimal,
    pub unrealized_profit: Decimal,
    pub leverage: Decimal,
    pub margin: Decimal,
    pub notional: Decimal,
    pub liquidation_price: Decimal,
    pub side: PositionSide,
    pub margin_mode: String,
}

impl NormalizedPosition {
    /// Render the compatibility map with both the Binance-flavored
    /// `unRealizedProfit` (capitalized R, preserved verbatim per spec.md §9)
    /// and the OKX-flavored `unrealizedPnl` alias.
    pub fn to_map(&self) -> HashMap<String, Value> {
        let mut m = HashMap::new();
        m.insert("symbol".to_string(), Value::String(self.symbol.clone()));
        m.insert("positionAmt".to_string(), dec_value(self.position_amt));
        m.insert("entryPrice".to_string(), dec_value(self.entry_price));
        m.insert("markPrice".to_string(), dec_value(self.mark_price));
        m.insert("unRealizedProfit".to_string(), dec_value(self.unrealized_profit));
        m.insert("unrealizedPnl".to_string(), dec_value(self.unrealized_profit));
        m.insert("leverage".to_string(), dec_value(self.leverage));
        m.insert("margin".to_string(), dec_value(self.margin));
        m.insert("notional".to_string(), dec_value(self.notional));
        m.insert("liquidationPrice".to_string(), dec_value(self.liquidation_price));
        m.insert("side".to_string(), Value::String(self.side.as_str().to_string()));
        m.insert("positionSide".to_string(), Value::String(self.side.as_str().to_string()));
        m.insert("marginMode".to_string(), Value::String(self.margin_mode.clone()));
        m.insert("marginType".to_string(), Value::String(self.margin_mode.clone()));
        m
    }
}
