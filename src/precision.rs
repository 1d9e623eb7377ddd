//! Precision Engine (spec.md §4.E) — quantizes order quantities and prices
//! against an instrument's contract-specification rules.
//!
//! Grounded on the teacher's `tax/price_oracle.rs` decimal handling
//! (`rust_decimal::Decimal` parsed from exchange strings) and its
//! log-and-continue degraded-fallback style.

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use tracing::warn;

use crate::error::{Error, Result};
use crate::instrument::{InstrumentCache, Precision};
use crate::symbol::to_inst_id;
use crate::transport::Transport;

fn floor_to_multiple(value: Decimal, multiple: Decimal) -> Decimal {
    if multiple <= Decimal::ZERO {
        return value;
    }
    (value / multiple).floor() * multiple
}

fn is_btc_or_eth(symbol: &str) -> bool {
    let upper = symbol.to_uppercase();
    upper.starts_with("BTC") || upper.starts_with("ETH")
}

/// Quantize an order quantity per spec.md §4.E, rendering it as the
/// contract-count integer string OKX expects.
pub async fn format_quantity(
    cache: &InstrumentCache,
    transport: &Transport,
    symbol: &str,
    q: Decimal,
) -> Result<String> {
    if q <= Decimal::ZERO {
        return Err(Error::Precondition(format!("quantity must be > 0, got {q}")));
    }

    let inst_id = to_inst_id(symbol);
    let precision = match cache.get_precision(transport, &inst_id).await {
        Ok(p) => p,
        Err(e) => {
            let decimals = if is_btc_or_eth(symbol) { 2 } else { 3 };
            warn!(
                symbol,
                error = %e,
                "instrument spec unavailable, falling back to {decimals}-decimal rounding"
            );
            let rounded = q.round_dp(decimals);
            let rendered = rounded.to_string();
            let trimmed = if rendered.contains('.') {
                rendered.trim_end_matches('0').trim_end_matches('.').to_string()
            } else {
                rendered
            };
            return Ok(trimmed);
        }
    };

    let spec = &precision.spec;
    let mut qty = if q < spec.min_size { spec.min_size } else { q };

    if spec.lot_size > Decimal::ZERO {
        qty = floor_to_multiple(qty, spec.lot_size);
        if qty < spec.min_size {
            qty = spec.min_size;
        }
    }

    Ok(qty.trunc().to_string())
}

/// Quantize a price per spec.md §4.E: floor to the nearest tick, rendered
/// with the instrument's price decimal places, trailing zeros trimmed.
pub async fn format_price(
    cache: &InstrumentCache,
    transport: &Transport,
    symbol: &str,
    p: Decimal,
) -> Result<String> {
    let inst_id = to_inst_id(symbol);
    let precision = cache.get_precision(transport, &inst_id).await?;
    Ok(format_price_with_precision(&precision, p))
}

pub(crate) fn format_price_with_precision(precision: &Precision, p: Decimal) -> String {
    let spec = &precision.spec;
    let quantized = if spec.tick_size > Decimal::ZERO {
        floor_to_multiple(p, spec.tick_size)
    } else {
        let scale = Decimal::TEN.powi(precision.price_decimals as i64);
        (p * scale).floor() / scale
    };

    let rendered = format!("{:.*}", precision.price_decimals as usize, quantized);
    let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::InstrumentSpec;
    use rust_decimal_macros::dec;

    fn precision(lot: Decimal, tick: Decimal, min: Decimal) -> Precision {
        Precision {
            spec: InstrumentSpec {
                inst_id: "BTC-USDT-SWAP".into(),
                lot_size: lot,
                tick_size: tick,
                min_size: min,
                contract_value: dec!(0.01),
                base_ccy: "BTC".into(),
                quote_ccy: "USDT".into(),
                inst_type: "SWAP".into(),
                state: "live".into(),
            },
            qty_decimals: 0,
            price_decimals: 1,
        }
    }

    #[test]
    fn floor_to_multiple_rounds_down() {
        assert_eq!(floor_to_multiple(dec!(0.873), dec!(1)), dec!(0));
        assert_eq!(floor_to_multiple(dec!(12), dec!(5)), dec!(10));
    }

    #[test]
    fn format_price_floors_to_tick_and_trims_zeros() {
        let p = precision(dec!(1), dec!(0.1), dec!(1));
        assert_eq!(format_price_with_precision(&p, dec!(100.27)), "100.2");
        assert_eq!(format_price_with_precision(&p, dec!(100.0)), "100");
    }

    #[test]
    fn btc_eth_fallback_uses_two_decimals() {
        assert!(is_btc_or_eth("BTCUSDT"));
        assert!(is_btc_or_eth("ETHUSDT"));
        assert!(!is_btc_or_eth("SOLUSDT"));
    }

    #[tokio::test]
    async fn degraded_fallback_preserves_fractional_precision() {
        // Port 1 refuses connections immediately, forcing `get_precision` to
        // fail and exercising the degraded-rounding fallback path.
        let transport = Transport::with_base_url(
            "http://127.0.0.1:1".into(),
            "key".into(),
            "secret".into(),
            "pass".into(),
            false,
        );
        let cache = InstrumentCache::new();

        let sz = format_quantity(&cache, &transport, "BTCUSDT", dec!(0.03)).await.unwrap();
        assert_eq!(sz, "0.03");

        let sz = format_quantity(&cache, &transport, "SOLUSDT", dec!(0.12345)).await.unwrap();
        assert_eq!(sz, "0.123");

        let sz = format_quantity(&cache, &transport, "BTCUSDT", dec!(5)).await.unwrap();
        assert_eq!(sz, "5");
    }
}
