//! Instrument-Spec Cache (spec.md §4.D) — fetches and caches per-instrument
//! contract metadata (lot size, tick size, min size). Entries never expire;
//! the spec is stable for the process lifetime.
//!
//! Grounded on the teacher's `pool::PoolStateManager`: a `DashMap`-backed,
//! concurrently-readable/writable cache keyed by a stable identifier, with
//! no eviction.

use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashMap;
use reqwest::Method;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::transport::Transport;

/// Raw instrument metadata as returned by `/api/v5/public/instruments`.
#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentSpec {
    #[serde(rename = "instId")]
    pub inst_id: String,
    #[serde(rename = "lotSz")]
    pub lot_size: Decimal,
    #[serde(rename = "tickSz")]
    pub tick_size: Decimal,
    #[serde(rename = "minSz")]
    pub min_size: Decimal,
    #[serde(rename = "ctVal")]
    pub contract_value: Decimal,
    #[serde(rename = "baseCcy", default)]
    pub base_ccy: String,
    #[serde(rename = "quoteCcy", default)]
    pub quote_ccy: String,
    #[serde(rename = "instType")]
    pub inst_type: String,
    pub state: String,
}

impl InstrumentSpec {
    fn validate(&self) -> Result<()> {
        if self.lot_size <= Decimal::ZERO {
            return Err(Error::Decode(format!("{}: lotSz must be > 0", self.inst_id)));
        }
        if self.tick_size <= Decimal::ZERO {
            return Err(Error::Decode(format!("{}: tickSz must be > 0", self.inst_id)));
        }
        if self.min_size < self.lot_size {
            return Err(Error::Decode(format!(
                "{}: minSz must be >= lotSz",
                self.inst_id
            )));
        }
        Ok(())
    }
}

/// Derived precision for an instrument: decimal-place counts computed by
/// trimming trailing zeros from a fixed `%.10f` rendering of lot/tick size.
#[derive(Debug, Clone)]
pub struct Precision {
    pub spec: InstrumentSpec,
    pub qty_decimals: u32,
    pub price_decimals: u32,
}

fn decimal_places(value: Decimal) -> u32 {
    let rendered = format!("{:.10}", value);
    let trimmed = rendered.trim_end_matches('0');
    match trimmed.split_once('.') {
        Some((_, frac)) => frac.len() as u32,
        None => 0,
    }
}

/// Instrument-spec cache: never-evicting, keyed by OKX instrument ID.
pub struct InstrumentCache {
    specs: Arc<DashMap<String, Precision>>,
}

impl InstrumentCache {
    pub fn new() -> Self {
        Self { specs: Arc::new(DashMap::new()) }
    }

    /// Fetch the raw instrument record for `inst_id`. Fails if the exchange
    /// returns an empty list.
    pub async fn fetch_instrument(
        &self,
        transport: &Transport,
        inst_id: &str,
    ) -> Result<InstrumentSpec> {
        let path = format!("/api/v5/public/instruments?instType=SWAP&instId={inst_id}");
        let data = transport.request(Method::GET, &path, None).await?;
        let records: Vec<InstrumentSpec> = serde_json::from_value(data)?;
        let spec = records
            .into_iter()
            .next()
            .ok_or_else(|| Error::Precondition(format!("no instrument found for {inst_id}")))?;
        spec.validate()?;
        Ok(spec)
    }

    /// Read-through: returns the cached precision for `inst_id`, fetching and
    /// caching on first miss. Never expires once populated.
    pub async fn get_precision(
        &self,
        transport: &Transport,
        inst_id: &str,
    ) -> Result<Precision> {
        if let Some(entry) = self.specs.get(inst_id) {
            return Ok(entry.clone());
        }

        let spec = self.fetch_instrument(transport, inst_id).await?;
        let precision = Precision {
            qty_decimals: decimal_places(spec.lot_size),
            price_decimals: decimal_places(spec.tick_size),
            spec,
        };
        debug!(inst_id, qty_decimals = precision.qty_decimals, price_decimals = precision.price_decimals, "cached instrument spec");
        self.specs.insert(inst_id.to_string(), precision.clone());
        Ok(precision)
    }
}

impl Default for InstrumentCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a decimal string field out of a raw JSON record, defaulting to zero.
pub(crate) fn decimal_field(value: &Value, field: &str) -> Decimal {
    value
        .get(field)
        .and_then(Value::as_str)
        .and_then(|s| Decimal::from_str(s).ok())
        .unwrap_or(Decimal::ZERO)
}
