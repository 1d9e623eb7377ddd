//! Symbol Codec — translation between caller-facing symbols (`BTCUSDT`) and
//! OKX instrument IDs (`BTC-USDT-SWAP`).
//!
//! Total functions; no errors. See spec.md §4.A.

/// Forward-translate a caller symbol into an OKX perpetual-swap instrument ID.
///
/// If `symbol` already contains a `-`, it is assumed to already be an
/// instrument ID and is returned unchanged.
pub fn to_inst_id(symbol: &str) -> String {
    if symbol.contains('-') {
        return symbol.to_string();
    }

    if let Some(base) = symbol.strip_suffix("USDT") {
        format!("{base}-USDT-SWAP")
    } else if let Some(base) = symbol.strip_suffix("USD") {
        format!("{base}-USD-SWAP")
    } else {
        format!("{symbol}-USDT-SWAP")
    }
}

/// Reverse-translate an OKX instrument ID back into a caller-facing symbol.
pub fn from_inst_id(inst_id: &str) -> String {
    inst_id.strip_suffix("-SWAP").unwrap_or(inst_id).replace('-', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_usdt() {
        assert_eq!(to_inst_id("BTCUSDT"), "BTC-USDT-SWAP");
    }

    #[test]
    fn forward_usd() {
        assert_eq!(to_inst_id("BTCUSD"), "BTC-USD-SWAP");
    }

    #[test]
    fn forward_passthrough_already_hyphenated() {
        assert_eq!(to_inst_id("BTC-USDT-SWAP"), "BTC-USDT-SWAP");
    }

    #[test]
    fn forward_unknown_suffix_defaults_to_usdt_swap() {
        assert_eq!(to_inst_id("BTCFOO"), "BTCFOO-USDT-SWAP");
    }

    #[test]
    fn reverse_strips_swap_and_hyphens() {
        assert_eq!(from_inst_id("BTC-USDT-SWAP"), "BTCUSDT");
        assert_eq!(from_inst_id("ETH-USD-SWAP"), "ETHUSD");
    }

    #[test]
    fn round_trip_usdt_and_usd() {
        for symbol in ["BTCUSDT", "ETHUSDT", "BTCUSD", "ETHUSD"] {
            assert_eq!(from_inst_id(&to_inst_id(symbol)), symbol);
        }
    }
}
