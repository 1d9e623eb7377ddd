//! OKX perpetual-futures trading client.
//!
//! Wraps the authenticated OKX v5 REST API behind a single `OkxClient`,
//! normalizing balances, positions, and order results to a venue-agnostic
//! shape (`venue::PerpVenue`) so callers do not need to special-case OKX's
//! field names or instrument-ID format.

pub mod account_cache;
pub mod client;
pub mod config;
pub mod error;
pub mod instrument;
pub mod normalize;
pub mod precision;
pub mod signer;
pub mod symbol;
pub mod transport;
pub mod venue;

pub use client::OkxClient;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use normalize::{NormalizedBalance, NormalizedPosition, PositionSide};
pub use venue::{OrderResult, PerpVenue};
