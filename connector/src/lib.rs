//! Venue connectors implementing the `tradecore` venue-adapter contract.
//!
//! Each venue module normalises one exchange into the venue-neutral
//! operations the execution core consumes: authentication, request signing,
//! transport, retry, and response mapping all live behind the adapter.

pub mod binancespot;
pub mod utils;
