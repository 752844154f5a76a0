//! Event-sourced execution core for a spot-trading subsystem.
//!
//! The crate is organised around a single source of truth: the append-only
//! [`spine::EventSpine`]. Commands from upstream produce domain [`event`]s,
//! events are appended to the spine, and the in-memory
//! [`projection::TradingState`] is a pure fold over them. Venue access goes
//! through the [`venue::VenueAdapter`] contract; concrete adapters live in
//! their own crate.

pub mod domain;
pub mod event;
pub mod observability;
pub mod projection;
pub mod spine;
pub mod types;
pub mod venue;

pub mod prelude {
    pub use crate::{
        domain::{Fill, Order, Position, SingleShotParams, TradeAbort, TradeCommand, TradeOutcome},
        event::Event,
        projection::TradingState,
        spine::EventSpine,
        types::{
            DomainError,
            EpochId,
            ExecutionMode,
            MakerPreference,
            OrderStatus,
            OrderType,
            Side,
            StpMode,
            TimeInForce,
            TradeStatus,
        },
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
}
