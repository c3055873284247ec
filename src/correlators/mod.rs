//! Correlators: consume raw detector events and fuse them into higher-level
//! timing primitives (tick chains, confirmed markers, classified BCD symbols).

pub mod bcd_window;
pub mod marker;
pub mod tick_chain;

pub use bcd_window::BcdWindower;
pub use marker::MarkerCorrelator;
pub use tick_chain::{ChainStats, TickCorrelator};
