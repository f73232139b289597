pub mod cascade;
pub mod state;
pub mod types;
pub mod weights;

pub use state::AllocationState;
pub use types::{AllocationSummary, Industry, TickerAllocation, TickerId, TradeLine};
