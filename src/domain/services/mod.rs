pub mod date_engine;
pub mod holiday_aggregator;

pub use date_engine::*;
pub use holiday_aggregator::*;
