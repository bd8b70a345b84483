pub mod calculation_service;
pub mod holiday_provider;

pub use calculation_service::*;
pub use holiday_provider::*;
