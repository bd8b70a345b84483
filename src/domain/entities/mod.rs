pub mod calculation;
pub mod holiday;

pub use calculation::*;
pub use holiday::*;
