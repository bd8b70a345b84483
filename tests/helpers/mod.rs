#![allow(dead_code)]
pub mod holiday_helpers;

pub use holiday_helpers::*;
