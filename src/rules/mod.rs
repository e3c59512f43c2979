//! Trading rules
//!
//! - **Trend**: [`IsRisingRule`] (share of rising bars in a trailing window)

pub mod rising;

pub use rising::*;
