pub mod filter;
pub mod lead;

pub use filter::*;
pub use lead::*;
