pub mod client;
pub mod leads;

#[cfg(test)]
pub mod memory;

pub use client::*;
pub use leads::*;
