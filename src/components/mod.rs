pub mod common;
pub mod leads;
