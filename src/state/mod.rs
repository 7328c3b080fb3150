pub mod cache;
pub mod filter;
pub mod mutations;
pub mod notifications;
pub mod session;
pub mod spawn;
pub mod stats;

pub use mutations::InvalidateAll;
pub use session::LeadsSession;
pub use spawn::DioxusSpawner;
