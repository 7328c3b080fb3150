mod form;
mod list;
mod row;
mod stats;

pub use form::NewLeadForm;
pub use list::LeadList;
pub use row::{DetailsEdit, LeadRow};
pub use stats::StatsBar;
