pub mod form;
pub mod set;

pub use form::{CountryRow, FormIssue, FormOptions, PendingForm};
pub use set::AccessSet;
