//! Types that represent the core data model, such as `Movement` and `Draft`, and the mapping of a
//! `Movement` to and from a spreadsheet row.
mod amount;
mod draft;
mod movement;
mod parsed;
pub mod row;

pub use amount::{Amount, AmountError};
pub use draft::{Draft, DraftError};
pub use movement::{Frequency, Kind, Movement};
pub use parsed::Parsed;
