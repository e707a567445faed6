//! Keeps a household's income and expense movements in a Google sheet.
//!
//! A [`Draft`] holds what the user typed. Building it yields a [`Movement`] whose amount has been
//! split for joint expenses and whose monthly impact has been derived from its frequency. The
//! [`SyncGateway`] writes movements to the sheet one row at a time and reads them all back,
//! skipping rows it cannot make sense of.

mod api;
mod config;
pub mod context;
mod error;
pub mod logging;
pub mod model;
pub mod summary;
#[cfg(test)]
mod test;
mod utils;

pub use api::{
    open_gateway, open_sheet, CorrectedRow, Fetched, MemorySheet, Mode, SaveError, Sheet,
    SkippedRow, SyncGateway, DEFAULT_SHEET_NAME,
};
pub use config::Config;
pub use error::{Error, Result, SyncError};
pub use model::{Amount, Draft, Frequency, Kind, Movement};
pub use summary::Summary;
