//! Talking to the spreadsheet that stores the movements.
//!
//! The `Sheet` trait is the smallest surface we need from a spreadsheet: read a range and append
//! rows after the last one. `GoogleSheet` implements it against the Google Sheets API and
//! `MemorySheet` keeps everything in memory. The `SyncGateway` owns one of these and turns rows
//! into movements and back.

mod files;
mod gateway;
mod google_sheet;
mod memory_sheet;
mod oauth;

use crate::error::SyncError;
use crate::Config;
use tracing::debug;

pub use gateway::{CorrectedRow, Fetched, SaveError, SkippedRow, SyncGateway};
pub use memory_sheet::MemorySheet;
pub(crate) use oauth::TokenProvider;

/// The tab that holds the movements unless the configuration names another one.
pub const DEFAULT_SHEET_NAME: &str = "Finanzas";

/// Read and write access to spreadsheets is all we ask for.
const OAUTH_SCOPES: &[&str] = &["https://www.googleapis.com/auth/spreadsheets"];

/// When this environment variable is set and non-empty, `Mode::from_env` returns `Mode::Test`.
const TEST_MODE_ENV: &str = "FINANZAS_SYNC_IN_TEST_MODE";

/// The range holding the movement rows of `sheet_name`. Row 1 is the header, and column I holds
/// the optional joint flag.
pub(crate) fn data_range(sheet_name: &str) -> String {
    format!("{sheet_name}!A2:I")
}

/// The operations the gateway needs from a spreadsheet.
#[async_trait::async_trait]
pub trait Sheet {
    /// Returns the rows of `range` (e.g. `Finanzas!A2:I`), each row as a list of cells. Trailing
    /// empty cells may be missing.
    async fn get(&mut self, range: &str) -> Result<Vec<Vec<String>>, SyncError>;

    /// Appends `rows` after the last row of the table found in `range`, never overwriting existing
    /// rows. Values are stored as given, without being interpreted as formulas.
    async fn append(&mut self, range: &str, rows: &[Vec<String>]) -> Result<(), SyncError>;
}

/// Which `Sheet` implementation to use.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum Mode {
    /// Use the Google Sheets API.
    #[default]
    Google,
    /// Use a seeded `MemorySheet`, so that the library can be run without a Google account.
    Test,
}

impl Mode {
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Google,
        }
    }
}

/// Creates the `Sheet` for `mode`. In `Mode::Google` the stored OAuth token is loaded, which fails
/// with `SyncError::Unauthorized` when it is missing or unreadable.
pub async fn open_sheet(
    config: &Config,
    mode: Mode,
) -> Result<Box<dyn Sheet + Send>, SyncError> {
    debug!("Creating a {mode:?} sheet");
    match mode {
        Mode::Google => {
            let token_provider =
                TokenProvider::load(&config.client_secret_path(), &config.token_path())
                    .await
                    .map_err(|e| SyncError::unauthorized(&e))?;
            Ok(Box::new(google_sheet::GoogleSheet::new(
                config.spreadsheet_id(),
                token_provider,
            )))
        }
        Mode::Test => Ok(Box::new(MemorySheet::default())),
    }
}

/// Creates a `SyncGateway` over the sheet for `mode`, addressed and configured by `config`.
pub async fn open_gateway(config: &Config, mode: Mode) -> Result<SyncGateway, SyncError> {
    let sheet = open_sheet(config, mode).await?;
    Ok(SyncGateway::new(
        sheet,
        config.sheet_name(),
        config.decode_policy(),
    ))
}
