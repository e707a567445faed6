//! Reads all movements from the sheet and appends new ones to it.

use crate::api::{data_range, Sheet};
use crate::error::SyncError;
use crate::model::row::{self, Column, DecodePolicy};
use crate::model::{Draft, DraftError, Movement};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// The spreadsheet row number of the first data row. Row 1 holds the headers.
const FIRST_DATA_ROW: usize = 2;

/// Reads and writes movements through an owned `Sheet`.
///
/// Every operation is a separate request to the sheet, nothing is cached between calls. Two
/// gateways appending to the same sheet are not coordinated, and nothing stops the same `id` from
/// being appended twice.
pub struct SyncGateway {
    sheet: Box<dyn Sheet + Send>,
    range: String,
    policy: DecodePolicy,
}

/// The result of reading the whole sheet.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Fetched {
    movements: Vec<Movement>,
    skipped: Vec<SkippedRow>,
    corrected: Vec<CorrectedRow>,
}

/// A row that did not produce a movement.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SkippedRow {
    /// The spreadsheet row number, as shown in the sheet.
    pub row: usize,
    pub reason: String,
}

/// A row that produced a movement only after some of its cells were replaced by fallbacks.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CorrectedRow {
    /// The spreadsheet row number, as shown in the sheet.
    pub row: usize,
    pub columns: Vec<Column>,
}

impl Fetched {
    /// The movements that could be read, in sheet order.
    pub fn movements(&self) -> &[Movement] {
        &self.movements
    }

    pub fn into_movements(self) -> Vec<Movement> {
        self.movements
    }

    pub fn skipped(&self) -> &[SkippedRow] {
        &self.skipped
    }

    /// Rows that were kept even though some cells could not be read as-is.
    pub fn corrected(&self) -> &[CorrectedRow] {
        &self.corrected
    }
}

/// Why `SyncGateway::save` did not save a draft.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum SaveError {
    #[error("The movement is not ready to be saved: {0}")]
    Invalid(#[from] DraftError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl SyncGateway {
    /// Creates a gateway that reads and appends the movement rows of the `sheet_name` tab.
    pub fn new(sheet: Box<dyn Sheet + Send>, sheet_name: &str, policy: DecodePolicy) -> Self {
        Self {
            sheet,
            range: data_range(sheet_name),
            policy,
        }
    }

    /// The A1 range this gateway reads from and appends to.
    pub fn range(&self) -> &str {
        &self.range
    }

    /// Reads every row and decodes the ones it can. Rows that cannot be decoded are skipped and
    /// reported in the result.
    ///
    /// # Errors
    /// - Whatever the sheet fails with when fetching the rows.
    /// - `SyncError::Malformed` when there are rows but not a single one can be decoded. A sheet
    ///   with no rows is not an error.
    pub async fn fetch_all(&mut self) -> Result<Fetched, SyncError> {
        let rows = self.sheet.get(&self.range).await?;
        debug!("Fetched {} rows from {}", rows.len(), self.range);

        let mut fetched = Fetched::default();
        for (ix, cells) in rows.iter().enumerate() {
            let row_number = ix + FIRST_DATA_ROW;
            match row::decode(cells).and_then(|decoded| self.policy.accept(decoded)) {
                Ok(decoded) => {
                    if decoded.is_corrected() {
                        debug!(
                            "Row {row_number} needed fallbacks for {:?}",
                            decoded.corrected()
                        );
                        fetched.corrected.push(CorrectedRow {
                            row: row_number,
                            columns: decoded.corrected().to_vec(),
                        });
                    }
                    fetched.movements.push(decoded.into_movement());
                }
                Err(e) => {
                    warn!("Skipping row {row_number}: {e}");
                    fetched.skipped.push(SkippedRow {
                        row: row_number,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if fetched.movements.is_empty() && !fetched.skipped.is_empty() {
            return Err(SyncError::Malformed(format!(
                "None of the {} rows in {} could be read",
                fetched.skipped.len(),
                self.range
            )));
        }
        info!(
            "Loaded {} movements, skipped {} rows",
            fetched.movements.len(),
            fetched.skipped.len()
        );
        Ok(fetched)
    }

    /// Appends `movement` as a new row after the last one.
    pub async fn append(&mut self, movement: &Movement) -> Result<(), SyncError> {
        let cells = row::encode(movement);
        self.sheet.append(&self.range, &[cells]).await?;
        info!(
            "Saved {} '{}' dated {}",
            movement.kind(),
            movement.label(),
            movement.date()
        );
        Ok(())
    }

    /// Checks `draft`, builds its movement and appends it. The draft is left untouched so that it
    /// can be retried when saving fails.
    pub async fn save(&mut self, draft: &Draft) -> Result<Movement, SaveError> {
        draft.validate()?;
        let movement = draft.build();
        self.append(&movement).await?;
        Ok(movement)
    }

    /// Like `fetch_all`, but any error is logged and reported as no movements at all.
    pub async fn fetch_all_or_empty(&mut self) -> Vec<Movement> {
        match self.fetch_all().await {
            Ok(fetched) => fetched.into_movements(),
            Err(e) => {
                warn!("Unable to load movements: {e}");
                Vec::new()
            }
        }
    }

    /// Like `append`, but any error is logged and reported as `false`.
    pub async fn append_or_false(&mut self, movement: &Movement) -> bool {
        match self.append(movement).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Unable to save the movement: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MemorySheet, DEFAULT_SHEET_NAME};
    use crate::model::{Frequency, Kind};
    use chrono::NaiveDate;

    const GOOD: [&str; 9] = [
        "1",
        "02/10/2025",
        "Gasto",
        "Comida",
        "Panadería",
        "3.20",
        "Puntual",
        "3.20",
        "FALSE",
    ];

    const SHORT: [&str; 5] = ["2", "03/10/2025", "Gasto", "Comida", "Café"];

    const ODD: [&str; 8] = [
        "3",
        "04/10/2025",
        "Otro",
        "Ocio",
        "Cine",
        "9.00",
        "Bimestral",
        "9.00",
    ];

    fn gateway_over(sheet: &MemorySheet, policy: DecodePolicy) -> SyncGateway {
        SyncGateway::new(Box::new(sheet.clone()), DEFAULT_SHEET_NAME, policy)
    }

    fn draft() -> Draft {
        Draft {
            id: String::new(),
            date: NaiveDate::from_ymd_opt(2025, 10, 5).unwrap(),
            kind: Kind::Expense,
            category: "Vivienda".to_string(),
            label: "Internet".to_string(),
            amount: "60".to_string(),
            frequency: Frequency::Monthly,
            is_joint: true,
        }
    }

    #[tokio::test]
    async fn test_one_good_and_one_bad_row() {
        let sheet = MemorySheet::with_rows(DEFAULT_SHEET_NAME, vec![GOOD.to_vec(), SHORT.to_vec()]);
        let mut gateway = gateway_over(&sheet, DecodePolicy::Lenient);
        let fetched = gateway.fetch_all().await.unwrap();
        assert_eq!(fetched.movements().len(), 1);
        assert_eq!(fetched.movements()[0].label(), "Panadería");
        assert_eq!(fetched.skipped().len(), 1);
        assert_eq!(fetched.skipped()[0].row, 3);
    }

    #[tokio::test]
    async fn test_empty_sheet_is_not_an_error() {
        let sheet = MemorySheet::with_rows(DEFAULT_SHEET_NAME, Vec::<Vec<String>>::new());
        let mut gateway = gateway_over(&sheet, DecodePolicy::Lenient);
        let fetched = gateway.fetch_all().await.unwrap();
        assert!(fetched.movements().is_empty());
        assert!(fetched.skipped().is_empty());
    }

    #[tokio::test]
    async fn test_all_rows_unreadable_is_malformed() {
        let sheet =
            MemorySheet::with_rows(DEFAULT_SHEET_NAME, vec![SHORT.to_vec(), SHORT.to_vec()]);
        let mut gateway = gateway_over(&sheet, DecodePolicy::Lenient);
        let result = gateway.fetch_all().await;
        assert!(matches!(result, Err(SyncError::Malformed(_))));
        assert!(gateway.fetch_all_or_empty().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrected_rows_are_reported() {
        let sheet = MemorySheet::with_rows(DEFAULT_SHEET_NAME, vec![GOOD.to_vec(), ODD.to_vec()]);
        let mut gateway = gateway_over(&sheet, DecodePolicy::Lenient);
        let fetched = gateway.fetch_all().await.unwrap();
        assert_eq!(fetched.movements().len(), 2);
        assert_eq!(fetched.movements()[1].kind(), Kind::Expense);
        assert_eq!(fetched.movements()[1].frequency(), Frequency::OneOff);
        assert_eq!(
            fetched.corrected(),
            &[CorrectedRow {
                row: 3,
                columns: vec![Column::Kind, Column::Frequency],
            }]
        );
    }

    #[tokio::test]
    async fn test_strict_policy_skips_corrected_rows() {
        let sheet = MemorySheet::with_rows(DEFAULT_SHEET_NAME, vec![GOOD.to_vec(), ODD.to_vec()]);
        let mut gateway = gateway_over(&sheet, DecodePolicy::Strict);
        let fetched = gateway.fetch_all().await.unwrap();
        assert_eq!(fetched.movements().len(), 1);
        assert_eq!(fetched.skipped()[0].row, 3);
        assert!(fetched.corrected().is_empty());
    }

    #[tokio::test]
    async fn test_transport_errors_are_kept_apart() {
        let sheet = MemorySheet::seeded();
        let mut gateway = gateway_over(&sheet, DecodePolicy::Lenient);

        sheet.fail_with(Some(SyncError::Unauthorized("token revoked".to_string())));
        assert_eq!(
            gateway.fetch_all().await,
            Err(SyncError::Unauthorized("token revoked".to_string()))
        );

        sheet.fail_with(Some(SyncError::Unreachable("no network".to_string())));
        assert_eq!(
            gateway.fetch_all().await,
            Err(SyncError::Unreachable("no network".to_string()))
        );
        assert!(gateway.fetch_all_or_empty().await.is_empty());
    }

    #[tokio::test]
    async fn test_append_adds_a_row_after_the_last() {
        let sheet = MemorySheet::with_rows(DEFAULT_SHEET_NAME, vec![GOOD.to_vec()]);
        let mut gateway = gateway_over(&sheet, DecodePolicy::Lenient);
        let movement = draft().build();
        gateway.append(&movement).await.unwrap();

        let rows = sheet.rows(DEFAULT_SHEET_NAME);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], GOOD.to_vec());
        assert_eq!(rows[2], row::encode(&movement));

        let fetched = gateway.fetch_all().await.unwrap();
        assert_eq!(fetched.movements()[1], movement);
    }

    #[tokio::test]
    async fn test_append_failure() {
        let sheet = MemorySheet::seeded();
        let mut gateway = gateway_over(&sheet, DecodePolicy::Lenient);
        sheet.fail_with(Some(SyncError::Unreachable("quota".to_string())));
        let movement = draft().build();
        assert!(matches!(
            gateway.append(&movement).await,
            Err(SyncError::Unreachable(_))
        ));
        assert!(!gateway.append_or_false(&movement).await);

        sheet.fail_with(None);
        assert!(gateway.append_or_false(&movement).await);
    }

    #[tokio::test]
    async fn test_save_validates_then_appends() {
        let sheet = MemorySheet::with_rows(DEFAULT_SHEET_NAME, Vec::<Vec<String>>::new());
        let mut gateway = gateway_over(&sheet, DecodePolicy::Lenient);

        let mut incomplete = draft();
        incomplete.label.clear();
        assert_eq!(
            gateway.save(&incomplete).await,
            Err(SaveError::Invalid(DraftError::EmptyLabel))
        );
        assert_eq!(sheet.rows(DEFAULT_SHEET_NAME).len(), 1);

        let saved = gateway.save(&draft()).await.unwrap();
        assert_eq!(saved.gross_amount().value(), rust_decimal::Decimal::from(30));
        assert_eq!(sheet.rows(DEFAULT_SHEET_NAME).len(), 2);
    }

    #[tokio::test]
    async fn test_range_uses_sheet_name() {
        let sheet = MemorySheet::empty();
        let gateway = SyncGateway::new(Box::new(sheet), "Hogar", DecodePolicy::Lenient);
        assert_eq!(gateway.range(), "Hogar!A2:I");
    }
}
