//! Implements the `Sheet` trait with in-memory data.
//!
//! Note: this is compiled even in the "production" version of this library so that the whole
//! load/save cycle can be run without Google Sheets (see `Mode::Test`).

use crate::api::{Sheet, DEFAULT_SHEET_NAME};
use crate::error::SyncError;
use crate::model::row::HEADERS;
use anyhow::Context;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use tracing::trace;

/// A `Sheet` that holds its tabs in memory. Clones share the same data, so a test can keep one
/// clone to inspect what a gateway wrote through another.
#[derive(Debug, Clone)]
pub struct MemorySheet {
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    /// Tab name to rows, starting with the header row.
    tabs: HashMap<String, Vec<Vec<String>>>,
    /// When set, every call fails with this error.
    failure: Option<SyncError>,
}

impl MemorySheet {
    /// Creates a sheet with no tabs.
    pub fn empty() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Creates a sheet with a single tab holding the header row followed by `rows`.
    pub fn with_rows<S, R>(tab: &str, rows: impl IntoIterator<Item = R>) -> Self
    where
        S: Into<String>,
        R: IntoIterator<Item = S>,
    {
        let sheet = Self::empty();
        let mut all = vec![HEADERS.iter().map(|h| h.to_string()).collect::<Vec<_>>()];
        all.extend(
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect()),
        );
        sheet.lock_ignoring_failure().tabs.insert(tab.to_string(), all);
        sheet
    }

    /// A copy of every row of `tab`, header included. Empty when the tab does not exist.
    pub fn rows(&self, tab: &str) -> Vec<Vec<String>> {
        self.lock_ignoring_failure()
            .tabs
            .get(tab)
            .cloned()
            .unwrap_or_default()
    }

    /// Makes every following call fail with `failure`, or succeed again with `None`.
    pub fn fail_with(&self, failure: Option<SyncError>) {
        self.lock_ignoring_failure().failure = failure;
    }

    fn lock_ignoring_failure(&self) -> std::sync::MutexGuard<'_, State> {
        // The state is only ever replaced field by field, a poisoned lock still holds usable data.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, SyncError> {
        let state = self.lock_ignoring_failure();
        if let Some(failure) = state.failure.clone() {
            return Err(failure);
        }
        Ok(state)
    }
}

impl Default for MemorySheet {
    /// Loads seed data from this module.
    fn default() -> Self {
        Self::seeded()
    }
}

#[async_trait::async_trait]
impl Sheet for MemorySheet {
    async fn get(&mut self, range: &str) -> Result<Vec<Vec<String>>, SyncError> {
        trace!("get {range}");
        let range = Range::parse(range)?;
        let state = self.lock()?;
        let rows = state
            .tabs
            .get(range.tab)
            .ok_or_else(|| SyncError::Malformed(format!("Tab '{}' not found", range.tab)))?;
        Ok(rows
            .iter()
            .skip(range.first_row - 1)
            .map(|row| range.columns(row))
            .collect())
    }

    async fn append(&mut self, range: &str, rows: &[Vec<String>]) -> Result<(), SyncError> {
        trace!("append {} rows to {range}", rows.len());
        let range = Range::parse(range)?;
        let mut state = self.lock()?;
        let tab = state
            .tabs
            .get_mut(range.tab)
            .ok_or_else(|| SyncError::Malformed(format!("Tab '{}' not found", range.tab)))?;
        tab.extend(rows.iter().cloned());
        Ok(())
    }
}

/// The parts of an A1 range such as `Finanzas!A2:I` that the in-memory sheet understands.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct Range<'a> {
    tab: &'a str,
    /// One-based.
    first_row: usize,
    /// One-based.
    first_column: usize,
    /// One-based, inclusive. `None` means no limit.
    last_column: Option<usize>,
}

impl<'a> Range<'a> {
    fn parse(range: &'a str) -> Result<Self, SyncError> {
        let malformed = || SyncError::Malformed(format!("Unable to parse range '{range}'"));
        let (tab, cells) = range.split_once('!').ok_or_else(malformed)?;
        let (start, end) = match cells.split_once(':') {
            Some((start, end)) => (start, Some(end)),
            None => (cells, None),
        };
        let (first_column, first_row) = split_cell(start).ok_or_else(malformed)?;
        let last_column = match end {
            Some(end) => Some(split_cell(end).ok_or_else(malformed)?.0),
            None => None,
        };
        Ok(Self {
            tab,
            first_row: first_row.unwrap_or(1),
            first_column,
            last_column,
        })
    }

    fn columns(&self, row: &[String]) -> Vec<String> {
        let end = self
            .last_column
            .map_or(row.len(), |last| last.min(row.len()));
        row.get(self.first_column - 1..end)
            .map(|cells| cells.to_vec())
            .unwrap_or_default()
    }
}

/// Splits a cell reference like `A2` into its one-based column number and optional row number.
fn split_cell(cell: &str) -> Option<(usize, Option<usize>)> {
    let digits_at = cell
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(cell.len());
    let (letters, digits) = cell.split_at(digits_at);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let column = letters.chars().try_fold(0usize, |n, c| {
        let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
        n.checked_mul(26)?.checked_add(digit)
    })?;
    let row = if digits.is_empty() {
        None
    } else {
        match digits.parse::<usize>() {
            Ok(row) if row > 0 => Some(row),
            _ => return None,
        }
    };
    Some((column, row))
}

impl MemorySheet {
    /// Creates a sheet whose default tab is seeded with `SEED_DATA`.
    pub fn seeded() -> Self {
        let sheet = Self::empty();
        let rows = load_csv(SEED_DATA).unwrap_or_default();
        sheet
            .lock_ignoring_failure()
            .tabs
            .insert(DEFAULT_SHEET_NAME.to_string(), rows);
        sheet
    }
}

/// Loads rows from a CSV-formatted string.
fn load_csv(csv_data: &str) -> crate::Result<Vec<Vec<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(Cursor::new(csv_data.as_bytes()));

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.context("Unable to read seed data")?;
        rows.push(record.iter().map(|field| field.to_string()).collect());
    }
    Ok(rows)
}

/// Seed movement data, header included.
const SEED_DATA: &str = r##"ID,Fecha,Tipo,Categoría,Concepto,Importe,Frecuencia,Impacto_Mensual,Conjunto
1,01/09/2025,Ingreso,Ingresos,Nómina,2150.00,Mensual,2150.00,FALSE
2,01/09/2025,Gasto,Vivienda,Alquiler,450.00,Mensual,450.00,TRUE
3,03/09/2025,Gasto,Comida,Mercadona,64.30,Puntual,64.30,FALSE
4,10/09/2025,Gasto,Seguros,Seguro coche,420.00,Anual,35,FALSE
5,15/09/2025,Gasto,Transporte,Abono transporte,21.80,Mensual,21.80,FALSE
6,01/10/2025,Ingreso,Ingresos,Nómina,2150.00,Mensual,2150.00,FALSE
7,01/10/2025,Gasto,Vivienda,Alquiler,450.00,Mensual,450.00,TRUE
8,04/10/2025,Gasto,Comida,Frutería,18.45,Puntual,18.45,FALSE
9,12/10/2025,Gasto,Ahorro,Hucha vacaciones,100.00,Puntual,100.00,FALSE
"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        let range = Range::parse("Finanzas!A2:I").unwrap();
        assert_eq!(range.tab, "Finanzas");
        assert_eq!(range.first_row, 2);
        assert_eq!(range.first_column, 1);
        assert_eq!(range.last_column, Some(9));

        let range = Range::parse("Other!B:AA").unwrap();
        assert_eq!(range.first_row, 1);
        assert_eq!(range.first_column, 2);
        assert_eq!(range.last_column, Some(27));

        assert!(Range::parse("A2:I").is_err());
        assert!(Range::parse("Finanzas!2:I").is_err());
        assert!(Range::parse("Finanzas!A0:I").is_err());
    }

    #[test]
    fn test_split_cell_rejects_overflowing_columns() {
        assert_eq!(split_cell("AA10"), Some((27, Some(10))));
        let long = "Z".repeat(40);
        assert_eq!(split_cell(&long), None);
        assert!(Range::parse(&format!("Finanzas!A2:{long}")).is_err());
    }

    #[tokio::test]
    async fn test_get_skips_header_and_limits_columns() {
        let mut sheet = MemorySheet::with_rows(
            "Finanzas",
            vec![vec!["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"]],
        );
        let rows = sheet.get("Finanzas!A2:I").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 9);
        assert_eq!(rows[0][8], "9");
    }

    #[tokio::test]
    async fn test_append_is_shared_between_clones() {
        let sheet = MemorySheet::with_rows("Finanzas", Vec::<Vec<String>>::new());
        let mut writer = sheet.clone();
        writer
            .append("Finanzas!A2:I", &[vec!["a".to_string()]])
            .await
            .unwrap();
        let rows = sheet.rows("Finanzas");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_tab_is_malformed() {
        let mut sheet = MemorySheet::empty();
        let result = sheet.get("Nope!A2:I").await;
        assert!(matches!(result, Err(SyncError::Malformed(_))));
        let result = sheet.append("Nope!A2:I", &[]).await;
        assert!(matches!(result, Err(SyncError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_fail_with() {
        let mut sheet = MemorySheet::seeded();
        sheet.fail_with(Some(SyncError::Unreachable("offline".to_string())));
        let result = sheet.get("Finanzas!A2:I").await;
        assert_eq!(result, Err(SyncError::Unreachable("offline".to_string())));
        sheet.fail_with(None);
        assert!(sheet.get("Finanzas!A2:I").await.is_ok());
    }

    #[test]
    fn test_seed_data_loads() {
        let rows = MemorySheet::seeded().rows(DEFAULT_SHEET_NAME);
        assert_eq!(rows[0], HEADERS.to_vec());
        assert_eq!(rows.len(), 10);
    }
}
