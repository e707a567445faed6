//! Maps a `Movement` to and from a row of spreadsheet cells.
//!
//! | idx | field          | text                           |
//! |-----|----------------|--------------------------------|
//! | 0   | id             | as-is                          |
//! | 1   | date           | `DD/MM/YYYY`                   |
//! | 2   | kind           | `Ingreso` / `Gasto`            |
//! | 3   | category       | as-is                          |
//! | 4   | label          | as-is                          |
//! | 5   | gross amount   | decimal with a `.` separator   |
//! | 6   | frequency      | `Mensual` / `Anual` / `Puntual`|
//! | 7   | monthly impact | decimal with a `.` separator   |
//! | 8   | joint          | `TRUE` / `FALSE`, optional     |
//!
//! Encoding cannot fail. Decoding is lenient: a row only fails when it is too short, and any
//! cell that cannot be read is replaced with a fallback value. The columns that needed a fallback
//! are reported alongside the movement so that a strict caller can refuse the row.

use crate::model::{Amount, Frequency, Kind, Movement, Parsed};
use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

pub const ID_IDX: usize = 0;
pub const DATE_IDX: usize = 1;
pub const KIND_IDX: usize = 2;
pub const CATEGORY_IDX: usize = 3;
pub const LABEL_IDX: usize = 4;
pub const GROSS_AMOUNT_IDX: usize = 5;
pub const FREQUENCY_IDX: usize = 6;
pub const MONTHLY_IMPACT_IDX: usize = 7;
pub const JOINT_IDX: usize = 8;

/// Rows shorter than this are rejected. The joint column is optional.
pub const MIN_CELLS: usize = 8;

/// The number of cells written by `encode`.
pub const ROW_WIDTH: usize = 9;

/// The header row of the sheet, in column order.
pub const HEADERS: [&str; ROW_WIDTH] = [
    "ID",
    "Fecha",
    "Tipo",
    "Categoría",
    "Concepto",
    "Importe",
    "Frecuencia",
    "Impacto_Mensual",
    "Conjunto",
];

/// Dates are stored day first, e.g. `31/01/2025`.
pub const DATE_FORMAT: &str = "%d/%m/%Y";
const TRUE: &str = "TRUE";
const FALSE: &str = "FALSE";

/// A stored monthly impact that differs from the derived one by no more than half a cent was
/// written by a client that rounds differently, and is not treated as a correction.
const IMPACT_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 3);

/// The columns of a movement row.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Id,
    Date,
    Kind,
    Category,
    Label,
    GrossAmount,
    Frequency,
    MonthlyImpact,
    Joint,
}

serde_plain::derive_display_from_serialize!(Column);
serde_plain::derive_fromstr_from_deserialize!(Column);

impl Column {
    /// The zero-based cell index of the column.
    pub fn index(&self) -> usize {
        match self {
            Column::Id => ID_IDX,
            Column::Date => DATE_IDX,
            Column::Kind => KIND_IDX,
            Column::Category => CATEGORY_IDX,
            Column::Label => LABEL_IDX,
            Column::GrossAmount => GROSS_AMOUNT_IDX,
            Column::Frequency => FREQUENCY_IDX,
            Column::MonthlyImpact => MONTHLY_IMPACT_IDX,
            Column::Joint => JOINT_IDX,
        }
    }
}

/// Why a row did not produce a movement.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum RowError {
    #[error("The row has {found} cells, at least {} are required", MIN_CELLS)]
    TooShort { found: usize },

    #[error("Strict decoding refused the row, unreadable columns: {}", list(.0))]
    Corrected(Vec<Column>),
}

fn list(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// How much a decoded row is allowed to have been patched up.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// Unreadable cells are replaced by fallbacks and the row is kept.
    #[default]
    Lenient,
    /// Any row that needed a fallback is refused.
    Strict,
}

impl DecodePolicy {
    pub fn accept(&self, row: DecodedRow) -> Result<DecodedRow, RowError> {
        match self {
            DecodePolicy::Strict if row.is_corrected() => Err(RowError::Corrected(row.corrected)),
            _ => Ok(row),
        }
    }
}

/// A movement read from a row, together with the columns whose contents had to be replaced.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DecodedRow {
    movement: Movement,
    corrected: Vec<Column>,
}

impl DecodedRow {
    pub fn movement(&self) -> &Movement {
        &self.movement
    }

    pub fn into_movement(self) -> Movement {
        self.movement
    }

    /// The columns that could not be read as-is, in column order.
    pub fn corrected(&self) -> &[Column] {
        &self.corrected
    }

    pub fn is_corrected(&self) -> bool {
        !self.corrected.is_empty()
    }
}

/// Writes `movement` as a row of `ROW_WIDTH` cells.
pub fn encode(movement: &Movement) -> Vec<String> {
    vec![
        movement.id().to_string(),
        movement.date().format(DATE_FORMAT).to_string(),
        movement.kind().to_string(),
        movement.category().to_string(),
        movement.label().to_string(),
        movement.gross_amount().to_string(),
        movement.frequency().to_string(),
        movement.monthly_impact().to_string(),
        if movement.is_joint() { TRUE } else { FALSE }.to_string(),
    ]
}

/// Reads a movement from a row of cells. An unreadable date becomes today's date.
pub fn decode<S: AsRef<str>>(cells: &[S]) -> Result<DecodedRow, RowError> {
    decode_on(cells, Local::now().date_naive())
}

/// Like `decode`, with `today` as the fallback date.
pub(crate) fn decode_on<S: AsRef<str>>(
    cells: &[S],
    today: NaiveDate,
) -> Result<DecodedRow, RowError> {
    if cells.len() < MIN_CELLS {
        return Err(RowError::TooShort { found: cells.len() });
    }
    let cell = |ix: usize| cells[ix].as_ref();
    let mut corrected = Vec::new();
    let mut check = |column: Column, fallback: bool| {
        if fallback {
            corrected.push(column);
        }
    };

    let (date, fallback) = parse_date(cell(DATE_IDX), today).into_parts();
    check(Column::Date, fallback);

    let (kind, fallback) = parse_kind(cell(KIND_IDX)).into_parts();
    check(Column::Kind, fallback);

    let (gross_amount, fallback) = Amount::parse(cell(GROSS_AMOUNT_IDX)).into_parts();
    check(Column::GrossAmount, fallback);

    let (frequency, fallback) = parse_frequency(cell(FREQUENCY_IDX)).into_parts();
    check(Column::Frequency, fallback);

    let derived = frequency.monthly_impact(gross_amount);
    let stored = Amount::parse(cell(MONTHLY_IMPACT_IDX));
    let disagrees = (stored.value().value() - derived.value()).abs() > IMPACT_TOLERANCE;
    check(Column::MonthlyImpact, stored.is_fallback() || disagrees);

    let (is_joint, fallback) = parse_joint(cells.get(JOINT_IDX).map(|c| c.as_ref())).into_parts();
    check(Column::Joint, fallback || (is_joint && kind == Kind::Income));

    let movement = Movement::new(
        cell(ID_IDX),
        date,
        kind,
        cell(CATEGORY_IDX),
        cell(LABEL_IDX),
        gross_amount,
        frequency,
        is_joint,
    );
    Ok(DecodedRow {
        movement,
        corrected,
    })
}

fn parse_date(s: &str, today: NaiveDate) -> Parsed<NaiveDate> {
    match NaiveDate::parse_from_str(s.trim(), DATE_FORMAT) {
        Ok(date) => Parsed::exact(date),
        Err(_) => Parsed::fallback(today),
    }
}

/// Anything but `Ingreso` is an expense.
fn parse_kind(s: &str) -> Parsed<Kind> {
    match Kind::from_str(s) {
        Ok(kind) => Parsed::exact(kind),
        Err(_) => Parsed::fallback(Kind::Expense),
    }
}

/// Anything unrecognized is a one-off.
fn parse_frequency(s: &str) -> Parsed<Frequency> {
    match Frequency::from_str(s) {
        Ok(frequency) => Parsed::exact(frequency),
        Err(_) => Parsed::fallback(Frequency::OneOff),
    }
}

/// Only `TRUE` is joint. A missing cell is an ordinary `false`.
fn parse_joint(s: Option<&str>) -> Parsed<bool> {
    match s {
        Some(TRUE) => Parsed::exact(true),
        Some(FALSE) | None => Parsed::exact(false),
        Some(_) => Parsed::fallback(false),
    }
}
