//! The raw input of a movement and the rules that turn it into a `Movement`.

use crate::model::{Amount, Frequency, Kind, Movement};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// What the user typed when recording a movement. Nothing here has been checked or normalized
/// yet; `amount` in particular may be empty or not a number at all.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Draft {
    /// Left empty for a new movement.
    #[serde(default)]
    pub id: String,
    pub date: NaiveDate,
    pub kind: Kind,
    pub category: String,
    pub label: String,
    /// The amount as typed. For a joint expense this is the full amount before splitting.
    pub amount: String,
    pub frequency: Frequency,
    /// The typed amount is shared with another person. Only meaningful for expenses.
    #[serde(default)]
    pub is_joint: bool,
}

/// The reasons a draft is not ready to be saved.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum DraftError {
    #[error("The concept cannot be empty")]
    EmptyLabel,
    #[error("The category cannot be empty")]
    EmptyCategory,
    #[error("The amount cannot be empty")]
    EmptyAmount,
}

impl Draft {
    /// A one-off expense dated `date` with every text field empty.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            id: String::new(),
            date,
            kind: Kind::default(),
            category: String::new(),
            label: String::new(),
            amount: String::new(),
            frequency: Frequency::default(),
            is_joint: false,
        }
    }

    /// Checks that the fields a saved movement needs have been filled in. A draft that fails this
    /// check can still be built, it just should not be saved.
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.label.trim().is_empty() {
            return Err(DraftError::EmptyLabel);
        }
        if self.category.trim().is_empty() {
            return Err(DraftError::EmptyCategory);
        }
        if self.amount.trim().is_empty() {
            return Err(DraftError::EmptyAmount);
        }
        Ok(())
    }

    /// Normalizes the draft into a `Movement`. This never fails: an amount that cannot be read
    /// counts as zero.
    ///
    /// The joint split happens before the monthly impact is derived, so a joint yearly expense
    /// of 1200 has a gross amount of 600 and a monthly impact of 50.
    pub fn build(&self) -> Movement {
        let (typed, fallback) = Amount::parse(&self.amount).into_parts();
        if fallback {
            debug!("Amount '{}' is not a number, using zero", self.amount);
        }
        let gross = match self.kind {
            Kind::Expense if self.is_joint => typed.half(),
            Kind::Expense | Kind::Income => typed,
        };
        Movement::new(
            self.id.clone(),
            self.date,
            self.kind,
            self.category.trim(),
            self.label.trim(),
            gross,
            self.frequency,
            self.is_joint,
        )
    }
}
