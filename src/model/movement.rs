use crate::model::{Amount, Draft};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Whether money came in or went out. The serialized names are the ones written to the sheet.
#[derive(
    Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub enum Kind {
    #[serde(rename = "Ingreso")]
    Income,
    #[default]
    #[serde(rename = "Gasto")]
    Expense,
}

serde_plain::derive_display_from_serialize!(Kind);
serde_plain::derive_fromstr_from_deserialize!(Kind);

/// How often a movement happens. The serialized names are the ones written to the sheet.
#[derive(
    Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub enum Frequency {
    #[default]
    #[serde(rename = "Puntual")]
    OneOff,
    #[serde(rename = "Mensual")]
    Monthly,
    #[serde(rename = "Anual")]
    Yearly,
}

serde_plain::derive_display_from_serialize!(Frequency);
serde_plain::derive_fromstr_from_deserialize!(Frequency);

impl Frequency {
    /// The share of `gross` that lands in a single month. A one-off movement counts in full in the
    /// month it happened and a yearly one is spread evenly over twelve months.
    pub fn monthly_impact(&self, gross: Amount) -> Amount {
        match self {
            Frequency::OneOff | Frequency::Monthly => gross,
            Frequency::Yearly => gross.split(12),
        }
    }
}

/// One income or expense, as it is stored in the sheet.
///
/// A `Movement` cannot be changed once it exists. Its monthly impact is always derived from its
/// gross amount and frequency, so there is no way to set it. To edit a movement, turn it back into
/// a `Draft` with `to_draft`, change the draft and build a new `Movement`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Movement {
    id: String,
    date: NaiveDate,
    kind: Kind,
    category: String,
    label: String,
    gross_amount: Amount,
    frequency: Frequency,
    monthly_impact: Amount,
    is_joint: bool,
}

impl Movement {
    /// Assembles a movement from values that are already normalized. `gross_amount` must already
    /// be the halved amount of a joint expense. Only expenses can be joint.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: impl Into<String>,
        date: NaiveDate,
        kind: Kind,
        category: impl Into<String>,
        label: impl Into<String>,
        gross_amount: Amount,
        frequency: Frequency,
        is_joint: bool,
    ) -> Self {
        Self {
            id: id.into(),
            date,
            kind,
            category: category.into(),
            label: label.into(),
            gross_amount,
            frequency,
            monthly_impact: frequency.monthly_impact(gross_amount),
            is_joint: is_joint && kind == Kind::Expense,
        }
    }

    /// An empty id means the movement has not been given one yet.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The amount that is really attributable to this household, after a joint split.
    pub fn gross_amount(&self) -> Amount {
        self.gross_amount
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn monthly_impact(&self) -> Amount {
        self.monthly_impact
    }

    pub fn is_joint(&self) -> bool {
        self.is_joint
    }

    pub fn is_income(&self) -> bool {
        self.kind == Kind::Income
    }

    pub fn is_expense(&self) -> bool {
        self.kind == Kind::Expense
    }

    /// True when the movement is dated in the given month.
    pub fn in_month(&self, year: i32, month: u32) -> bool {
        self.date.year() == year && self.date.month() == month
    }

    /// Reconstructs the input that builds this movement. A joint expense gets its full, unsplit
    /// amount back.
    pub fn to_draft(&self) -> Draft {
        let typed = if self.is_joint {
            self.gross_amount.double()
        } else {
            self.gross_amount
        };
        Draft {
            id: self.id.clone(),
            date: self.date,
            kind: self.kind,
            category: self.category.clone(),
            label: self.label.clone(),
            amount: typed.to_string(),
            frequency: self.frequency,
            is_joint: self.is_joint,
        }
    }
}
