//! Monthly figures derived from a list of movements.

use crate::model::{Amount, Movement};
use chrono::Datelike;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// The figures for one calendar month.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Summary {
    pub year: i32,
    pub month: u32,
    /// Gross income dated in the month.
    pub income: Amount,
    /// Gross expenses dated in the month, as they left the account.
    pub cash_expenses: Amount,
    /// The monthly impact of every expense in the data, spread over the months the data covers.
    pub prorated_expense: Amount,
    /// The part of `cash_expenses` that is our share of joint expenses.
    pub joint_expenses: Amount,
}

impl Summary {
    pub fn for_month(movements: &[Movement], year: i32, month: u32) -> Self {
        let in_month = || movements.iter().filter(move |m| m.in_month(year, month));
        let income = in_month()
            .filter(|m| m.is_income())
            .map(Movement::gross_amount)
            .sum();
        let cash_expenses = in_month()
            .filter(|m| m.is_expense())
            .map(Movement::gross_amount)
            .sum();
        let joint_expenses = in_month()
            .filter(|m| m.is_expense() && m.is_joint())
            .map(Movement::gross_amount)
            .sum();

        let periods: BTreeSet<(i32, u32)> = movements
            .iter()
            .map(|m| (m.date().year(), m.date().month()))
            .collect();
        let prorated_expense = movements
            .iter()
            .filter(|m| m.is_expense())
            .map(Movement::monthly_impact)
            .sum::<Amount>()
            .split(periods.len().max(1) as u32);

        Self {
            year,
            month,
            income,
            cash_expenses,
            prorated_expense,
            joint_expenses,
        }
    }

    /// What is left of the month's income after the prorated expense. Negative when spending
    /// outpaces income.
    pub fn savings_capacity(&self) -> Decimal {
        self.income.value() - self.prorated_expense.value()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let savings = self.savings_capacity();
        let savings = match Amount::new(savings.abs()) {
            Some(amount) if savings.is_sign_negative() && !savings.is_zero() => {
                format!("-{}", amount.display_euros())
            }
            Some(amount) => amount.display_euros(),
            None => savings.to_string(),
        };
        writeln!(f, "Month: {:02}/{}", self.month, self.year)?;
        writeln!(f, "Income: {}", self.income.display_euros())?;
        writeln!(f, "Cash expenses: {}", self.cash_expenses.display_euros())?;
        writeln!(
            f,
            "Prorated expense: {}",
            self.prorated_expense.display_euros()
        )?;
        writeln!(f, "Joint expenses: {}", self.joint_expenses.display_euros())?;
        write!(f, "Savings capacity: {savings}")
    }
}
