//! A plain-text picture of the household's finances, meant to be handed to a chat assistant as
//! background for its answers.

use crate::model::row::DATE_FORMAT;
use crate::model::Movement;
use crate::summary::Summary;
use chrono::{Datelike, NaiveDate};

const JOINT_MARK: &str = " [conjunto]";

/// The summary of the month `today` falls in, followed by every movement, newest first.
pub fn snapshot(movements: &[Movement], today: NaiveDate) -> String {
    let summary = Summary::for_month(movements, today.year(), today.month());
    let mut sorted: Vec<&Movement> = movements.iter().collect();
    sorted.sort_by(|a, b| b.date().cmp(&a.date()));

    let mut text = format!("{summary}\n\nMovements ({}):\n", sorted.len());
    for movement in sorted {
        text.push_str(&line(movement));
        text.push('\n');
    }
    text
}

fn line(m: &Movement) -> String {
    format!(
        "{} | {} | {} | {} | {} | {} | impact {}{}",
        m.date().format(DATE_FORMAT),
        m.kind(),
        m.category(),
        m.label(),
        m.gross_amount().display_euros(),
        m.frequency(),
        m.monthly_impact().display_euros(),
        if m.is_joint() { JOINT_MARK } else { "" }
    )
}
