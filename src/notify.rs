//! Message helpers for the notification collaborator.
//!
//! Delivery itself happens elsewhere. These functions decide which outages a
//! subscriber should hear about and how the update text reads.

use chrono::{Duration, NaiveDate};
use std::fmt;

use crate::detection::{OnOffInterval, PowerState};

/// How a schedule's date is named relative to the reader's current date.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DayLabel {
    Today,
    Tomorrow,
    Date(NaiveDate),
}

impl fmt::Display for DayLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayLabel::Today => f.write_str("сьогодні"),
            DayLabel::Tomorrow => f.write_str("завтра"),
            DayLabel::Date(date) => write!(f, "{}", date.format("%d.%m.%Y")),
        }
    }
}

pub fn day_label(date: NaiveDate, today: NaiveDate) -> DayLabel {
    if date == today {
        DayLabel::Today
    } else if date == today + Duration::days(1) {
        DayLabel::Tomorrow
    } else {
        DayLabel::Date(date)
    }
}

/// Outage intervals worth announcing.
///
/// For today's schedule, outages that already ended before `now_hour` are
/// dropped; one in progress is kept.
pub fn upcoming_outages(
    intervals: &[OnOffInterval],
    label: DayLabel,
    now_hour: u8,
) -> Vec<OnOffInterval> {
    intervals
        .iter()
        .filter(|interval| interval.state() == PowerState::Off)
        .filter(|interval| match label {
            DayLabel::Today => interval.start_hour() >= now_hour || interval.contains(now_hour),
            _ => true,
        })
        .copied()
        .collect()
}

/// Text of the update sent to subscribers of `group`.
pub fn format_update(group: &str, label: DayLabel, outages: &[OnOffInterval]) -> String {
    let mut text = format!(
        "❗️В групі {} змінився графік відключень на {}.\n",
        group, label
    );
    if outages.is_empty() {
        text.push_str("🟢Відключень немає");
    } else {
        let listed = outages
            .iter()
            .map(|interval| interval.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        text.push_str(&format!("🔴Наступні відключення: {}\n", listed));
    }
    text
}
