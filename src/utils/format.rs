use chrono::{Datelike, NaiveDateTime, Timelike};

/// Wire and display format for event dates, day first.
pub const DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Extended Italian month names, indexed by zero-based month.
const MONTH_NAMES: [&str; 12] = [
    "Gennaio",
    "Febbraio",
    "Marzo",
    "Aprile",
    "Maggio",
    "Giugno",
    "Luglio",
    "Agosto",
    "Settembre",
    "Ottobre",
    "Novembre",
    "Dicembre",
];

pub fn format_date(time: NaiveDateTime) -> String {
    time.format(DATE_FORMAT).to_string()
}

pub fn parse_date(input: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(input.trim(), DATE_FORMAT)
}

/// Conversational rendering with the month spelled out:
/// "20:00, 31 Dicembre 25".
pub fn format_spoken(time: NaiveDateTime) -> String {
    format!(
        "{:02}:{:02}, {:02} {} {:02}",
        time.hour(),
        time.minute(),
        time.day(),
        MONTH_NAMES[time.month0() as usize],
        time.year() % 100
    )
}

/// Minor currency units rendered in major units: 1500 becomes "€15.00".
pub fn format_euro(minor: i64) -> String {
    format!("€{}.{:02}", minor / 100, minor % 100)
}
