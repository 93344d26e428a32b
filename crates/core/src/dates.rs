//! Conversions between the API's `dd/mm/yyyy` dates and form `yyyy-mm-dd` dates.

use chrono::NaiveDate;
use tracing::warn;

const DISPLAY_FORMAT: &str = "%d/%m/%Y";
const INPUT_FORMAT: &str = "%Y-%m-%d";

/// Convert a server `dd/mm/yyyy` date into the `yyyy-mm-dd` form-field value.
///
/// Values that are not a valid `dd/mm/yyyy` calendar date are returned
/// trimmed but otherwise untouched so the operator can still fix them.
pub fn to_input(display: &str) -> String {
    let trimmed = display.trim();
    match NaiveDate::parse_from_str(trimmed, DISPLAY_FORMAT) {
        Ok(date) => date.format(INPUT_FORMAT).to_string(),
        Err(err) => {
            if !trimmed.is_empty() {
                warn!(value = trimmed, %err, "unrecognised birth date format");
            }
            trimmed.to_string()
        }
    }
}

/// Convert a `yyyy-mm-dd` form-field value back into `dd/mm/yyyy`.
pub fn to_display(input: &str) -> Option<String> {
    NaiveDate::parse_from_str(input.trim(), INPUT_FORMAT)
        .ok()
        .map(|date| date.format(DISPLAY_FORMAT).to_string())
}
