use chrono::NaiveDate;

/// Canonical header key: invisible marks dropped, whitespace removed, lower-cased.
pub(crate) fn normalize_header(value: &str) -> String {
    value
        .replace(['\u{feff}', '\u{200b}'], "")
        .split_whitespace()
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Trimmed cell content, `None` when blank.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

pub(crate) fn parse_resident_flag(value: Option<&str>) -> bool {
    non_empty(value).is_some_and(|value| {
        value.eq_ignore_ascii_case("yes") || value.eq_ignore_ascii_case("true")
    })
}

pub(crate) fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}
