//! Field parsing: `name:value` strings into property assignments

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::entities::PropertyAssignment;
use crate::domain::error::{DomainError, DomainResult};

/// Marker replacing line breaks so rich-text fields keep their visual breaks.
pub const LINE_BREAK: &str = "<br />";

fn line_break_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\r\n?|\n").expect("static regex"))
}

/// Replace every CRLF, CR or LF with [`LINE_BREAK`].
pub fn normalize_line_breaks(value: &str) -> String {
    line_break_regex().replace_all(value, LINE_BREAK).into_owned()
}

impl PropertyAssignment {
    /// Parse one raw field. Only the first `:` delimits, the value may contain more.
    ///
    /// The name is kept verbatim, so a padded name will not match any property.
    /// Returns `Ok(None)` when the name or the value is blank, and
    /// [`DomainError::NoDelimiter`] when there is no colon at all.
    pub fn parse(raw: &str) -> DomainResult<Option<Self>> {
        let (name, value) = raw
            .split_once(':')
            .ok_or_else(|| DomainError::NoDelimiter(raw.to_string()))?;

        if name.trim().is_empty() || value.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(Self {
            name: name.to_string(),
            value: normalize_line_breaks(value),
        }))
    }
}
