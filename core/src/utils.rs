//! Utility functions and types.

use std::fmt::Debug;

/// Redacts a secret for `Debug` output.
///
/// Values shorter than 12 characters are fully hidden. Longer values keep
/// their first and last three characters so that two different secrets can
/// still be told apart in logs.
pub struct Redact<'a>(Option<&'a str>);

impl<'a> From<&'a str> for Redact<'a> {
    fn from(value: &'a str) -> Self {
        Redact(Some(value))
    }
}

impl<'a> From<&'a String> for Redact<'a> {
    fn from(value: &'a String) -> Self {
        Redact(Some(value.as_str()))
    }
}

impl<'a> From<&'a Option<String>> for Redact<'a> {
    fn from(value: &'a Option<String>) -> Self {
        Redact(value.as_deref())
    }
}

impl Debug for Redact<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self.0 {
            None | Some("") => return f.write_str("EMPTY"),
            Some(v) => v,
        };

        let length = value.len();
        if length < 12 || !value.is_char_boundary(3) || !value.is_char_boundary(length - 3) {
            f.write_str("***")
        } else {
            write!(f, "{}***{}", &value[..3], &value[length - 3..])
        }
    }
}
