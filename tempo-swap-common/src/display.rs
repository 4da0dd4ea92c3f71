use std::fmt::{Display, Formatter};

/// Wrapper that makes `Option<T>` implement `Display`, rendering `None` as a placeholder.
pub struct DisplayOption<'a, T>(pub &'a Option<T>, pub &'static str);

impl<'a, T: Display> Display for DisplayOption<'a, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(inner) => write!(f, "{}", inner),
            None => write!(f, "{}", self.1),
        }
    }
}

/// Returns the first line of a (possibly multi-line) message, trimmed.
///
/// Wallets and nodes tend to append request dumps and stack traces to their error messages;
/// only the leading line is meant for a human.
pub fn first_line(message: &str) -> &str {
    message
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
}

/// Abbreviates a hex string such as an address or hash to `0x1234…abcd`.
pub fn short_hex(value: &impl Display) -> String {
    let full = value.to_string();
    if full.len() <= 12 {
        return full;
    }
    format!("{}…{}", &full[..6], &full[full.len() - 4..])
}
