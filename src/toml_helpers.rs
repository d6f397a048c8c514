// Shared by the registry and persistence loaders.

use crate::error::ZWaveError;

/// Pull `(line, column)` out of a TOML parser message of the form
/// "... line N, column M ...".
#[must_use]
pub fn extract_line_col_from_msg(msg: &str) -> Option<(usize, usize)> {
    fn leading_number(s: &str) -> Option<usize> {
        let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        s[..end].parse().ok()
    }
    let after_line = &msg[msg.find("line ")? + 5..];
    let line = leading_number(after_line)?;
    let after_col = &after_line[after_line.find("column ")? + 7..];
    Some((line, leading_number(after_col)?))
}

/// Wrap a TOML error as `ZWaveError::Protocol`, naming the file and position.
pub(crate) fn toml_error(file: &str, e: &impl std::fmt::Display) -> ZWaveError {
    let s = e.to_string();
    match extract_line_col_from_msg(&s) {
        Some((line, col)) => ZWaveError::Protocol(format!("{file} parse error at {line}:{col}: {s}")),
        None => ZWaveError::Protocol(format!("{file} parse error: {s}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_line_and_column() {
        assert_eq!(
            extract_line_col_from_msg("TOML parse error at line 3, column 7\n  |"),
            Some((3, 7))
        );
        assert_eq!(extract_line_col_from_msg("no position here"), None);
        assert_eq!(extract_line_col_from_msg("line x column 2"), None);
    }
}
