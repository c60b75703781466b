//! Whitespace post-processing of rendered SQL.

use crate::config::DbConfig;
use regex::Regex;
use std::sync::OnceLock;

fn trailing_newline() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*\r?\n").expect("static regex"))
}

fn surrounded_newline() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*\r?\n\s*").expect("static regex"))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SqlFormat {
    /// Fold every line break (and the whitespace around it) into one space.
    SingleLine,
    /// Drop trailing whitespace and blank lines.
    #[default]
    RemoveEmptyLines,
    Verbatim,
}

impl SqlFormat {
    /// `replace_newline_with_space` takes priority over `remove_empty_line`.
    pub fn from_flags(replace_newline_with_space: bool, remove_empty_line: bool) -> Self {
        if replace_newline_with_space {
            SqlFormat::SingleLine
        } else if remove_empty_line {
            SqlFormat::RemoveEmptyLines
        } else {
            SqlFormat::Verbatim
        }
    }

    pub fn from_config(db: &DbConfig) -> Self {
        Self::from_flags(db.replace_newline_with_space, db.remove_empty_line)
    }

    pub fn apply(self, sql: String) -> String {
        match self {
            SqlFormat::SingleLine => surrounded_newline().replace_all(&sql, " ").trim().to_string(),
            SqlFormat::RemoveEmptyLines => trailing_newline().replace_all(&sql, "\n").into_owned(),
            SqlFormat::Verbatim => sql,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQL: &str = "\n  select id,   \n\n    name\r\n  from users  \n";

    #[test]
    fn single_line_collapses_and_trims() {
        assert_eq!(SqlFormat::SingleLine.apply(SQL.into()), "select id, name from users");
    }

    #[test]
    fn remove_empty_lines_keeps_indentation() {
        assert_eq!(
            SqlFormat::RemoveEmptyLines.apply(SQL.into()),
            "\n  select id,\n    name\n  from users\n"
        );
    }

    #[test]
    fn newline_collapse_wins_over_empty_line_removal() {
        assert_eq!(SqlFormat::from_flags(true, true), SqlFormat::SingleLine);
        assert_eq!(SqlFormat::from_flags(false, true), SqlFormat::RemoveEmptyLines);
        assert_eq!(SqlFormat::from_flags(false, false), SqlFormat::Verbatim);
    }
}
