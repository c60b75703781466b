//! Column-name case conversion for output field names.

use crate::error::ConfigError;
use std::str::FromStr;

/// Naming strategy applied to a column name that has no explicit mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameCase {
    /// `UserId`
    Camel,
    /// `userId`
    LowerCamel,
    /// `user_id`
    Snake,
    /// `USER_ID`
    ScreamingSnake,
    /// `user-id`
    Kebab,
    /// `USER-ID`
    ScreamingKebab,
    /// `user.id`
    DotDelimited,
    /// `USER.ID`
    DotScreamingDelimited,
    /// Column name as returned by the database.
    Verbatim,
}

impl FromStr for NameCase {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "camel" => NameCase::Camel,
            "lowercamel" => NameCase::LowerCamel,
            "snake" => NameCase::Snake,
            "screamingsnake" => NameCase::ScreamingSnake,
            "kebab" => NameCase::Kebab,
            "screamingkebab" => NameCase::ScreamingKebab,
            "dotdelimited" => NameCase::DotDelimited,
            "dotscreamingdelimited" => NameCase::DotScreamingDelimited,
            "none" | "" => NameCase::Verbatim,
            other => {
                return Err(ConfigError::InvalidConfig(format!("unknown name converter {}", other)))
            }
        })
    }
}

impl NameCase {
    pub fn convert(self, name: &str) -> String {
        let words = split_words(name);
        match self {
            NameCase::Camel => words.iter().map(|w| capitalize(w)).collect(),
            NameCase::LowerCamel => words
                .iter()
                .enumerate()
                .map(|(i, w)| if i == 0 { w.to_lowercase() } else { capitalize(w) })
                .collect(),
            NameCase::Snake => delimited(&words, '_', false),
            NameCase::ScreamingSnake => delimited(&words, '_', true),
            NameCase::Kebab => delimited(&words, '-', false),
            NameCase::ScreamingKebab => delimited(&words, '-', true),
            NameCase::DotDelimited => delimited(&words, '.', false),
            NameCase::DotScreamingDelimited => delimited(&words, '.', true),
            NameCase::Verbatim => name.to_string(),
        }
    }
}

/// Split an identifier into words at separators and case boundaries.
/// e.g. "user_id" -> ["user", "id"], "HTTPServerName" -> ["HTTP", "Server", "Name"]
fn split_words(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = s.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).map_or(false, |n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn delimited(words: &[String], sep: char, upper: bool) -> String {
    let mut out = String::new();
    for (i, w) in words.iter().enumerate() {
        if i > 0 {
            out.push(sep);
        }
        if upper {
            out.push_str(&w.to_uppercase());
        } else {
            out.push_str(&w.to_lowercase());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_snake_columns() {
        assert_eq!(NameCase::LowerCamel.convert("user_id"), "userId");
        assert_eq!(NameCase::Camel.convert("created_at"), "CreatedAt");
        assert_eq!(NameCase::ScreamingSnake.convert("user_id"), "USER_ID");
        assert_eq!(NameCase::Kebab.convert("user_id"), "user-id");
        assert_eq!(NameCase::ScreamingKebab.convert("user_id"), "USER-ID");
        assert_eq!(NameCase::DotDelimited.convert("user_id"), "user.id");
        assert_eq!(NameCase::DotScreamingDelimited.convert("user_id"), "USER.ID");
        assert_eq!(NameCase::Verbatim.convert("user_id"), "user_id");
    }

    #[test]
    fn converts_camel_and_acronyms() {
        assert_eq!(NameCase::Snake.convert("createdAt"), "created_at");
        assert_eq!(NameCase::Snake.convert("HTTPServer"), "http_server");
        assert_eq!(NameCase::LowerCamel.convert("OrderID"), "orderId");
        assert_eq!(NameCase::LowerCamel.convert("id"), "id");
        assert_eq!(NameCase::ScreamingSnake.convert("line2total"), "LINE2TOTAL");
    }

    #[test]
    fn parses_converter_names() {
        assert_eq!("lowercamel".parse::<NameCase>().unwrap(), NameCase::LowerCamel);
        assert_eq!("ScreamingSnake".parse::<NameCase>().unwrap(), NameCase::ScreamingSnake);
        assert_eq!("none".parse::<NameCase>().unwrap(), NameCase::Verbatim);
        assert!("pascal".parse::<NameCase>().is_err());
    }
}
