//! Parameter validators declared in endpoint config.
//!
//! A param entry reads `name validator[:cfg] validator[:cfg] ...`, e.g.
//! `id required pattern:^\d+$`. Validators run in declaration order and the
//! first failure wins.

use crate::error::{ConfigError, ValidationError};
use regex::Regex;

#[derive(Clone, Debug)]
pub enum Validator {
    Required(bool),
    Pattern(Regex),
}

impl Validator {
    /// Build from one `kind[:cfg]` token.
    pub fn parse(token: &str) -> Result<Self, ConfigError> {
        let (kind, cfg) = token.split_once(':').unwrap_or((token, ""));
        match kind {
            "required" => Self::required(cfg),
            "pattern" => Self::pattern(cfg),
            _ => Err(ConfigError::InvalidConfig(token.to_string())),
        }
    }

    /// Empty config means required.
    pub fn required(cfg: &str) -> Result<Self, ConfigError> {
        if cfg.is_empty() {
            return Ok(Validator::Required(true));
        }
        match cfg.to_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" | "1" => Ok(Validator::Required(true)),
            "false" | "f" | "no" | "n" | "off" | "0" => Ok(Validator::Required(false)),
            _ => Err(ConfigError::InvalidConfig(cfg.to_string())),
        }
    }

    pub fn pattern(cfg: &str) -> Result<Self, ConfigError> {
        if cfg.is_empty() {
            return Err(ConfigError::InvalidConfig("invalid pattern config".into()));
        }
        Regex::new(cfg)
            .map(Validator::Pattern)
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: cfg.to_string(),
                source,
            })
    }

    pub fn validate(&self, param: &str, value: &str) -> Result<(), ValidationError> {
        match self {
            Validator::Required(true) if value.is_empty() => {
                Err(ValidationError::ParamRequired(param.to_string()))
            }
            Validator::Pattern(re) if !value.is_empty() && !re.is_match(value) => {
                Err(ValidationError::ParamInvalid(param.to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// A request parameter and its ordered validators. The name is a path
/// expression into the request values.
#[derive(Clone, Debug)]
pub struct ParamSpec {
    pub name: String,
    pub validators: Vec<Validator>,
}

impl ParamSpec {
    /// Parse a whitespace-separated param entry. Blank entries yield `None`.
    pub fn parse(entry: &str) -> Result<Option<Self>, ConfigError> {
        let mut fields = entry.split_whitespace();
        let Some(name) = fields.next() else {
            return Ok(None);
        };
        let validators = fields.map(Validator::parse).collect::<Result<Vec<_>, _>>()?;
        Ok(Some(ParamSpec {
            name: name.to_string(),
            validators,
        }))
    }

    pub fn validate(&self, value: &str) -> Result<(), ValidationError> {
        for validator in &self.validators {
            validator.validate(&self.name, value)?;
        }
        Ok(())
    }
}
