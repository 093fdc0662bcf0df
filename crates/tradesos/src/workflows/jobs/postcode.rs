use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    // Outward code split into area (letters) and district suffix, then the
    // inward sector digit and two-letter unit.
    static ref POSTCODE_REGEX: Regex =
        Regex::new(r"^([A-Z]{1,2})([0-9][A-Z0-9]?)([0-9])([A-Z]{2})$")
            .expect("postcode pattern compiles");
}

/// Structured coverage keys derived from a UK postcode.
///
/// Only [`normalize`] builds one, so every key in circulation satisfies the
/// postcode grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PostcodeKey {
    full: String,
    area: String,
    district: String,
    sector: String,
    unit: String,
}

impl PostcodeKey {
    /// Canonical form with a single space before the inward code, e.g. `M1 1AA`.
    pub fn full(&self) -> &str {
        &self.full
    }

    pub fn area(&self) -> &str {
        &self.area
    }

    pub fn district(&self) -> &str {
        &self.district
    }

    pub fn sector(&self) -> &str {
        &self.sector
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }
}

impl fmt::Display for PostcodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl FromStr for PostcodeKey {
    type Err = PostcodeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        normalize(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PostcodeError {
    #[error("'{input}' is not a valid UK postcode")]
    InvalidFormat { input: String },
}

/// Parse a raw postcode, ignoring case and any whitespace.
pub fn normalize(raw: &str) -> Result<PostcodeKey, PostcodeError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let captures = POSTCODE_REGEX
        .captures(&cleaned)
        .ok_or_else(|| PostcodeError::InvalidFormat {
            input: raw.trim().to_string(),
        })?;

    let area = captures[1].to_string();
    let district = format!("{area}{}", &captures[2]);
    let sector = captures[3].to_string();
    let unit = captures[4].to_string();

    Ok(PostcodeKey {
        full: format!("{district} {sector}{unit}"),
        area,
        district,
        sector,
        unit,
    })
}
