use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static KENYAN_MSISDN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\+?254|0)?([17]\d{8})$").expect("phone pattern compiles")
});

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

/// A mobile-money capable phone number in international form (`2547XXXXXXXX`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parses local (`07..`, `01..`), bare (`7..`) and international
    /// (`2547..`, `+2547..`) forms. Spaces and dashes are ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let compact: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();
        let captures = KENYAN_MSISDN.captures(&compact)?;
        let subscriber = captures.get(1)?.as_str();
        Some(Self(format!("254{}", subscriber)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A syntactically valid email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        EMAIL.is_match(trimmed).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Amount in minor currency units.
pub type MinorUnits = u64;
