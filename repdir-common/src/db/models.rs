//! Canonical representative model
//!
//! A `Representative` is one person holding one office. Its identity across
//! runs is the `IdentityKey`: the case- and whitespace-normalized
//! (name, position) pair. Everything else on the row is an attribute that a
//! later observation may overwrite.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a representative row
///
/// Both parts are stored already normalized (lowercase, single spaces), so two
/// spellings that differ only in case or spacing produce equal keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdentityKey {
    name: String,
    position: String,
}

impl IdentityKey {
    /// Build a key from display-form name and position
    pub fn new(name: &str, position: &str) -> Self {
        Self {
            name: normalize_key_part(name),
            position: normalize_key_part(position),
        }
    }

    /// Rebuild a key from parts that were normalized before storage
    pub fn from_stored(name_key: String, position_key: String) -> Self {
        Self {
            name: name_key,
            position: position_key,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> &str {
        &self.position
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.name, self.position)
    }
}

/// Lowercase and collapse runs of whitespace to a single space
pub fn normalize_key_part(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Representative record (canonical schema shared by every source)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Representative {
    /// Display name as last observed
    pub name: String,
    /// Standardized position title as last observed
    pub position: String,
    pub state: Option<String>,
    pub party: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub congressional_district: Option<String>,
    pub state_senate_district: Option<String>,
    pub state_assembly_district: Option<String>,
    pub county: Option<String>,
}

impl Representative {
    /// Create a representative with only the identity fields set
    pub fn new(name: impl Into<String>, position: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: position.into(),
            state: None,
            party: None,
            phone: None,
            email: None,
            website: None,
            congressional_district: None,
            state_senate_district: None,
            state_assembly_district: None,
            county: None,
        }
    }

    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(&self.name, &self.position)
    }

    /// Null out contact fields, leaving identity and affiliation untouched
    pub fn clear_contact(&mut self) {
        self.phone = None;
        self.email = None;
        self.website = None;
    }

    /// Names of non-key attributes whose values differ from `other`
    pub fn differing_attributes(&self, other: &Representative) -> Vec<&'static str> {
        let pairs: [(&'static str, &Option<String>, &Option<String>); 9] = [
            ("state", &self.state, &other.state),
            ("party", &self.party, &other.party),
            ("phone", &self.phone, &other.phone),
            ("email", &self.email, &other.email),
            ("website", &self.website, &other.website),
            (
                "congressional_district",
                &self.congressional_district,
                &other.congressional_district,
            ),
            (
                "state_senate_district",
                &self.state_senate_district,
                &other.state_senate_district,
            ),
            (
                "state_assembly_district",
                &self.state_assembly_district,
                &other.state_assembly_district,
            ),
            ("county", &self.county, &other.county),
        ];

        pairs
            .into_iter()
            .filter(|(_, a, b)| a != b)
            .map(|(field, _, _)| field)
            .collect()
    }

    /// True when every non-key attribute equals the one on `other`
    pub fn same_attributes(&self, other: &Representative) -> bool {
        self.differing_attributes(other).is_empty()
    }
}
