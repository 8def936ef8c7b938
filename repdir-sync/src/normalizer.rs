//! Canonical record normalizer
//!
//! Converts one raw record from one source into the canonical
//! `Representative`: position titles are mapped onto a fixed vocabulary,
//! text is folded to ASCII, district identifiers are bounded in length.

use crate::types::{NormalizationError, RawRecord, SourceKind};
use repdir_common::Representative;
use std::fmt;
use unicode_normalization::UnicodeNormalization;

/// Fixed position vocabulary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    UsRepresentative,
    UsSenator,
    StateSenator,
    AssemblyMember,
    Governor,
    AttorneyGeneral,
    Comptroller,
    ChiefOfElections,
    /// County legislature seat, parameterized by district
    CountyLegislature(String),
    /// Title outside the vocabulary, kept as published (already cleaned)
    Other(String),
}

const COUNTY_LEGISLATURE_PREFIX: &str = "county legislature district ";

impl Position {
    /// Map a cleaned free-text title onto the vocabulary
    pub fn from_title(title: &str) -> Self {
        let lower = title.to_lowercase();

        if lower.starts_with(COUNTY_LEGISLATURE_PREFIX) {
            let district = title
                .get(COUNTY_LEGISLATURE_PREFIX.len()..)
                .map(str::trim)
                .filter(|d| !d.is_empty());
            if let Some(district) = district {
                return Position::CountyLegislature(district.to_string());
            }
        }

        // Deputies share keywords with their principals
        if lower.contains("lieutenant") || lower.contains("deputy") {
            return Position::Other(title.to_string());
        }

        if lower.contains("governor") {
            Position::Governor
        } else if lower.contains("attorney general") || lower == "ag" {
            Position::AttorneyGeneral
        } else if lower.contains("comptroller") || lower.contains("controller") {
            Position::Comptroller
        } else if lower.contains("chief") || lower.contains("elections") {
            Position::ChiefOfElections
        } else if is_federal_senate_title(&lower) {
            Position::UsSenator
        } else if is_federal_house_title(&lower) {
            Position::UsRepresentative
        } else if lower.contains("senator") {
            Position::StateSenator
        } else if lower.contains("assembly") {
            Position::AssemblyMember
        } else {
            Position::Other(title.to_string())
        }
    }
}

fn is_federal_senate_title(lower: &str) -> bool {
    ["u.s. senator", "us senator", "united states senator"]
        .iter()
        .any(|t| lower.contains(t))
}

fn is_federal_house_title(lower: &str) -> bool {
    lower == "representative"
        || lower.contains("u.s. rep")
        || lower.contains("us rep")
        || lower.contains("united states representative")
        || lower.contains("congress")
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::UsRepresentative => f.write_str("U.S. Representative"),
            Position::UsSenator => f.write_str("U.S. Senator"),
            Position::StateSenator => f.write_str("State Senator"),
            Position::AssemblyMember => f.write_str("Assembly Member"),
            Position::Governor => f.write_str("Governor"),
            Position::AttorneyGeneral => f.write_str("Attorney General"),
            Position::Comptroller => f.write_str("Comptroller"),
            Position::ChiefOfElections => f.write_str("Chief of Elections"),
            Position::CountyLegislature(district) => {
                write!(f, "County Legislature District {}", district)
            }
            Position::Other(title) => f.write_str(title),
        }
    }
}

/// Fold text to clean ASCII
///
/// NFKD-decomposes, drops combining marks and any other non-ASCII or control
/// character, collapses whitespace. Returns `None` when nothing survives.
pub fn clean_text(value: &str) -> Option<String> {
    let folded: String = value
        .nfkd()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .collect();

    let collapsed = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

fn clean_opt(value: Option<&String>) -> Option<String> {
    value.and_then(|v| clean_text(v))
}

/// Raw record → canonical `Representative`
#[derive(Debug, Clone)]
pub struct Normalizer {
    max_district_len: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Normalizer {
    pub fn new(max_district_len: usize) -> Self {
        Self { max_district_len }
    }

    /// Normalize one record
    ///
    /// Fails only when the record has no usable name or no usable position.
    pub fn normalize(
        &self,
        raw: &RawRecord,
        source: SourceKind,
    ) -> Result<Representative, NormalizationError> {
        let name = clean_opt(raw.name.as_ref()).ok_or(NormalizationError::MissingName)?;
        let title = clean_opt(raw.title.as_ref());
        let district = clean_opt(raw.district.as_ref()).map(|d| self.bound_district(d));

        let position = match source {
            SourceKind::HouseRoster => Position::UsRepresentative,
            SourceKind::SenateRoster => Position::UsSenator,
            SourceKind::AttorneysGeneral => Position::AttorneyGeneral,
            SourceKind::Comptrollers => Position::Comptroller,
            SourceKind::OpenStates => {
                openstates_position(title.as_deref(), raw.org_classification.as_deref())?
            }
            SourceKind::CountyRoster => county_position(title.as_deref(), district.as_deref())?,
        };

        let mut rep = Representative::new(name, position.to_string());
        rep.state = clean_opt(raw.state.as_ref());
        rep.party = clean_opt(raw.party.as_ref());
        rep.phone = clean_opt(raw.phone.as_ref());
        rep.email = clean_opt(raw.email.as_ref());
        rep.website = clean_opt(raw.website.as_ref());
        rep.county = clean_opt(raw.county.as_ref());

        match position {
            Position::UsRepresentative => rep.congressional_district = district,
            Position::StateSenator => rep.state_senate_district = district,
            Position::AssemblyMember => rep.state_assembly_district = district,
            _ => {}
        }

        Ok(rep)
    }

    fn bound_district(&self, district: String) -> String {
        if district.len() > self.max_district_len {
            // ASCII after clean_text, so byte length equals char count
            district[..self.max_district_len].trim_end().to_string()
        } else {
            district
        }
    }
}

/// OpenStates titles: chamber classification decides legislators
fn openstates_position(
    title: Option<&str>,
    org_classification: Option<&str>,
) -> Result<Position, NormalizationError> {
    let org = org_classification.map(str::trim).unwrap_or_default();

    if title == Some("Senator") || org.eq_ignore_ascii_case("upper") {
        return Ok(Position::StateSenator);
    }
    if title == Some("Assembly Member") || org.eq_ignore_ascii_case("lower") {
        return Ok(Position::AssemblyMember);
    }

    title
        .map(Position::from_title)
        .ok_or(NormalizationError::MissingPosition)
}

/// County roster: a district makes a legislature seat, otherwise the title stands
///
/// County-wide titles are kept as written; the state-level keyword rules
/// would strip the county qualifier.
fn county_position(
    title: Option<&str>,
    district: Option<&str>,
) -> Result<Position, NormalizationError> {
    let is_legislator = title
        .map(|t| t.to_lowercase().contains("legislat"))
        .unwrap_or(true);

    if let Some(district) = district.filter(|_| is_legislator) {
        return Ok(Position::CountyLegislature(district.to_string()));
    }

    match title {
        Some(title) => match Position::from_title(title) {
            seat @ Position::CountyLegislature(_) => Ok(seat),
            _ => Ok(Position::Other(title.to_string())),
        },
        None => Err(NormalizationError::MissingPosition),
    }
}
