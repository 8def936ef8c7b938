//! Verified county officials roster
//!
//! Reads a hand-maintained JSON file keyed by county:
//!
//! ```json
//! {
//!   "Albany": {
//!     "county_wide": [{"name": "...", "position": "County Executive", "party": "D"}],
//!     "legislature": [{"name": "...", "district": 5, "party": "R"}]
//!   }
//! }
//! ```

use crate::sources::SourceAdapter;
use crate::types::{AdapterError, RawRecord, SourceKind};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct CountyEntry {
    #[serde(default)]
    county_wide: Vec<CountyWideOfficial>,
    #[serde(default)]
    legislature: Vec<Legislator>,
}

#[derive(Debug, Deserialize)]
struct CountyWideOfficial {
    name: String,
    position: String,
    party: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Legislator {
    name: String,
    /// Published both as a number and as a string
    district: Value,
    party: Option<String>,
}

pub struct CountyRosterAdapter {
    path: PathBuf,
    state: String,
}

impl CountyRosterAdapter {
    pub fn new(path: PathBuf, state: impl Into<String>) -> Self {
        Self {
            path,
            state: state.into(),
        }
    }

    fn parse(&self, content: &str) -> Result<Vec<RawRecord>, AdapterError> {
        let roster: BTreeMap<String, CountyEntry> =
            serde_json::from_str(content).map_err(|e| AdapterError::Parse(e.to_string()))?;

        let mut records = Vec::new();
        for (county, entry) in roster {
            for official in entry.county_wide {
                records.push(RawRecord {
                    name: Some(official.name),
                    title: Some(official.position),
                    state: Some(self.state.clone()),
                    party: official.party,
                    county: Some(county.clone()),
                    ..Default::default()
                });
            }

            for member in entry.legislature {
                records.push(RawRecord {
                    name: Some(member.name),
                    title: Some("County Legislator".to_string()),
                    district: district_text(&member.district),
                    state: Some(self.state.clone()),
                    party: member.party,
                    county: Some(county.clone()),
                    ..Default::default()
                });
            }
        }

        Ok(records)
    }
}

fn district_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl SourceAdapter for CountyRosterAdapter {
    fn name(&self) -> &str {
        "county_roster"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::CountyRoster
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>, AdapterError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        self.parse(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::Normalizer;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ROSTER: &str = r#"{
        "Albany": {
            "county_wide": [{"name": "Lee Chan", "position": "County Executive", "party": "D"}],
            "legislature": [
                {"name": "Kim Park", "district": 5, "party": "R"},
                {"name": "Sam Ortiz", "district": "12"}
            ]
        },
        "Bronx": {
            "county_wide": [{"name": "Ana Cruz", "position": "Borough President"}]
        }
    }"#;

    #[tokio::test]
    async fn test_reads_county_wide_and_legislature() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(ROSTER.as_bytes()).unwrap();

        let adapter = CountyRosterAdapter::new(file.path().to_path_buf(), "NY");
        let records = adapter.fetch().await.unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!(records[0].title.as_deref(), Some("County Executive"));
        assert_eq!(records[0].county.as_deref(), Some("Albany"));
        assert_eq!(records[1].district.as_deref(), Some("5"));
        assert_eq!(records[2].district.as_deref(), Some("12"));
        assert!(records[2].party.is_none());
        assert_eq!(records[3].county.as_deref(), Some("Bronx"));
        assert!(records.iter().all(|r| r.state.as_deref() == Some("NY")));
    }

    #[tokio::test]
    async fn test_legislators_normalize_to_district_seats() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(ROSTER.as_bytes()).unwrap();

        let adapter = CountyRosterAdapter::new(file.path().to_path_buf(), "NY");
        let records = adapter.fetch().await.unwrap();

        let rep = Normalizer::default()
            .normalize(&records[1], SourceKind::CountyRoster)
            .unwrap();
        assert_eq!(rep.position, "County Legislature District 5");
        assert_eq!(rep.county.as_deref(), Some("Albany"));
    }

    #[tokio::test]
    async fn test_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = CountyRosterAdapter::new(dir.path().join("absent.json"), "NY");
        assert!(matches!(adapter.fetch().await, Err(AdapterError::Io(_))));
    }

    #[test]
    fn test_malformed_roster_is_a_parse_error() {
        let adapter = CountyRosterAdapter::new(PathBuf::from("unused"), "NY");
        assert!(matches!(
            adapter.parse(r#"{"Albany": [1, 2]}"#),
            Err(AdapterError::Parse(_))
        ));
    }
}
