//! Static roster file adapter
//!
//! A JSON array of raw records exported by an external scraper (House
//! roster, Senate contact feed, attorney general or comptroller listings).
//! The declared kind decides how the normalizer reads the records.

use crate::sources::SourceAdapter;
use crate::types::{AdapterError, RawRecord, SourceKind};
use async_trait::async_trait;
use std::path::PathBuf;

pub struct StaticRosterAdapter {
    name: String,
    kind: SourceKind,
    path: PathBuf,
}

impl StaticRosterAdapter {
    pub fn new(name: impl Into<String>, kind: SourceKind, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            kind,
            path,
        }
    }
}

#[async_trait]
impl SourceAdapter for StaticRosterAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>, AdapterError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        serde_json::from_str(&content).map_err(|e| AdapterError::Parse(e.to_string()))
    }
}
