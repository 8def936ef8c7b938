//! Stub source adapters

use async_trait::async_trait;
use repdir_sync::sources::SourceAdapter;
use repdir_sync::types::{AdapterError, RawRecord, SourceKind};
use std::time::Duration;

enum Behavior {
    Records(Vec<RawRecord>),
    Fail,
    Hang,
}

/// Adapter returning canned records, an error, or never returning
pub struct StubAdapter {
    name: String,
    kind: SourceKind,
    behavior: Behavior,
}

impl StubAdapter {
    pub fn records(name: &str, kind: SourceKind, records: Vec<RawRecord>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            behavior: Behavior::Records(records),
        }
    }

    pub fn failing(name: &str, kind: SourceKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            behavior: Behavior::Fail,
        }
    }

    pub fn hanging(name: &str, kind: SourceKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            behavior: Behavior::Hang,
        }
    }
}

#[async_trait]
impl SourceAdapter for StubAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>, AdapterError> {
        match &self.behavior {
            Behavior::Records(records) => Ok(records.clone()),
            Behavior::Fail => Err(AdapterError::Http {
                status: 503,
                message: "service unavailable".to_string(),
            }),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(vec![])
            }
        }
    }
}

/// Raw record with name, title and party set
pub fn raw(name: &str, title: &str, party: &str) -> RawRecord {
    RawRecord {
        name: Some(name.to_string()),
        title: Some(title.to_string()),
        party: Some(party.to_string()),
        ..Default::default()
    }
}
