// OpenStates people API adapter
//
// Concept: Page through every current officeholder of one jurisdiction
// Rate limiting: governor quota, one permit per page request
//
// API Documentation: https://v3.openstates.org/docs

use crate::sources::SourceAdapter;
use crate::types::{AdapterError, RawRecord, SourceKind};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use repdir_common::config::OpenStatesSection;
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("repdir-sync/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct PeoplePage {
    #[serde(default)]
    results: Vec<Person>,
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    max_page: u32,
}

#[derive(Debug, Deserialize)]
struct Person {
    name: Option<String>,
    party: Option<String>,
    email: Option<String>,
    openstates_url: Option<String>,
    current_role: Option<CurrentRole>,
    #[serde(default)]
    offices: Vec<Office>,
}

#[derive(Debug, Deserialize)]
struct CurrentRole {
    title: Option<String>,
    org_classification: Option<String>,
    district: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Office {
    voice: Option<String>,
}

/// OpenStates client
pub struct OpenStatesAdapter {
    client: Client,
    base_url: String,
    api_key: String,
    jurisdiction: String,
    /// Stamped on every record; the people endpoint does not carry it
    state: String,
    per_page: u32,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl OpenStatesAdapter {
    pub fn new(section: &OpenStatesSection, api_key: String) -> Result<Self, AdapterError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(5))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AdapterError::NotAvailable(format!("HTTP client: {}", e)))?;

        let rps = NonZeroU32::new(section.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rps));

        Ok(Self {
            client,
            base_url: section.base_url.trim_end_matches('/').to_string(),
            api_key,
            jurisdiction: section.jurisdiction.clone(),
            state: section.state.clone(),
            per_page: section.per_page.max(1),
            rate_limiter,
        })
    }

    async fn fetch_page(&self, page: u32) -> Result<PeoplePage, AdapterError> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(format!("{}/people", self.base_url))
            .header("x-api-key", &self.api_key)
            .query(&[
                ("jurisdiction", self.jurisdiction.clone()),
                ("per_page", self.per_page.to_string()),
                ("page", page.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AdapterError::Http {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<PeoplePage>()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))
    }

    fn to_raw(&self, person: Person) -> RawRecord {
        let role = person.current_role;
        RawRecord {
            name: person.name,
            title: role.as_ref().and_then(|r| r.title.clone()),
            org_classification: role.as_ref().and_then(|r| r.org_classification.clone()),
            district: role.and_then(|r| r.district),
            state: Some(self.state.clone()),
            party: person.party,
            phone: person.offices.into_iter().next().and_then(|o| o.voice),
            email: person.email,
            website: person.openstates_url,
            county: None,
        }
    }
}

#[async_trait]
impl SourceAdapter for OpenStatesAdapter {
    fn name(&self) -> &str {
        "openstates"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::OpenStates
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>, AdapterError> {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let body = self.fetch_page(page).await?;
            if body.results.is_empty() {
                break;
            }

            debug!(page, people = body.results.len(), "OpenStates page fetched");
            records.extend(body.results.into_iter().map(|p| self.to_raw(p)));

            let max_page = body.pagination.map(|p| p.max_page).unwrap_or(page);
            if page >= max_page {
                break;
            }
            page += 1;
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn section(base_url: String) -> OpenStatesSection {
        OpenStatesSection {
            enabled: true,
            api_key: None,
            base_url,
            jurisdiction: "ocd-jurisdiction/country:us/state:ny/government".to_string(),
            state: "NY".to_string(),
            per_page: 2,
            requests_per_second: 100,
        }
    }

    fn page_matcher(page: &str) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), page.into()),
            Matcher::UrlEncoded("per_page".into(), "2".into()),
            Matcher::UrlEncoded(
                "jurisdiction".into(),
                "ocd-jurisdiction/country:us/state:ny/government".into(),
            ),
        ])
    }

    #[tokio::test]
    async fn test_fetch_follows_pagination() {
        let mut server = Server::new_async().await;

        let first = server
            .mock("GET", "/people")
            .match_query(page_matcher("1"))
            .match_header("x-api-key", "test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "results": [
                        {
                            "name": "Jane Doe",
                            "party": "Democratic",
                            "email": "doe@nysenate.gov",
                            "openstates_url": "https://openstates.org/person/jane-doe",
                            "current_role": {"title": "Senator", "org_classification": "upper", "district": "21"},
                            "offices": [{"voice": "518-555-0101"}, {"voice": "212-555-0102"}]
                        },
                        {
                            "name": "Amy Lee",
                            "party": "Republican",
                            "current_role": {"title": "Assembly Member", "org_classification": "lower", "district": "74"}
                        }
                    ],
                    "pagination": {"page": 1, "max_page": 2, "per_page": 2, "total_items": 3}
                }"#,
            )
            .create_async()
            .await;

        let second = server
            .mock("GET", "/people")
            .match_query(page_matcher("2"))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "results": [{"name": "Pat Smith", "current_role": {"title": "Governor"}}],
                    "pagination": {"page": 2, "max_page": 2, "per_page": 2, "total_items": 3}
                }"#,
            )
            .create_async()
            .await;

        let adapter =
            OpenStatesAdapter::new(&section(server.url()), "test-key".to_string()).unwrap();
        let records = adapter.fetch().await.unwrap();

        first.assert_async().await;
        second.assert_async().await;

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].name.as_deref(), Some("Jane Doe"));
        assert_eq!(records[0].org_classification.as_deref(), Some("upper"));
        assert_eq!(records[0].district.as_deref(), Some("21"));
        assert_eq!(records[0].phone.as_deref(), Some("518-555-0101"));
        assert_eq!(records[0].state.as_deref(), Some("NY"));
        assert!(records[1].phone.is_none());
        assert_eq!(records[2].title.as_deref(), Some("Governor"));
    }

    #[tokio::test]
    async fn test_empty_results_stop_paging() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/people")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"results": [], "pagination": {"max_page": 9}}"#)
            .expect(1)
            .create_async()
            .await;

        let adapter = OpenStatesAdapter::new(&section(server.url()), "k".to_string()).unwrap();
        assert!(adapter.fetch().await.unwrap().is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/people")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("invalid api key")
            .create_async()
            .await;

        let adapter = OpenStatesAdapter::new(&section(server.url()), "bad".to_string()).unwrap();
        match adapter.fetch().await {
            Err(AdapterError::Http { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "invalid api key");
            }
            other => panic!("expected HTTP error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_parse_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/people")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let adapter = OpenStatesAdapter::new(&section(server.url()), "k".to_string()).unwrap();
        assert!(matches!(adapter.fetch().await, Err(AdapterError::Parse(_))));
    }
}
