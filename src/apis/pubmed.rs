//! NCBI E-utilities `esearch` client used for the clinical-trial filter.

use super::{SourceError, TrialSearch, TrialSearchResult};
use async_trait::async_trait;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

pub struct PubMedClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl PubMedClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, SourceError> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent(super::user_agent(None))
                .build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[derive(Deserialize)]
struct ESearchResponse {
    esearchresult: Option<ESearchResult>,
}

#[derive(Deserialize)]
struct ESearchResult {
    count: Option<String>,
    #[serde(default)]
    idlist: Vec<String>,
    #[serde(rename = "ERROR")]
    error: Option<String>,
}

fn parse_esearch(body: &str) -> Result<TrialSearchResult, SourceError> {
    let resp: ESearchResponse =
        serde_json::from_str(body).map_err(|e| SourceError::Parse(e.to_string()))?;
    let result = resp
        .esearchresult
        .ok_or_else(|| SourceError::Parse("missing esearchresult".to_string()))?;
    if let Some(err) = result.error {
        return Err(SourceError::Api(err));
    }
    Ok(TrialSearchResult {
        count: result.count.and_then(|c| c.parse().ok()),
        ids: result.idlist,
    })
}

#[async_trait]
impl TrialSearch for PubMedClient {
    fn name(&self) -> &str { "pubmed" }

    async fn search(&self, term: &str, retmax: u32) -> Result<TrialSearchResult, SourceError> {
        // Long disjunctions exceed URL limits, so the term goes in a form body.
        let mut form = vec![
            ("db", "pubmed".to_string()),
            ("term", term.to_string()),
            ("retmax", retmax.to_string()),
            ("retmode", "json".to_string()),
        ];
        if let Some(key) = &self.api_key {
            form.push(("api_key", key.clone()));
        }

        let resp = self.client
            .post(format!("{}/esearch.fcgi", self.base_url))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Api(format!("esearch returned {}", status)));
        }
        parse_esearch(&resp.text().await?)
    }
}
