use super::{CitationPage, SourceError, Work, WorkId, WorkIndex};
use async_trait::async_trait;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.openalex.org";

const SELECT: &str = "id,title,publication_year,doi,ids";

pub struct OpenAlexClient {
    client: reqwest::Client,
    base_url: String,
}

impl OpenAlexClient {
    pub fn new(base_url: &str, email: Option<&str>) -> Result<Self, SourceError> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent(super::user_agent(email))
                .build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn works_url(&self) -> String {
        format!("{}/works", self.base_url)
    }
}

#[derive(Deserialize)]
struct OAResponse {
    #[serde(default)]
    meta: Option<OAMeta>,
    #[serde(default)]
    results: Vec<OAWork>,
}

#[derive(Deserialize)]
struct OAMeta {
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct OAWork {
    id: Option<String>,
    title: Option<String>,
    publication_year: Option<i32>,
    doi: Option<String>,
    #[serde(default)]
    ids: Option<OAIds>,
}

#[derive(Deserialize)]
struct OAIds {
    pmid: Option<String>,
}

fn oa_to_work(w: OAWork) -> Work {
    Work {
        title: w.title,
        year: w.publication_year,
        doi: w.doi,
        pmid: w.ids.and_then(|ids| ids.pmid),
    }
}

fn parse_page(body: &str) -> Result<CitationPage, SourceError> {
    let resp: OAResponse =
        serde_json::from_str(body).map_err(|e| SourceError::Parse(e.to_string()))?;
    Ok(CitationPage {
        next_cursor: resp
            .meta
            .and_then(|m| m.next_cursor)
            .filter(|c| !c.is_empty()),
        works: resp.results.into_iter().map(oa_to_work).collect(),
    })
}

#[async_trait]
impl WorkIndex for OpenAlexClient {
    fn name(&self) -> &str { "openalex" }

    async fn lookup_doi(&self, doi: &str) -> Result<Vec<Option<String>>, SourceError> {
        let filter = format!("doi:{}", doi);
        let resp = self.client
            .get(self.works_url())
            .query(&[("filter", filter.as_str()), ("select", "id")])
            .send().await?;
        if !resp.status().is_success() {
            tracing::debug!("OpenAlex DOI lookup returned {}", resp.status());
            return Ok(Vec::new());
        }
        let body: OAResponse = resp.json().await?;
        Ok(body.results.into_iter().map(|w| w.id).collect())
    }

    async fn citing_page(
        &self,
        work_id: &WorkId,
        cursor: &str,
        per_page: u32,
    ) -> Result<CitationPage, SourceError> {
        let filter = format!("cites:{}", work_id);
        let per_page = per_page.to_string();
        let resp = self.client
            .get(self.works_url())
            .query(&[
                ("filter", filter.as_str()),
                ("cursor", cursor),
                ("per_page", per_page.as_str()),
                ("select", SELECT),
            ])
            .send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Api(format!(
                "OpenAlex citation query for {} returned {}",
                work_id, status
            )));
        }
        parse_page(&resp.text().await?)
    }
}
