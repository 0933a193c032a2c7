#[cfg(test)]
pub mod mock;
pub mod openalex;
pub mod pubmed;
#[cfg(test)]
pub mod stub;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One bibliographic record as returned by the lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Work {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub doi: Option<String>,
    pub pmid: Option<String>,
}

/// Bare internal work id (e.g. `W2741809807`), without the URI prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkId(pub String);

impl std::fmt::Display for WorkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of a cursor-paginated citation query.
#[derive(Debug, Clone, Default)]
pub struct CitationPage {
    pub works: Vec<Work>,
    pub next_cursor: Option<String>,
}

/// Result of a filtered trial search.
#[derive(Debug, Clone, Default)]
pub struct TrialSearchResult {
    pub ids: Vec<String>,
    /// Total matches reported upstream, which may exceed `ids.len()`.
    pub count: Option<u64>,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("API error: {0}")]
    Api(String),
}

/// Bibliographic lookup service (OpenAlex in production).
#[async_trait]
pub trait WorkIndex: Send + Sync {
    fn name(&self) -> &str;

    /// Look up works whose DOI equals `doi`, returning one entry per result
    /// in server order (`None` when a result carries no id). A non-success
    /// status yields an empty list.
    async fn lookup_doi(&self, doi: &str) -> Result<Vec<Option<String>>, SourceError>;

    /// Fetch one page of works citing `work_id`.
    async fn citing_page(
        &self,
        work_id: &WorkId,
        cursor: &str,
        per_page: u32,
    ) -> Result<CitationPage, SourceError>;
}

/// Literature index that can apply a boolean query with a publication-type
/// filter (PubMed esearch in production).
#[async_trait]
pub trait TrialSearch: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, term: &str, retmax: u32) -> Result<TrialSearchResult, SourceError>;
}

pub(crate) fn user_agent(email: Option<&str>) -> String {
    match email {
        Some(e) => format!("trial-citations/0.1 (mailto:{})", e),
        None => "trial-citations/0.1".to_string(),
    }
}
