//! In-memory upstream services that record every call.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CitationPage, SourceError, TrialSearch, TrialSearchResult, Work, WorkId, WorkIndex};

pub fn work(doi: &str, pmid: Option<&str>, year: Option<i32>) -> Work {
    Work {
        title: Some(format!("Paper {}", doi)),
        year,
        doi: Some(doi.to_string()),
        pmid: pmid.map(|p| format!("https://pubmed.ncbi.nlm.nih.gov/{}", p)),
    }
}

#[derive(Default)]
pub struct FakeIndex {
    pub lookups: HashMap<String, Vec<Option<String>>>,
    /// Pages keyed by the cursor that requests them.
    pub pages: HashMap<String, CitationPage>,
    pub fail_on_cursor: Option<String>,
    pub lookup_calls: Mutex<Vec<String>>,
    pub page_calls: Mutex<Vec<(String, String, u32)>>,
}

impl FakeIndex {
    pub fn with_work(doi: &str, work_id: &str) -> Self {
        let mut index = Self::default();
        index.lookups.insert(
            doi.to_string(),
            vec![Some(format!("https://openalex.org/{}", work_id))],
        );
        index
    }

    pub fn page(mut self, cursor: &str, works: Vec<Work>, next: Option<&str>) -> Self {
        self.pages.insert(
            cursor.to_string(),
            CitationPage { works, next_cursor: next.map(String::from) },
        );
        self
    }

    pub fn cursors_requested(&self) -> Vec<String> {
        self.page_calls.lock().unwrap().iter().map(|c| c.1.clone()).collect()
    }
}

#[async_trait]
impl WorkIndex for FakeIndex {
    fn name(&self) -> &str { "fake-index" }

    async fn lookup_doi(&self, doi: &str) -> Result<Vec<Option<String>>, SourceError> {
        self.lookup_calls.lock().unwrap().push(doi.to_string());
        Ok(self.lookups.get(doi).cloned().unwrap_or_default())
    }

    async fn citing_page(
        &self,
        work_id: &WorkId,
        cursor: &str,
        per_page: u32,
    ) -> Result<CitationPage, SourceError> {
        self.page_calls
            .lock()
            .unwrap()
            .push((work_id.to_string(), cursor.to_string(), per_page));
        if self.fail_on_cursor.as_deref() == Some(cursor) {
            return Err(SourceError::Api("503 Service Unavailable".to_string()));
        }
        Ok(self.pages.get(cursor).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeTrials {
    pub trial_ids: Vec<String>,
    pub count: Option<u64>,
    pub fail: bool,
    pub calls: Mutex<Vec<(String, u32)>>,
}

impl FakeTrials {
    pub fn returning(ids: &[&str]) -> Self {
        Self {
            trial_ids: ids.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn terms(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|c| c.0.clone()).collect()
    }
}

#[async_trait]
impl TrialSearch for FakeTrials {
    fn name(&self) -> &str { "fake-trials" }

    async fn search(&self, term: &str, retmax: u32) -> Result<TrialSearchResult, SourceError> {
        self.calls.lock().unwrap().push((term.to_string(), retmax));
        if self.fail {
            return Err(SourceError::Api("esearch returned 500".to_string()));
        }
        Ok(TrialSearchResult {
            ids: self.trial_ids.clone(),
            count: self.count.or(Some(self.trial_ids.len() as u64)),
        })
    }
}
