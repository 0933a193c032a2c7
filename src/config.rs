use std::sync::Arc;

use crate::apis::{self, SourceError};
use crate::classify::DEFAULT_RETMAX;
use crate::harvest::HarvestOptions;
use crate::pipeline::{Pipeline, PipelineOptions};

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub openalex_base_url: String,
    pub openalex_email: Option<String>,
    pub eutils_base_url: String,
    pub ncbi_api_key: Option<String>,
    pub page_size: u32,
    pub max_pages: u32,
    pub retmax: u32,
}

impl Default for Config {
    fn default() -> Self {
        let harvest = HarvestOptions::default();
        Self {
            openalex_base_url: apis::openalex::DEFAULT_BASE_URL.to_string(),
            openalex_email: None,
            eutils_base_url: apis::pubmed::DEFAULT_BASE_URL.to_string(),
            ncbi_api_key: None,
            page_size: harvest.per_page,
            max_pages: harvest.max_pages,
            retmax: DEFAULT_RETMAX,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            openalex_base_url: non_empty("OPENALEX_BASE_URL").unwrap_or(defaults.openalex_base_url),
            openalex_email: non_empty("OPENALEX_EMAIL"),
            eutils_base_url: non_empty("EUTILS_BASE_URL").unwrap_or(defaults.eutils_base_url),
            ncbi_api_key: non_empty("NCBI_API_KEY"),
            page_size: parse_or("TRIAL_CITATIONS_PAGE_SIZE", non_empty("TRIAL_CITATIONS_PAGE_SIZE"), defaults.page_size)
                .clamp(1, 200),
            max_pages: parse_or("TRIAL_CITATIONS_MAX_PAGES", non_empty("TRIAL_CITATIONS_MAX_PAGES"), defaults.max_pages)
                .max(1),
            retmax: parse_or("TRIAL_CITATIONS_RETMAX", non_empty("TRIAL_CITATIONS_RETMAX"), defaults.retmax)
                .max(1),
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            harvest: HarvestOptions {
                per_page: self.page_size,
                max_pages: self.max_pages,
            },
            retmax: self.retmax,
        }
    }

    /// Wire the OpenAlex and PubMed clients into a pipeline.
    pub fn build_pipeline(&self) -> Result<Pipeline, SourceError> {
        let index = apis::openalex::OpenAlexClient::new(
            &self.openalex_base_url,
            self.openalex_email.as_deref(),
        )?;
        let trials = apis::pubmed::PubMedClient::new(
            &self.eutils_base_url,
            self.ncbi_api_key.clone(),
        )?;
        Ok(Pipeline::new(Arc::new(index), Arc::new(trials), self.pipeline_options()))
    }

    /// Return a list of setting descriptions.
    pub fn describe(&self) -> Vec<SettingStatus> {
        vec![
            SettingStatus { name: "openalex".into(), value: self.openalex_base_url.clone(),
                note: if self.openalex_email.is_some() { "Polite pool email set".into() } else { "No email (limited rate)".into() } },
            SettingStatus { name: "pubmed".into(), value: self.eutils_base_url.clone(),
                note: if self.ncbi_api_key.is_some() { "API key set".into() } else { "No API key (rate limited)".into() } },
            SettingStatus { name: "page_size".into(), value: self.page_size.to_string(), note: "Citing works per page".into() },
            SettingStatus { name: "max_pages".into(), value: self.max_pages.to_string(), note: "Pagination cap per query".into() },
            SettingStatus { name: "retmax".into(), value: self.retmax.to_string(), note: "Trial filter result cap".into() },
        ]
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SettingStatus {
    pub name: String,
    pub value: String,
    pub note: String,
}

fn parse_or(key: &str, raw: Option<String>, default: u32) -> u32 {
    match raw {
        None => default,
        Some(v) => v.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring {}={:?}: not a positive integer", key, v);
            default
        }),
    }
}
