use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::apis::{SourceError, TrialSearch, Work, WorkIndex};
use crate::classify::{self, normalize_pmid};
use crate::harvest::{self, HarvestOptions};

/// Stage boundaries reported while a query runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Resolving,
    Harvesting,
    Normalizing,
    Classifying,
    Done,
}

/// User-facing query status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Idle,
    InProgress,
    NoData,
    Done,
}

impl Status {
    pub fn message(&self) -> &'static str {
        match self {
            Status::Idle => "",
            Status::InProgress => "Search in progress...",
            Status::NoData => "Invalid DOI or no data available",
            Status::Done => "Done",
        }
    }
}

/// Receives stage changes. Any `Fn(Stage)` closure works.
pub trait Progress: Send + Sync {
    fn stage(&self, stage: Stage);
}

impl<F: Fn(Stage) + Send + Sync> Progress for F {
    fn stage(&self, stage: Stage) {
        self(stage)
    }
}

/// Progress sink that only logs.
pub fn log_progress(stage: Stage) {
    tracing::info!(?stage, "pipeline stage");
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedWork {
    #[serde(flatten)]
    pub work: Work,
    pub is_trial: bool,
}

/// Citing works of one DOI, each flagged as clinical trial or not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedCitationSet {
    pub works: Vec<EnrichedWork>,
}

impl EnrichedCitationSet {
    pub fn is_empty(&self) -> bool {
        self.works.is_empty()
    }

    pub fn len(&self) -> usize {
        self.works.len()
    }

    pub fn trial_count(&self) -> usize {
        self.works.iter().filter(|w| w.is_trial).count()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub harvest: HarvestOptions,
    pub retmax: u32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            harvest: HarvestOptions::default(),
            retmax: classify::DEFAULT_RETMAX,
        }
    }
}

/// Normalize each work's PMID in place and return the non-empty ones.
pub fn normalize_works(works: &mut [Work]) -> Vec<String> {
    let mut candidates = Vec::new();
    for w in works.iter_mut() {
        w.pmid = w.pmid.as_deref().and_then(normalize_pmid);
        if let Some(pmid) = &w.pmid {
            candidates.push(pmid.clone());
        }
    }
    candidates
}

/// Flag every work whose PMID is in `trials`. Works without a PMID are never trials.
pub fn merge(works: Vec<Work>, trials: &HashSet<String>) -> EnrichedCitationSet {
    EnrichedCitationSet {
        works: works
            .into_iter()
            .map(|work| {
                let is_trial = work.pmid.as_ref().is_some_and(|p| trials.contains(p));
                EnrichedWork { work, is_trial }
            })
            .collect(),
    }
}

pub struct Pipeline {
    index: Arc<dyn WorkIndex>,
    trials: Arc<dyn TrialSearch>,
    opts: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        index: Arc<dyn WorkIndex>,
        trials: Arc<dyn TrialSearch>,
        opts: PipelineOptions,
    ) -> Self {
        Self { index, trials, opts }
    }

    pub fn index(&self) -> &dyn WorkIndex {
        self.index.as_ref()
    }

    pub fn trials(&self) -> &dyn TrialSearch {
        self.trials.as_ref()
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.opts
    }

    /// Run the whole chain for one DOI. Every failure, including an unknown
    /// DOI, collapses to an empty set.
    pub async fn fetch_enriched(&self, doi: &str, progress: &dyn Progress) -> EnrichedCitationSet {
        match self.run(doi, progress).await {
            Ok(set) => set,
            Err(e) => {
                tracing::warn!("Query for {} failed: {}", doi, e);
                EnrichedCitationSet::default()
            }
        }
    }

    async fn run(
        &self,
        doi: &str,
        progress: &dyn Progress,
    ) -> Result<EnrichedCitationSet, SourceError> {
        progress.stage(Stage::Resolving);
        let Some(work_id) = harvest::resolve(self.index.as_ref(), doi).await? else {
            tracing::info!("No work found for {}", doi);
            return Ok(EnrichedCitationSet::default());
        };

        progress.stage(Stage::Harvesting);
        let mut works = harvest::harvest(self.index.as_ref(), &work_id, self.opts.harvest).await?;
        if works.is_empty() {
            tracing::info!("No citing works for {} ({})", doi, work_id);
            return Ok(EnrichedCitationSet::default());
        }
        tracing::info!("Harvested {} citing works for {} ({})", works.len(), doi, work_id);

        progress.stage(Stage::Normalizing);
        let candidates = normalize_works(&mut works);

        progress.stage(Stage::Classifying);
        let trials = classify::classify(self.trials.as_ref(), &candidates, self.opts.retmax).await?;

        let enriched = merge(works, &trials);
        progress.stage(Stage::Done);
        Ok(enriched)
    }
}
