use std::collections::HashSet;

use crate::apis::{SourceError, TrialSearch};

const PMID_URI_PREFIX: &str = "https://pubmed.ncbi.nlm.nih.gov/";

/// Publication-type filter that restricts esearch hits to clinical trials.
pub const TRIAL_FILTER: &str = "clinicaltrial[Filter]";

pub const DEFAULT_RETMAX: u32 = 10_000;

/// Strip the PubMed URI prefix from a PMID. Blank values yield `None`.
pub fn normalize_pmid(raw: &str) -> Option<String> {
    let id = raw.trim();
    let id = id.strip_prefix(PMID_URI_PREFIX).unwrap_or(id).trim_end_matches('/');
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// `(1[pmid] OR 2[pmid] ...) AND (clinicaltrial[Filter])`
pub fn build_trial_query(pmids: &[String]) -> String {
    let terms: Vec<String> = pmids.iter().map(|p| format!("{}[pmid]", p)).collect();
    format!("({}) AND ({})", terms.join(" OR "), TRIAL_FILTER)
}

/// Return the ids the trial filter reports as clinical trials for
/// `candidates`, using one batched query. The reported ids are returned as
/// is. Empty input issues no request.
pub async fn classify<S: AsRef<str>>(
    search: &dyn TrialSearch,
    candidates: &[S],
    retmax: u32,
) -> Result<HashSet<String>, SourceError> {
    let mut seen = HashSet::new();
    let pmids: Vec<String> = candidates
        .iter()
        .filter_map(|c| normalize_pmid(c.as_ref()))
        .filter(|p| seen.insert(p.clone()))
        .collect();

    if pmids.is_empty() {
        return Ok(HashSet::new());
    }

    let result = search.search(&build_trial_query(&pmids), retmax).await?;
    if let Some(count) = result.count {
        if count > result.ids.len() as u64 {
            tracing::warn!(
                "{} reported {} trials but returned {} (retmax {})",
                search.name(),
                count,
                result.ids.len(),
                retmax
            );
        }
    }
    tracing::debug!("{} of {} candidates are trials", result.ids.len(), pmids.len());
    Ok(result.ids.into_iter().collect())
}
