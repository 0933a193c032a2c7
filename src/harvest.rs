use std::collections::HashSet;

use crate::apis::{SourceError, Work, WorkId, WorkIndex};

const WORK_URI_PREFIX: &str = "https://openalex.org/";

/// Cursor value that starts a cursor-paginated query.
pub const INITIAL_CURSOR: &str = "*";

#[derive(Debug, Clone, Copy)]
pub struct HarvestOptions {
    pub per_page: u32,
    /// Upper bound on requested pages, in case the server never ends the chain.
    pub max_pages: u32,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self { per_page: 100, max_pages: 500 }
    }
}

/// Map a DOI to the bare id of the first matching work.
///
/// `Ok(None)` covers zero matches and a non-success lookup status; only
/// transport and decoding failures are errors.
pub async fn resolve(index: &dyn WorkIndex, doi: &str) -> Result<Option<WorkId>, SourceError> {
    let doi = doi.trim();
    if doi.is_empty() {
        return Ok(None);
    }
    let ids = index.lookup_doi(doi).await?;
    if ids.len() > 1 {
        tracing::debug!("{} works match {}, taking the first", ids.len(), doi);
    }
    Ok(ids
        .into_iter()
        .next()
        .flatten()
        .map(|id| strip_work_prefix(&id))
        .filter(|id| !id.is_empty())
        .map(WorkId))
}

fn strip_work_prefix(id: &str) -> String {
    id.strip_prefix(WORK_URI_PREFIX).unwrap_or(id).to_string()
}

/// Collect every work citing `work_id`, following cursors until the server
/// stops returning one. Records keep server order.
pub async fn harvest(
    index: &dyn WorkIndex,
    work_id: &WorkId,
    opts: HarvestOptions,
) -> Result<Vec<Work>, SourceError> {
    let mut works = Vec::new();
    let mut seen_cursors: HashSet<String> = HashSet::new();
    let mut cursor = INITIAL_CURSOR.to_string();
    let mut pages = 0u32;

    loop {
        let page = index.citing_page(work_id, &cursor, opts.per_page).await?;
        pages += 1;
        tracing::debug!(
            "{}: page {} for {} returned {} works",
            index.name(),
            pages,
            work_id,
            page.works.len()
        );
        works.extend(page.works);
        seen_cursors.insert(cursor);

        let Some(next) = page.next_cursor else { break };
        if seen_cursors.contains(&next) {
            tracing::warn!("{} repeated cursor {} for {}, stopping", index.name(), next, work_id);
            break;
        }
        if pages >= opts.max_pages {
            tracing::warn!(
                "Stopped harvesting {} after {} pages ({} works)",
                work_id,
                pages,
                works.len()
            );
            break;
        }
        cursor = next;
    }

    Ok(works)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::mock::{work, FakeIndex};

    #[tokio::test]
    async fn test_resolve_strips_prefix_and_takes_first() {
        let mut index = FakeIndex::default();
        index.lookups.insert(
            "10.1000/x".into(),
            vec![Some("https://openalex.org/W1".into()), Some("https://openalex.org/W2".into())],
        );
        let id = resolve(&index, "10.1000/x").await.unwrap();
        assert_eq!(id, Some(WorkId("W1".into())));
    }

    #[tokio::test]
    async fn test_resolve_first_result_without_id_is_not_found() {
        let mut index = FakeIndex::default();
        index.lookups.insert(
            "10.1000/x".into(),
            vec![None, Some("https://openalex.org/W2".into())],
        );
        assert_eq!(resolve(&index, "10.1000/x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_resolve_not_found() {
        let index = FakeIndex::default();
        assert_eq!(resolve(&index, "10.1000/missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_resolve_blank_input_skips_lookup() {
        let index = FakeIndex::default();
        assert_eq!(resolve(&index, "  ").await.unwrap(), None);
        assert!(index.lookup_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_harvest_follows_cursors_in_order() {
        let index = FakeIndex::default()
            .page("*", vec![work("A", Some("1"), None), work("B", Some("2"), None)], Some("c1"))
            .page("c1", vec![work("C", None, None), work("D", Some("4"), None)], Some("c2"))
            .page("c2", vec![work("E", Some("5"), None)], None);

        let works = harvest(&index, &WorkId("W1".into()), HarvestOptions::default())
            .await
            .unwrap();

        let dois: Vec<_> = works.iter().map(|w| w.doi.clone().unwrap()).collect();
        assert_eq!(dois, vec!["A", "B", "C", "D", "E"]);
        assert_eq!(index.cursors_requested(), vec!["*", "c1", "c2"]);
        let calls = index.page_calls.lock().unwrap();
        assert!(calls.iter().all(|(id, _, per_page)| id == "W1" && *per_page == 100));
    }

    #[tokio::test]
    async fn test_harvest_empty_result() {
        let index = FakeIndex::default().page("*", vec![], None);
        let works = harvest(&index, &WorkId("W1".into()), HarvestOptions::default())
            .await
            .unwrap();
        assert!(works.is_empty());
    }

    #[tokio::test]
    async fn test_harvest_stops_on_repeated_cursor() {
        let index = FakeIndex::default()
            .page("*", vec![work("A", None, None)], Some("c1"))
            .page("c1", vec![work("B", None, None)], Some("c1"));
        let works = harvest(&index, &WorkId("W1".into()), HarvestOptions::default())
            .await
            .unwrap();
        assert_eq!(works.len(), 2);
        assert_eq!(index.cursors_requested(), vec!["*", "c1"]);
    }

    #[tokio::test]
    async fn test_harvest_respects_page_cap() {
        let index = FakeIndex::default()
            .page("*", vec![work("A", None, None)], Some("c1"))
            .page("c1", vec![work("B", None, None)], Some("c2"))
            .page("c2", vec![work("C", None, None)], Some("c3"));
        let opts = HarvestOptions { per_page: 1, max_pages: 2 };
        let works = harvest(&index, &WorkId("W1".into()), opts).await.unwrap();
        assert_eq!(works.len(), 2);
        assert_eq!(index.cursors_requested().len(), 2);
    }

    #[tokio::test]
    async fn test_harvest_error_mid_pagination() {
        let mut index = FakeIndex::default()
            .page("*", vec![work("A", None, None)], Some("c1"));
        index.fail_on_cursor = Some("c1".into());
        let result = harvest(&index, &WorkId("W1".into()), HarvestOptions::default()).await;
        assert!(matches!(result, Err(SourceError::Api(_))));
    }
}
