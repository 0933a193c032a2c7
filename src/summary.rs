use std::collections::BTreeMap;

use serde::Serialize;

use crate::pipeline::{EnrichedCitationSet, EnrichedWork};

/// Citation counts for one publication year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct YearCount {
    /// `None` collects works without a publication year.
    pub year: Option<i32>,
    pub trials: usize,
    pub other: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitationSummary {
    pub total: usize,
    pub trials: usize,
    pub year_range: Option<(i32, i32)>,
    pub by_year: Vec<YearCount>,
}

/// Row filter applied to an enriched set. Bounds are inclusive.
#[derive(Debug, Clone, Copy, Default)]
pub struct CitationFilter {
    pub only_trials: bool,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
}

impl CitationFilter {
    fn has_year_bound(&self) -> bool {
        self.year_from.is_some() || self.year_to.is_some()
    }

    pub fn matches(&self, w: &EnrichedWork) -> bool {
        if self.only_trials && !w.is_trial {
            return false;
        }
        match w.work.year {
            Some(y) => {
                self.year_from.map_or(true, |from| y >= from)
                    && self.year_to.map_or(true, |to| y <= to)
            }
            None => !self.has_year_bound(),
        }
    }
}

impl EnrichedCitationSet {
    /// Smallest and largest publication year, if any work has one.
    pub fn year_range(&self) -> Option<(i32, i32)> {
        let mut years = self.works.iter().filter_map(|w| w.work.year);
        let first = years.next()?;
        Some(years.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y))))
    }

    /// Keep matching works in their original order.
    pub fn filtered(&self, filter: &CitationFilter) -> EnrichedCitationSet {
        EnrichedCitationSet {
            works: self.works.iter().filter(|w| filter.matches(w)).cloned().collect(),
        }
    }

    pub fn summary(&self) -> CitationSummary {
        let mut buckets: BTreeMap<Option<i32>, YearCount> = BTreeMap::new();
        for w in &self.works {
            let entry = buckets.entry(w.work.year).or_insert_with(|| YearCount {
                year: w.work.year,
                ..Default::default()
            });
            if w.is_trial {
                entry.trials += 1;
            } else {
                entry.other += 1;
            }
        }

        // BTreeMap puts None first; unknown years go last.
        let mut by_year: Vec<YearCount> = buckets.into_values().collect();
        by_year.sort_by_key(|c| (c.year.is_none(), c.year));

        CitationSummary {
            total: self.len(),
            trials: self.trial_count(),
            year_range: self.year_range(),
            by_year,
        }
    }
}
