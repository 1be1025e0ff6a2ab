use crate::models::{DetailBatch, DetailOutcome, ListingBatch, ListingItem, OutcomeKind};

/// Counts of each outcome kind in a detail batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeTally {
    pub detail: usize,
    pub blocked: usize,
    pub failed: usize,
}

/// Collects per-item outcomes in visit order.
///
/// Nothing is filtered: blocked and failed items occupy the same slot their
/// input item did, so `results[i]` always describes `items[i]`.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    results: Vec<DetailOutcome>,
    tally: OutcomeTally,
}

impl ResultAggregator {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            results: Vec::with_capacity(capacity),
            tally: OutcomeTally::default(),
        }
    }

    pub fn record(&mut self, outcome: DetailOutcome) {
        match outcome.kind() {
            OutcomeKind::Detail => self.tally.detail += 1,
            OutcomeKind::Blocked => self.tally.blocked += 1,
            OutcomeKind::Failed => self.tally.failed += 1,
        }
        self.results.push(outcome);
    }

    pub fn tally(&self) -> OutcomeTally {
        self.tally
    }

    pub fn finish(self) -> DetailBatch {
        DetailBatch {
            ok: true,
            count: self.results.len(),
            results: self.results,
        }
    }
}

impl From<Vec<ListingItem>> for ListingBatch {
    fn from(jobs: Vec<ListingItem>) -> Self {
        Self {
            ok: true,
            count: jobs.len(),
            jobs,
        }
    }
}
