//! Diff calculation against the seen-sets.
//!
//! Splits a batch of candidate postings into jobs that have never been
//! notified and postings that are already known, recording the new
//! fingerprints in the state as it goes. Because the same state is consulted
//! for every candidate, a duplicate later in the batch is classified as known.

use crate::models::{DedupState, NewJob, Posting};

/// Outcome of diffing one source's candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// Jobs not seen before, in candidate order
    pub new_jobs: Vec<NewJob>,
    /// Number of candidates that were already known
    pub known: usize,
}

impl DiffResult {
    /// Total number of candidates classified.
    pub fn total(&self) -> usize {
        self.new_jobs.len() + self.known
    }
}

/// Diff a source's candidates against `state`, recording new fingerprints.
///
/// Candidates are fingerprinted under `source`, whatever their own `source`
/// field says, so the seen-set key and the identity always agree.
pub fn diff(source: &str, candidates: &[Posting], state: &mut DedupState) -> DiffResult {
    let mut result = DiffResult::default();

    for candidate in candidates {
        let fingerprint =
            super::fingerprint::fingerprint(&candidate.title, source, &candidate.link);

        if state.insert(source, fingerprint) {
            log::info!("New posting [{}]: {}", source, candidate.title);
            result.new_jobs.push(NewJob {
                company: source.to_string(),
                title: candidate.title.clone(),
                link: candidate.link.clone(),
            });
        } else {
            result.known += 1;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(title: &str, link: &str) -> Posting {
        Posting::new("Acme", title, link)
    }

    #[test]
    fn test_empty_state_all_new() {
        let mut state = DedupState::new();
        let batch = vec![
            posting("UI Designer", "https://acme.test/1"),
            posting("UX Designer", "https://acme.test/2"),
        ];

        let result = diff("Acme", &batch, &mut state);
        assert_eq!(result.new_jobs.len(), 2);
        assert_eq!(result.known, 0);
        assert_eq!(state.seen_count("Acme"), 2);
        assert_eq!(result.new_jobs[0].title, "UI Designer");
        assert_eq!(result.new_jobs[1].title, "UX Designer");
    }

    #[test]
    fn test_known_posting_is_skipped() {
        let p = posting("UI Designer", "https://acme.test/1");
        let q = posting("Brand Designer", "https://acme.test/9");

        let mut state = DedupState::new();
        state.insert("Acme", p.fingerprint());

        let result = diff("Acme", &[p, q.clone()], &mut state);
        assert_eq!(result.new_jobs, vec![NewJob::from(q)]);
        assert_eq!(result.known, 1);
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let batch = vec![
            posting("UI Designer", "https://acme.test/1"),
            posting("UX Designer", "https://acme.test/2"),
        ];
        let mut state = DedupState::new();
        diff("Acme", &batch, &mut state);
        let after_first = state.clone();

        let result = diff("Acme", &batch, &mut state);
        assert!(result.new_jobs.is_empty());
        assert_eq!(result.known, 2);
        assert_eq!(state, after_first);
    }

    #[test]
    fn test_duplicates_within_batch() {
        let p = posting("UI Designer", "https://acme.test/1");
        let mut state = DedupState::new();

        let result = diff("Acme", &[p.clone(), p], &mut state);
        assert_eq!(result.new_jobs.len(), 1);
        assert_eq!(result.known, 1);
        assert_eq!(result.total(), 2);
        assert_eq!(state.seen_count("Acme"), 1);
    }

    #[test]
    fn test_sources_are_independent() {
        let p = posting("UI Designer", "https://shared.test/1");
        let mut state = DedupState::new();
        diff("Acme", std::slice::from_ref(&p), &mut state);

        let result = diff("Other", &[p], &mut state);
        assert_eq!(result.new_jobs.len(), 1);
        assert_eq!(result.new_jobs[0].company, "Other");
    }

    #[test]
    fn test_seen_set_never_shrinks() {
        let mut state = DedupState::new();
        let batches = [
            vec![posting("A Designer", "https://acme.test/a")],
            vec![],
            vec![
                posting("A Designer", "https://acme.test/a"),
                posting("B Designer", "https://acme.test/b"),
            ],
            vec![posting("C Designer", "https://acme.test/c")],
        ];

        let mut last = 0;
        for batch in &batches {
            diff("Acme", batch, &mut state);
            let size = state.seen_count("Acme");
            assert!(size >= last);
            last = size;
        }
        assert_eq!(last, 3);
    }
}
