//! Resource limits and cancellation for the generic search.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared flag another thread can raise to abandon a search.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Limits on one generic decomposition call. Every field defaults to unlimited.
#[derive(Debug, Clone, Default)]
pub struct SearchBudget {
    pub max_classes: Option<usize>,
    pub max_candidates: Option<usize>,
    pub deadline: Option<Instant>,
    pub cancel: CancelFlag,
}

/// Progress counters checked against a [`SearchBudget`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub classes: usize,
    pub candidates: usize,
    pub queries: u64,
}

impl SearchBudget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_max_classes(mut self, max_classes: usize) -> Self {
        self.max_classes = Some(max_classes);
        self
    }

    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = Some(max_candidates);
        self
    }

    /// Deadline `timeout_secs` from now; 0 leaves the deadline unset.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.deadline = deadline_from_timeout_secs(timeout_secs);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Why the search must stop now, if it must.
    pub fn exhausted(&self, stats: &SearchStats) -> Option<String> {
        if self.cancel.is_cancelled() {
            return Some("search cancelled".into());
        }
        if deadline_exceeded(self.deadline) {
            return Some("search deadline reached".into());
        }
        if let Some(max) = self.max_classes {
            if stats.classes > max {
                return Some(format!("more than {max} equivalence classes"));
            }
        }
        if let Some(max) = self.max_candidates {
            if stats.candidates > max {
                return Some(format!("more than {max} candidates examined"));
            }
        }
        None
    }
}

pub(crate) fn deadline_exceeded(deadline: Option<Instant>) -> bool {
    match deadline {
        Some(deadline) => Instant::now() >= deadline,
        None => false,
    }
}

pub(crate) fn deadline_from_timeout_secs(timeout_secs: u64) -> Option<Instant> {
    if timeout_secs == 0 {
        return None;
    }
    Instant::now().checked_add(Duration::from_secs(timeout_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_budget_never_exhausts() {
        let budget = SearchBudget::unlimited();
        let stats = SearchStats {
            classes: 10_000,
            candidates: 10_000,
            queries: 1 << 40,
        };
        assert_eq!(budget.exhausted(&stats), None);
    }

    #[test]
    fn class_limit_allows_exactly_max() {
        let budget = SearchBudget::unlimited().with_max_classes(2);
        let mut stats = SearchStats {
            classes: 2,
            ..SearchStats::default()
        };
        assert_eq!(budget.exhausted(&stats), None);
        stats.classes = 3;
        assert!(budget.exhausted(&stats).unwrap().contains("2 equivalence classes"));
    }

    #[test]
    fn candidate_limit() {
        let budget = SearchBudget::unlimited().with_max_candidates(0);
        let stats = SearchStats {
            candidates: 1,
            ..SearchStats::default()
        };
        assert!(budget.exhausted(&stats).is_some());
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let budget = SearchBudget::unlimited().with_cancel(flag.clone());
        assert_eq!(budget.exhausted(&SearchStats::default()), None);
        flag.cancel();
        assert_eq!(
            budget.exhausted(&SearchStats::default()).as_deref(),
            Some("search cancelled")
        );
    }

    #[test]
    fn past_deadline_is_exhausted() {
        let budget = SearchBudget {
            deadline: Some(Instant::now()),
            ..SearchBudget::default()
        };
        assert!(budget.exhausted(&SearchStats::default()).is_some());
    }

    #[test]
    fn zero_timeout_means_no_deadline() {
        assert!(deadline_from_timeout_secs(0).is_none());
        assert!(!deadline_exceeded(None));
        let future = Instant::now() + Duration::from_secs(60);
        assert!(!deadline_exceeded(Some(future)));
    }
}
