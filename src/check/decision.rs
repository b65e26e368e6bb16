use crate::counters::ResponseTally;

/// "All requests failing" predicate applied to the system-wide tally of a pass
///
/// The stack is considered broken only if nothing succeeded and the server
/// errors exceed the configured tolerance. Client errors never count towards
/// the verdict: a flood of malformed requests is not a reason to restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureDecision {
    tolerance: u64,
}

impl FailureDecision {
    pub fn new(tolerance: u64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> u64 {
        self.tolerance
    }

    pub fn all_requests_failing(&self, total: &ResponseTally) -> bool {
        total.successes == 0 && total.server_errors > self.tolerance
    }
}
