//! The partial-failure policy for distributed rounds.

/// What the coordinator does when executors fail to answer a round.
///
/// The choice is explicit configuration: proceeding with a degraded quorum
/// and aborting the round are both legitimate, silently picking one is not.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Aggregate whatever subset responded, as long as at least
    /// `min_responders` executors did. Values below one are treated as one,
    /// an empty aggregate is meaningless.
    ProceedDegraded { min_responders: usize },
    /// Fail the round outright unless every executor responded, retrying it
    /// up to `max_retries` times.
    AbortRound { max_retries: usize },
}
