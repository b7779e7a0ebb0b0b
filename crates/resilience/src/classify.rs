//! Maps caught activity errors to recovery decisions.

use gramflow_core_types::ActivityError;

/// What the caller should do about a failed step.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorDecision {
    /// Stop this account's traversal. Not retried.
    Abort,

    /// Tear the session down and, if the restart budget allows, re-acquire
    /// a fresh one. Never swallowed silently.
    RestartBrowser,

    /// Sleep a long randomized interval and try again without consuming
    /// retry budget.
    BackoffAndSlow,

    /// Retry with exponential backoff, bounded attempts.
    Retry,
}

/// Classify one error into a recovery decision.
///
/// Unclassified errors abort: a bug must fail loud, never spin in a retry
/// loop.
pub fn classify(error: &ActivityError) -> ErrorDecision {
    match error {
        ActivityError::Fatal(_) => ErrorDecision::Abort,
        ActivityError::BrowserGone(_) | ActivityError::ContextClosed => {
            ErrorDecision::RestartBrowser
        }
        ActivityError::RateLimited(_) => ErrorDecision::BackoffAndSlow,
        ActivityError::Timeout(_)
        | ActivityError::ElementNotFound(_)
        | ActivityError::Network(_)
        | ActivityError::Proxy(_) => ErrorDecision::Retry,
        ActivityError::Other(_) => ErrorDecision::Abort,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_and_unknown_abort() {
        assert_eq!(
            classify(&ActivityError::Fatal("banned".into())),
            ErrorDecision::Abort
        );
        assert_eq!(
            classify(&ActivityError::Other("surprise".into())),
            ErrorDecision::Abort
        );
    }

    #[test]
    fn crash_restarts_browser() {
        assert_eq!(
            classify(&ActivityError::BrowserGone("target crashed".into())),
            ErrorDecision::RestartBrowser
        );
        assert_eq!(
            classify(&ActivityError::ContextClosed),
            ErrorDecision::RestartBrowser
        );
    }

    #[test]
    fn rate_limit_backs_off() {
        assert_eq!(
            classify(&ActivityError::RateLimited("try later".into())),
            ErrorDecision::BackoffAndSlow
        );
    }

    #[test]
    fn transient_errors_retry() {
        for err in [
            ActivityError::Timeout("nav".into()),
            ActivityError::ElementNotFound("like button".into()),
            ActivityError::Network("reset".into()),
            ActivityError::Proxy("502 from upstream".into()),
        ] {
            assert_eq!(classify(&err), ErrorDecision::Retry);
        }
    }
}
