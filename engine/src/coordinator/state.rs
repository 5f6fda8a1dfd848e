use strum::Display;

/// Lifecycle of one view request.
///
/// ```text
/// Init -> FetchPrimary -> FetchSecondary -> Merge -> Done
///                      \-> Merge (views without secondary data)
///                      \-> Error
/// Init -> FetchSecondary (exports of analytics data)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestState {
    Init,
    FetchPrimary,
    FetchSecondary,
    Merge,
    Done,
    Error,
}

impl RequestState {
    pub fn can_transition_to(&self, next: RequestState) -> bool {
        use RequestState::*;
        matches!(
            (self, next),
            (Init, FetchPrimary)
                | (Init, FetchSecondary)
                | (FetchPrimary, FetchSecondary)
                | (FetchPrimary, Merge)
                | (FetchPrimary, Error)
                | (FetchSecondary, Merge)
                | (Merge, Done)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestState::Done | RequestState::Error)
    }
}

/// Follows one request through its states, logging each step.
#[derive(Debug)]
pub(crate) struct RequestTracker {
    view: &'static str,
    state: RequestState,
    degraded: bool,
}

impl RequestTracker {
    pub(crate) fn new(view: &'static str) -> Self {
        Self {
            view,
            state: RequestState::Init,
            degraded: false,
        }
    }

    pub(crate) fn state(&self) -> RequestState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: RequestState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {next} for {}",
            self.state,
            self.view
        );
        debug!(view = self.view, from = %self.state, to = %next, "request state");
        self.state = next;
    }

    pub(crate) fn mark_degraded(&mut self) {
        self.degraded = true;
    }

    pub(crate) fn is_degraded(&self) -> bool {
        self.degraded
    }
}
