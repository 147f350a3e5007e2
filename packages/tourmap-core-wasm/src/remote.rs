use log::{debug, error};

use crate::error::{DashboardError, Result};

/// Observable state of a remotely fetched value.
#[derive(Clone, Debug, PartialEq)]
pub enum LoadState<T> {
    Idle,
    Loading,
    Error(String),
    Loaded(T),
}

/// Handed out by [`RemoteResource::begin`]; only the most recent ticket may
/// settle the resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Loading/error/loaded tracking with request-id fencing so an older
/// response that resolves late never overwrites a newer one.
#[derive(Clone, Debug)]
pub struct RemoteResource<T> {
    state: LoadState<T>,
    latest: u64,
}

impl<T> Default for RemoteResource<T> {
    fn default() -> Self {
        Self {
            state: LoadState::Idle,
            latest: 0,
        }
    }
}

impl<T> RemoteResource<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request. Clears any previous error or payload.
    pub fn begin(&mut self) -> RequestTicket {
        self.latest += 1;
        self.state = LoadState::Loading;
        RequestTicket(self.latest)
    }

    /// Settle the request for `ticket`. Returns `false` when the ticket was
    /// superseded and the result dropped.
    pub fn finish(&mut self, ticket: RequestTicket, result: Result<T>) -> bool {
        if ticket.0 != self.latest {
            debug!(
                "Dropping stale response for request {} (latest is {})",
                ticket.0, self.latest
            );
            return false;
        }
        self.state = match result {
            Ok(value) => LoadState::Loaded(value),
            Err(e) => {
                error!("Request {} failed: {}", ticket.0, e);
                LoadState::Error(e.user_message())
            }
        };
        true
    }

    /// Like [`finish`](Self::finish) but with a caller-provided message for
    /// the error case.
    pub fn finish_with(
        &mut self,
        ticket: RequestTicket,
        result: Result<T>,
        message: impl FnOnce(&DashboardError) -> String,
    ) -> bool {
        match result {
            Ok(value) => self.finish(ticket, Ok(value)),
            Err(e) => {
                if ticket.0 != self.latest {
                    return self.finish(ticket, Err(e));
                }
                error!("Request {} failed: {}", ticket.0, e);
                self.state = LoadState::Error(message(&e));
                true
            }
        }
    }

    pub fn state(&self) -> &LoadState<T> {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, LoadState::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            LoadState::Error(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match &self.state {
            LoadState::Loaded(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_resets_previous_outcome() {
        let mut res = RemoteResource::<u32>::new();
        let t = res.begin();
        assert!(res.finish(t, Err(DashboardError::HttpStatus(500))));
        assert_eq!(res.error(), Some("HTTP error! status: 500"));

        let t = res.begin();
        assert!(res.is_loading());
        assert_eq!(res.error(), None);
        assert!(res.finish(t, Ok(7)));
        assert_eq!(res.value(), Some(&7));
    }

    #[test]
    fn test_overlapping_requests_last_started_wins() {
        let mut res = RemoteResource::<&str>::new();
        let first = res.begin();
        let second = res.begin();
        // Second resolves first, then the stale first one arrives
        assert!(res.finish(second, Ok("fresh")));
        assert!(!res.finish(first, Ok("stale")));
        assert_eq!(res.value(), Some(&"fresh"));

        let third = res.begin();
        let fourth = res.begin();
        assert!(!res.finish(third, Err(DashboardError::Network("x".into()))));
        assert!(res.is_loading());
        assert!(res.finish(fourth, Ok("newest")));
    }

    #[test]
    fn test_custom_error_message_is_fenced() {
        let mut res = RemoteResource::<u8>::new();
        assert_eq!(res.state(), &LoadState::Idle);
        let t = res.begin();
        assert!(res.finish_with(t, Err(DashboardError::HttpStatus(404)), |_| "custom".into()));
        assert_eq!(res.error(), Some("custom"));

        let stale = res.begin();
        let current = res.begin();
        assert!(!res.finish_with(stale, Err(DashboardError::HttpStatus(500)), |_| "old".into()));
        assert!(res.is_loading());
        assert!(res.finish(current, Ok(1)));
        assert_eq!(res.state(), &LoadState::Loaded(1));
    }
}
