/// Trailing-edge debounce over an explicit millisecond clock. The browser
/// side arms a `setTimeout` for [`delay_ms`](Self::delay_ms) and calls
/// [`poll`](Self::poll) when it fires.
#[derive(Clone, Debug, PartialEq)]
pub struct Debouncer<T> {
    delay_ms: f64,
    pending: Option<(f64, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay_ms: u32) -> Self {
        Self {
            delay_ms: delay_ms as f64,
            pending: None,
        }
    }

    pub fn delay_ms(&self) -> u32 {
        self.delay_ms as u32
    }

    /// Replace whatever is pending; the deadline restarts from `now`.
    pub fn schedule(&mut self, value: T, now: f64) {
        self.pending = Some((now + self.delay_ms, value));
    }

    /// The pending value, once its deadline has passed.
    pub fn poll(&mut self, now: f64) -> Option<T> {
        match &self.pending {
            Some((deadline, _)) if now >= *deadline => self.pending.take().map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_last_value_fires() {
        let mut d = Debouncer::new(500);
        d.schedule("n", 0.0);
        d.schedule("nai", 200.0);
        assert_eq!(d.poll(500.0), None);
        assert_eq!(d.poll(700.0), Some("nai"));
        assert_eq!(d.poll(1_000.0), None);
    }

    #[test]
    fn test_cancel() {
        let mut d = Debouncer::new(500);
        d.schedule(1, 0.0);
        d.cancel();
        assert_eq!(d.poll(10_000.0), None);
    }
}
