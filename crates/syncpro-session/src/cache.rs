use chrono::{DateTime, SubsecRound, Utc};
use syncpro_core::{Exchange, SyncproError, SyncproResult};

/// In-memory mirror of the transcript for one interactive session.
///
/// This is what the user sees and what gets exported, even when it has
/// drifted from the store after a failed append. It performs no I/O.
#[derive(Debug, Default)]
pub struct SessionCache {
    exchanges: Vec<Exchange>,
    hydrated: bool,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the contents with the stored transcript. Allowed once per
    /// session, before anything has been appended.
    pub fn hydrate(&mut self, exchanges: Vec<Exchange>) -> SyncproResult<()> {
        if self.hydrated {
            return Err(SyncproError::Session(
                "session cache is already hydrated".into(),
            ));
        }
        if !self.exchanges.is_empty() {
            return Err(SyncproError::Session(
                "cannot hydrate a session cache after appending".into(),
            ));
        }
        self.exchanges = exchanges;
        self.hydrated = true;
        Ok(())
    }

    pub fn append(&mut self, exchange: Exchange) {
        self.exchanges.push(exchange);
    }

    /// Timestamp for the next exchange: `now` at the microsecond precision
    /// the stores keep, never earlier than the last cached exchange. Stores
    /// keep such a timestamp unchanged, so cache and store agree.
    pub fn next_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let now = now.trunc_subsecs(6);
        match self.exchanges.last().and_then(|e| e.timestamp) {
            Some(last) if last > now => last,
            _ => now,
        }
    }

    pub fn clear(&mut self) {
        self.exchanges.clear();
    }

    pub fn read_all(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn ex(q: &str) -> Exchange {
        Exchange::new(q, format!("re: {q}"), "M", "en")
    }

    #[test]
    fn hydrate_replaces_contents() {
        let mut cache = SessionCache::new();
        cache.hydrate(vec![ex("a"), ex("b")]).unwrap();
        assert!(cache.is_hydrated());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.read_all()[0].question, "a");
        assert_eq!(cache.read_all()[1].question, "b");
    }

    #[test]
    fn hydrate_twice_is_rejected() {
        let mut cache = SessionCache::new();
        cache.hydrate(Vec::new()).unwrap();
        let err = cache.hydrate(vec![ex("late")]).unwrap_err();
        assert!(matches!(err, SyncproError::Session(_)));
        assert!(cache.is_empty());
    }

    #[test]
    fn hydrate_after_append_is_rejected() {
        let mut cache = SessionCache::new();
        cache.append(ex("first"));
        assert!(cache.hydrate(vec![ex("stored")]).is_err());
        assert_eq!(cache.read_all()[0].question, "first");
    }

    #[test]
    fn append_keeps_order_and_clear_empties() {
        let mut cache = SessionCache::new();
        cache.hydrate(vec![ex("a")]).unwrap();
        cache.append(ex("b"));
        cache.append(ex("c"));
        let questions: Vec<&str> = cache.read_all().iter().map(|e| e.question.as_str()).collect();
        assert_eq!(questions, ["a", "b", "c"]);

        cache.clear();
        assert!(cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn next_timestamp_is_truncated_and_monotonic() {
        let now = Utc::now();
        let mut cache = SessionCache::new();
        let first = cache.next_timestamp(now);
        assert_eq!(first.timestamp_micros(), now.timestamp_micros());
        assert_eq!(first.timestamp_subsec_nanos() % 1_000, 0);

        cache.append(ex("a").with_timestamp(first));
        let earlier = now - chrono::Duration::seconds(30);
        assert_eq!(cache.next_timestamp(earlier), first);
    }
}
