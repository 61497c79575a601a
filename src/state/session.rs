use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::{EVENTS_TTL_SECS, ODDS_TTL_SECS};
use crate::fetcher::ApiCredits;
use crate::types::{EventStub, MarketMode, RawEvent};

/// Explicit per-session state: TTL caches over the metered upstream plus the
/// last-seen credit counters. Every request handler receives this object;
/// there is no global mutable state.
///
/// Invalidation paths are TTL expiry and the operator's force-refresh action,
/// nothing else. Odds entries are keyed by (event, market family), so a mode
/// switch never reads a stale entry from the other family.
pub struct SessionState {
    /// Full event slate, refreshed on a minutes-to-hour cadence.
    events: Mutex<Option<CachedEvents>>,
    /// Cached odds payloads keyed by (event_id, market family), tens-of-seconds TTL.
    odds: DashMap<(String, MarketMode), CachedOdds>,
    credits: Mutex<ApiCredits>,
    /// Display timestamp of the last snapshot seen (saved or loaded).
    snapshot_timestamp: Mutex<Option<String>>,
}

struct CachedEvents {
    fetched_at: Instant,
    events: Vec<EventStub>,
}

struct CachedOdds {
    fetched_at: Instant,
    event: RawEvent,
}

impl SessionState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(None),
            odds: DashMap::new(),
            credits: Mutex::new(ApiCredits::default()),
            snapshot_timestamp: Mutex::new(None),
        })
    }

    /// The cached event slate, if still within TTL.
    pub fn cached_events(&self) -> Option<Vec<EventStub>> {
        let guard = self.events.lock().unwrap();
        let cached = guard.as_ref()?;
        if cached.fetched_at.elapsed() > Duration::from_secs(EVENTS_TTL_SECS) {
            return None;
        }
        Some(cached.events.clone())
    }

    pub fn store_events(&self, events: Vec<EventStub>) {
        *self.events.lock().unwrap() = Some(CachedEvents {
            fetched_at: Instant::now(),
            events,
        });
    }

    /// Age of the event cache in seconds, for the status surface.
    pub fn events_age_secs(&self) -> Option<u64> {
        let guard = self.events.lock().unwrap();
        guard.as_ref().map(|c| c.fetched_at.elapsed().as_secs())
    }

    pub fn cached_odds(&self, event_id: &str, mode: MarketMode) -> Option<RawEvent> {
        let key = (event_id.to_string(), mode);
        let cached = self.odds.get(&key)?;
        if cached.fetched_at.elapsed() > Duration::from_secs(ODDS_TTL_SECS) {
            drop(cached);
            self.odds.remove(&key);
            return None;
        }
        Some(cached.event.clone())
    }

    pub fn store_odds(&self, event_id: &str, mode: MarketMode, event: RawEvent) {
        self.odds.insert(
            (event_id.to_string(), mode),
            CachedOdds {
                fetched_at: Instant::now(),
                event,
            },
        );
    }

    pub fn odds_cache_len(&self) -> usize {
        self.odds.len()
    }

    /// Keep the latest non-empty credit counters from response headers.
    pub fn record_credits(&self, credits: &ApiCredits) {
        let mut guard = self.credits.lock().unwrap();
        if credits.remaining.is_some() {
            guard.remaining = credits.remaining.clone();
        }
        if credits.used.is_some() {
            guard.used = credits.used.clone();
        }
    }

    pub fn credits(&self) -> ApiCredits {
        self.credits.lock().unwrap().clone()
    }

    pub fn record_snapshot_timestamp(&self, ts: &str) {
        *self.snapshot_timestamp.lock().unwrap() = Some(ts.to_string());
    }

    pub fn snapshot_timestamp(&self) -> Option<String> {
        self.snapshot_timestamp.lock().unwrap().clone()
    }

    /// Operator-triggered invalidation: drop both caches so the next scan
    /// hits the provider. Credit counters survive; they describe the
    /// account, not the cache.
    pub fn force_refresh(&self) {
        *self.events.lock().unwrap() = None;
        self.odds.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub(id: &str) -> EventStub {
        EventStub {
            id: id.to_string(),
            home_team: "Celtics".to_string(),
            away_team: "Lakers".to_string(),
            commence_time: None,
        }
    }

    #[test]
    fn events_round_trip_within_ttl() {
        let state = SessionState::new();
        assert!(state.cached_events().is_none());

        state.store_events(vec![stub("e1"), stub("e2")]);
        let cached = state.cached_events().expect("fresh cache");
        assert_eq!(cached.len(), 2);
    }

    #[test]
    fn odds_keyed_by_event_and_market_family() {
        let state = SessionState::new();
        let event = RawEvent {
            id: "e1".to_string(),
            ..Default::default()
        };
        state.store_odds("e1", MarketMode::Props, event);

        assert!(state.cached_odds("e1", MarketMode::Props).is_some());
        assert!(state.cached_odds("e1", MarketMode::Totals).is_none());
        assert!(state.cached_odds("e2", MarketMode::Props).is_none());
    }

    #[test]
    fn force_refresh_clears_caches_but_keeps_credits() {
        let state = SessionState::new();
        state.store_events(vec![stub("e1")]);
        state.store_odds("e1", MarketMode::Props, RawEvent::default());
        state.record_credits(&ApiCredits {
            remaining: Some("410".to_string()),
            used: Some("90".to_string()),
        });

        state.force_refresh();

        assert!(state.cached_events().is_none());
        assert_eq!(state.odds_cache_len(), 0);
        assert_eq!(state.credits().remaining.as_deref(), Some("410"));
    }

    #[test]
    fn credit_update_ignores_empty_headers() {
        let state = SessionState::new();
        state.record_credits(&ApiCredits {
            remaining: Some("400".to_string()),
            used: None,
        });
        state.record_credits(&ApiCredits::default());

        assert_eq!(state.credits().remaining.as_deref(), Some("400"));
    }
}
