//! Entity search feeding the selection, with debouncing and cancellation of
//! superseded queries.

use game_model::{EntityId, GameSnapshot};
use std::time::{Duration, Instant};

use crate::config::EngineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchRank {
    Exact,
    Prefix,
    Contains,
}

fn rank(haystack: &str, needle: &str) -> Option<MatchRank> {
    let haystack = haystack.to_lowercase();
    if haystack == needle {
        Some(MatchRank::Exact)
    } else if haystack.starts_with(needle) {
        Some(MatchRank::Prefix)
    } else if haystack.contains(needle) {
        Some(MatchRank::Contains)
    } else {
        None
    }
}

/// Case-insensitive search over display labels and ids.
///
/// Exact matches rank before prefix matches, which rank before substring
/// matches; ties are ordered by id. A blank query matches nothing.
pub fn search_entities(snapshot: &GameSnapshot, query: &str, limit: usize) -> Vec<EntityId> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<(MatchRank, &EntityId)> = snapshot
        .entities()
        .iter()
        .filter_map(|entity| {
            let by_label = rank(&entity.display_label(), &needle);
            let by_id = rank(entity.id.as_str(), &needle);
            let best = match (by_label, by_id) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
            best.map(|r| (r, &entity.id))
        })
        .collect();
    hits.sort();
    hits.into_iter().take(limit).map(|(_, id)| id.clone()).collect()
}

/// Handle for one debounced query. Only the newest ticket is current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub query: String,
    generation: u64,
}

/// Holds back queries until input has been quiet for the debounce delay.
#[derive(Debug, Clone)]
pub struct SearchDebouncer {
    delay: Duration,
    pending: Option<(String, Instant)>,
    generation: u64,
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            generation: 0,
        }
    }

    /// Record a new query, superseding every earlier one.
    pub fn input(&mut self, query: impl Into<String>, now: Instant) {
        self.generation += 1;
        self.pending = Some((query.into(), now));
    }

    /// Issue a ticket once the pending query has been quiet long enough.
    pub fn poll(&mut self, now: Instant) -> Option<SearchTicket> {
        let (_, at) = self.pending.as_ref()?;
        if now.saturating_duration_since(*at) < self.delay {
            return None;
        }
        let (query, _) = self.pending.take()?;
        Some(SearchTicket {
            query,
            generation: self.generation,
        })
    }

    /// Whether no newer query has arrived since the ticket was issued.
    pub fn is_current(&self, ticket: &SearchTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Drop the pending query and invalidate outstanding tickets.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.pending = None;
    }
}

/// A search box: debounced input, ranked results, stale results discarded.
#[derive(Debug, Clone)]
pub struct SearchSession {
    debouncer: SearchDebouncer,
    max_results: usize,
}

impl SearchSession {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            debouncer: SearchDebouncer::new(config.search.debounce()),
            max_results: config.search.max_results,
        }
    }

    pub fn input(&mut self, query: impl Into<String>, now: Instant) {
        self.debouncer.input(query, now);
    }

    pub fn poll(&mut self, now: Instant) -> Option<SearchTicket> {
        self.debouncer.poll(now)
    }

    pub fn cancel(&mut self) {
        self.debouncer.cancel();
    }

    /// Accept results for a ticket, capped at the configured maximum, or
    /// `None` if the ticket has been superseded.
    pub fn resolve(
        &self,
        ticket: &SearchTicket,
        mut results: Vec<EntityId>,
    ) -> Option<Vec<EntityId>> {
        if self.debouncer.is_current(ticket) {
            results.truncate(self.max_results);
            Some(results)
        } else {
            tracing::trace!(
                target: "graph_core::search",
                query = %ticket.query,
                "search.superseded"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_model::Entity;

    fn snapshot() -> GameSnapshot {
        GameSnapshot::new([
            Entity::character("c-marcus", "Marcus"),
            Entity::character("c-mara", "Mara"),
            Entity::element("e-note", "Marcus's Note"),
            Entity::element("e-box", "Lockbox"),
            Entity::puzzle("p-safe", "Mar"),
        ])
    }

    fn ids(found: Vec<EntityId>) -> Vec<String> {
        found.into_iter().map(|id| id.0).collect()
    }

    #[test]
    fn test_ranking() {
        let found = search_entities(&snapshot(), "MAR", 10);
        assert_eq!(ids(found), vec!["p-safe", "c-mara", "c-marcus", "e-note"]);
    }

    #[test]
    fn test_matches_id_and_limit() {
        let found = search_entities(&snapshot(), "e-", 1);
        assert_eq!(ids(found), vec!["e-box"]);
        assert!(search_entities(&snapshot(), "   ", 10).is_empty());
    }

    #[test]
    fn test_debounce_waits_for_quiet() {
        let start = Instant::now();
        let mut debouncer = SearchDebouncer::new(Duration::from_millis(300));
        debouncer.input("ma", start);
        debouncer.input("mar", start + Duration::from_millis(100));

        assert!(debouncer.poll(start + Duration::from_millis(300)).is_none());
        let ticket = debouncer.poll(start + Duration::from_millis(400)).unwrap();
        assert_eq!(ticket.query, "mar");
        assert!(debouncer.poll(start + Duration::from_millis(900)).is_none());
    }

    #[test]
    fn test_superseded_results_discarded() {
        let start = Instant::now();
        let snapshot = snapshot();
        let mut session = SearchSession::new(&EngineConfig::default());
        session.input("lock", start);
        let ticket = session.poll(start + Duration::from_secs(1)).unwrap();
        let results = search_entities(&snapshot, &ticket.query, usize::MAX);

        session.input("marcus", start + Duration::from_secs(2));
        assert!(session.resolve(&ticket, results.clone()).is_none());

        let fresh = session.poll(start + Duration::from_secs(3)).unwrap();
        let fresh_results = search_entities(&snapshot, &fresh.query, usize::MAX);
        assert_eq!(
            session.resolve(&fresh, fresh_results).map(ids),
            Some(vec!["c-marcus".to_string(), "e-note".to_string()])
        );
    }

    #[test]
    fn test_resolve_caps_results() {
        let start = Instant::now();
        let config = EngineConfig {
            search: crate::config::SearchConfig {
                max_results: 2,
                ..Default::default()
            },
            ..EngineConfig::default()
        };
        let mut session = SearchSession::new(&config);
        session.input("mar", start);
        let ticket = session.poll(start + Duration::from_secs(1)).unwrap();

        let results = search_entities(&snapshot(), &ticket.query, usize::MAX);
        assert_eq!(
            session.resolve(&ticket, results).map(ids),
            Some(vec!["p-safe".to_string(), "c-mara".to_string()])
        );
    }

    #[test]
    fn test_cancel_invalidates_ticket() {
        let start = Instant::now();
        let mut session = SearchSession::new(&EngineConfig::default());
        session.input("box", start);
        let ticket = session.poll(start + Duration::from_secs(1)).unwrap();
        session.cancel();
        assert!(session.resolve(&ticket, Vec::new()).is_none());
    }
}
