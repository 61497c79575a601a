use std::collections::BTreeSet;

use tracing::debug;

use crate::config::TOTALS_MARKET;
use crate::keys::identity_key;
use crate::types::{FlatRecord, MarketMode, RawEvent, RawMarket};

/// Flattening output: one comparable record per (subject, market, bookmaker),
/// plus every bookmaker key seen in the payload. The observed set lets the
/// caller report "target not found, but we saw X, Y, Z" instead of silently
/// returning nothing.
#[derive(Debug, Default)]
pub struct Flattened {
    pub records: Vec<FlatRecord>,
    pub observed_bookmakers: BTreeSet<String>,
}

impl Flattened {
    pub fn target_was_seen(&self, target: &str) -> bool {
        self.observed_bookmakers.contains(target)
    }
}

/// Flatten a nested odds payload (events holding bookmakers holding markets
/// holding outcomes) into comparable records for the target bookmaker only.
///
/// In totals mode only the `totals` market is processed; in props mode the
/// totals market is excluded (a quote may carry both). Result order follows
/// input traversal order; no re-sort here.
pub fn flatten_events(events: &[RawEvent], target_bookmaker: &str, mode: MarketMode) -> Flattened {
    let mut out = Flattened::default();

    for event in events {
        let matchup = event.matchup();
        for quote in &event.bookmakers {
            out.observed_bookmakers.insert(quote.key.clone());
            if quote.key != target_bookmaker {
                continue;
            }
            for market in &quote.markets {
                let is_totals = market.key == TOTALS_MARKET;
                match mode {
                    MarketMode::Totals if !is_totals => continue,
                    MarketMode::Props if is_totals => continue,
                    _ => {}
                }
                flatten_market(market, mode, &matchup, &quote.title, &mut out.records);
            }
        }
    }

    debug!(
        records = out.records.len(),
        bookmakers = out.observed_bookmakers.len(),
        "flattened odds payload"
    );
    out
}

/// Emit one record per Over outcome, merging the matching Under side into it.
/// A market with no Over outcome contributes nothing. Outcomes with any other
/// side label are ignored.
fn flatten_market(
    market: &RawMarket,
    mode: MarketMode,
    matchup: &str,
    bookmaker_title: &str,
    records: &mut Vec<FlatRecord>,
) {
    for outcome in &market.outcomes {
        if outcome.name != "Over" {
            continue;
        }

        let subject = match mode {
            MarketMode::Props => match outcome.description.as_deref() {
                Some(d) if !d.trim().is_empty() => d.trim().to_string(),
                // Degraded payload: a prop quote with no player attached
                // cannot be keyed, so it cannot be compared.
                _ => continue,
            },
            MarketMode::Totals => matchup.to_string(),
        };

        // Player-prop markets list every player's Over and Under in one
        // outcomes array, so the Under must be matched back by subject.
        let under_price = market
            .outcomes
            .iter()
            .find(|o| {
                o.name == "Under"
                    && match mode {
                        MarketMode::Props => {
                            o.description.as_deref().map(str::trim) == Some(subject.as_str())
                        }
                        MarketMode::Totals => true,
                    }
            })
            .map(|o| o.price);

        records.push(FlatRecord {
            identity_key: identity_key(&subject, &market.key, mode),
            subject,
            market_key: market.key.clone(),
            line: outcome.point,
            over_price: outcome.price,
            under_price,
            matchup: matchup.to_string(),
            bookmaker_title: bookmaker_title.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RawBookmakerQuote, RawOutcome};

    fn outcome(name: &str, description: Option<&str>, price: f64, point: Option<f64>) -> RawOutcome {
        RawOutcome {
            name: name.to_string(),
            description: description.map(str::to_string),
            price,
            point,
        }
    }

    fn event_with_market(bookmaker: &str, market_key: &str, outcomes: Vec<RawOutcome>) -> RawEvent {
        RawEvent {
            id: "evt1".to_string(),
            commence_time: None,
            home_team: "Celtics".to_string(),
            away_team: "Lakers".to_string(),
            bookmakers: vec![RawBookmakerQuote {
                key: bookmaker.to_string(),
                title: bookmaker.to_string(),
                markets: vec![RawMarket {
                    key: market_key.to_string(),
                    outcomes,
                }],
            }],
        }
    }

    #[test]
    fn over_and_under_merge_into_one_record() {
        let events = vec![event_with_market(
            "draftkings",
            "player_points",
            vec![
                outcome("Over", Some("LeBron James"), 1.91, Some(24.5)),
                outcome("Under", Some("LeBron James"), 1.95, Some(24.5)),
            ],
        )];

        let out = flatten_events(&events, "draftkings", MarketMode::Props);
        assert_eq!(out.records.len(), 1);
        let rec = &out.records[0];
        assert_eq!(rec.line, Some(24.5));
        assert!((rec.over_price - 1.91).abs() < 1e-9);
        assert_eq!(rec.under_price, Some(1.95));
        assert_eq!(rec.subject, "LeBron James");
        assert_eq!(rec.identity_key, "LeBron James|player_points");
    }

    #[test]
    fn missing_under_yields_no_quote_sentinel() {
        let events = vec![event_with_market(
            "draftkings",
            "player_points",
            vec![outcome("Over", Some("LeBron James"), 1.91, Some(24.5))],
        )];

        let out = flatten_events(&events, "draftkings", MarketMode::Props);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].under_price, None);
    }

    #[test]
    fn market_without_over_contributes_nothing() {
        let events = vec![event_with_market(
            "draftkings",
            "player_points",
            vec![outcome("Under", Some("LeBron James"), 1.95, Some(24.5))],
        )];

        let out = flatten_events(&events, "draftkings", MarketMode::Props);
        assert!(out.records.is_empty());
    }

    #[test]
    fn non_target_bookmaker_is_skipped_but_observed() {
        let mut event = event_with_market(
            "draftkings",
            "player_points",
            vec![outcome("Over", Some("LeBron James"), 1.91, Some(24.5))],
        );
        event.bookmakers.push(RawBookmakerQuote {
            key: "fanduel".to_string(),
            title: "FanDuel".to_string(),
            markets: vec![RawMarket {
                key: "player_points".to_string(),
                outcomes: vec![outcome("Over", Some("LeBron James"), 1.88, Some(25.0))],
            }],
        });

        let out = flatten_events(&[event], "draftkings", MarketMode::Props);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].over_price, 1.91);
        assert!(out.observed_bookmakers.contains("fanduel"));
        assert!(out.observed_bookmakers.contains("draftkings"));
    }

    #[test]
    fn props_mode_excludes_totals_market() {
        let events = vec![event_with_market(
            "draftkings",
            "totals",
            vec![
                outcome("Over", None, 1.90, Some(220.5)),
                outcome("Under", None, 1.92, Some(220.5)),
            ],
        )];

        let props = flatten_events(&events, "draftkings", MarketMode::Props);
        assert!(props.records.is_empty());

        let totals = flatten_events(&events, "draftkings", MarketMode::Totals);
        assert_eq!(totals.records.len(), 1);
        assert_eq!(totals.records[0].subject, "Lakers @ Celtics");
        assert_eq!(totals.records[0].identity_key, "Lakers @ Celtics");
        assert_eq!(totals.records[0].line, Some(220.5));
    }

    #[test]
    fn null_point_propagates_as_null_line() {
        let events = vec![event_with_market(
            "draftkings",
            "player_points",
            vec![outcome("Over", Some("Role Player"), 1.80, None)],
        )];

        let out = flatten_events(&events, "draftkings", MarketMode::Props);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].line, None);
    }

    #[test]
    fn under_is_matched_by_player_not_position() {
        // Two players in one market: each Over must pick up its own Under.
        let events = vec![event_with_market(
            "draftkings",
            "player_points",
            vec![
                outcome("Over", Some("Player A"), 1.90, Some(20.5)),
                outcome("Over", Some("Player B"), 1.85, Some(30.5)),
                outcome("Under", Some("Player B"), 1.97, Some(30.5)),
                outcome("Under", Some("Player A"), 1.92, Some(20.5)),
            ],
        )];

        let out = flatten_events(&events, "draftkings", MarketMode::Props);
        assert_eq!(out.records.len(), 2);
        let a = out.records.iter().find(|r| r.subject == "Player A").unwrap();
        let b = out.records.iter().find(|r| r.subject == "Player B").unwrap();
        assert_eq!(a.under_price, Some(1.92));
        assert_eq!(b.under_price, Some(1.97));
    }

    #[test]
    fn empty_input_is_fine() {
        let out = flatten_events(&[], "draftkings", MarketMode::Props);
        assert!(out.records.is_empty());
        assert!(out.observed_bookmakers.is_empty());
    }
}
