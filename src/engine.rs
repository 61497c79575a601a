use std::collections::HashMap;

use tracing::debug;

use crate::config::PROP_MARKETS;
use crate::types::{DiffRow, FlatRecord, LineStatus, ScanMode};

// ---------------------------------------------------------------------------
// Join maps
// ---------------------------------------------------------------------------

/// Index records by identity key. Keys are unique per payload by the
/// normalizer's invariant; on a duplicate the later record wins.
pub fn index_by_key(records: &[FlatRecord]) -> HashMap<&str, &FlatRecord> {
    records
        .iter()
        .map(|r| (r.identity_key.as_str(), r))
        .collect()
}

/// Display priority for prop markets: points first, then rebounds, assists,
/// and the combo markets, with unrecognized keys last.
pub fn market_priority(market_key: &str) -> usize {
    PROP_MARKETS
        .iter()
        .position(|m| *m == market_key)
        .unwrap_or(PROP_MARKETS.len())
}

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

/// Scanner mode: iterate the live side, join back to the pre-game snapshot,
/// keep pairs whose absolute movement meets the threshold. Records with a
/// null line on either side never produce a row; records present only in the
/// snapshot are excluded; scanner mode requires an active live game.
///
/// Sorted by descending absolute movement (largest movers first).
pub fn scan_movers(pre: &[FlatRecord], live: &[FlatRecord], threshold: f64) -> Vec<DiffRow> {
    let pre_map = index_by_key(pre);

    let mut rows: Vec<DiffRow> = live
        .iter()
        .filter_map(|live_rec| {
            let pre_rec = pre_map.get(live_rec.identity_key.as_str())?;
            let pre_line = pre_rec.line?;
            let live_line = live_rec.line?;
            let diff = live_line - pre_line;
            if diff.abs() < threshold {
                return None;
            }
            Some(DiffRow {
                subject: live_rec.subject.clone(),
                market_key: live_rec.market_key.clone(),
                matchup: live_rec.matchup.clone(),
                pre_line: Some(pre_line),
                live_line: Some(live_line),
                diff: Some(diff),
                over_price: live_rec.over_price,
                under_price: live_rec.under_price,
                status: LineStatus::Active,
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        let a_mag = a.diff.unwrap_or(0.0).abs();
        let b_mag = b.diff.unwrap_or(0.0).abs();
        b_mag.total_cmp(&a_mag)
    });

    debug!(live = live.len(), pre = pre.len(), movers = rows.len(), threshold, "scanner pass");
    rows
}

/// Totals mode: same inclusion law as scanner, but the inputs are keyed by
/// matchup (one record per game) and the threshold is independent.
pub fn totals_movers(pre: &[FlatRecord], live: &[FlatRecord], threshold: f64) -> Vec<DiffRow> {
    scan_movers(pre, live, threshold)
}

/// Search mode: iterate the pre-game snapshot, keep every record whose
/// subject contains the query (case-insensitive) regardless of movement.
/// A live counterpart makes the row `active` with a computed diff; otherwise
/// the row is `inactive` with no live line and no diff.
///
/// Sorted by subject, then fixed market priority.
pub fn search_lines(pre: &[FlatRecord], live: &[FlatRecord], query: &str) -> Vec<DiffRow> {
    let live_map = index_by_key(live);
    let needle = query.trim().to_lowercase();

    let mut rows: Vec<DiffRow> = pre
        .iter()
        .filter(|rec| rec.subject.to_lowercase().contains(&needle))
        .map(|pre_rec| match live_map.get(pre_rec.identity_key.as_str()) {
            Some(live_rec) => {
                let diff = match (pre_rec.line, live_rec.line) {
                    (Some(p), Some(l)) => Some(l - p),
                    _ => None,
                };
                DiffRow {
                    subject: pre_rec.subject.clone(),
                    market_key: pre_rec.market_key.clone(),
                    matchup: pre_rec.matchup.clone(),
                    pre_line: pre_rec.line,
                    live_line: live_rec.line,
                    diff,
                    over_price: live_rec.over_price,
                    under_price: live_rec.under_price,
                    status: LineStatus::Active,
                }
            }
            None => DiffRow {
                subject: pre_rec.subject.clone(),
                market_key: pre_rec.market_key.clone(),
                matchup: pre_rec.matchup.clone(),
                pre_line: pre_rec.line,
                live_line: None,
                diff: None,
                over_price: pre_rec.over_price,
                under_price: pre_rec.under_price,
                status: LineStatus::Inactive,
            },
        })
        .collect();

    rows.sort_by(|a, b| {
        (a.subject.to_lowercase(), market_priority(&a.market_key))
            .cmp(&(b.subject.to_lowercase(), market_priority(&b.market_key)))
    });

    rows
}

// ---------------------------------------------------------------------------
// Empty-result diagnostics
// ---------------------------------------------------------------------------

/// Inputs the diagnostic message is derived from. A compare that yields no
/// rows must still tell the operator *why*: "no snapshot", "no live games",
/// "bookmaker missing" and "no movers" are distinct conditions.
pub struct CompareContext<'a> {
    pub snapshot_present: bool,
    pub live_event_count: usize,
    pub target_bookmaker: &'a str,
    pub bookmaker_seen_live: bool,
    pub observed_bookmakers: Vec<String>,
    pub mode: ScanMode,
    pub threshold: f64,
    pub query: &'a str,
}

pub fn status_message(ctx: &CompareContext<'_>, row_count: usize) -> String {
    if !ctx.snapshot_present {
        return "No snapshot found. Take a snapshot before comparing.".to_string();
    }
    if ctx.live_event_count == 0 {
        return "No live games returned by the odds provider.".to_string();
    }
    if !ctx.bookmaker_seen_live {
        let seen = if ctx.observed_bookmakers.is_empty() {
            "none".to_string()
        } else {
            ctx.observed_bookmakers.join(", ")
        };
        return format!(
            "Bookmaker '{}' not found in live data (saw: {seen}).",
            ctx.target_bookmaker
        );
    }
    if row_count == 0 {
        return match ctx.mode {
            ScanMode::Scanner | ScanMode::Totals => format!(
                "No lines moved {:.1}+ points since the snapshot.",
                ctx.threshold
            ),
            ScanMode::Search => format!("No snapshot lines match '{}'.", ctx.query),
        };
    }
    match ctx.mode {
        ScanMode::Scanner => format!("{row_count} prop line(s) moved beyond threshold."),
        ScanMode::Totals => format!("{row_count} game total(s) moved beyond threshold."),
        ScanMode::Search => format!("{row_count} snapshot line(s) match '{}'.", ctx.query),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::identity_key;
    use crate::types::MarketMode;

    fn prop(subject: &str, market: &str, line: Option<f64>) -> FlatRecord {
        FlatRecord {
            identity_key: identity_key(subject, market, MarketMode::Props),
            subject: subject.to_string(),
            market_key: market.to_string(),
            line,
            over_price: 1.91,
            under_price: Some(1.91),
            matchup: "Lakers @ Celtics".to_string(),
            bookmaker_title: "DraftKings".to_string(),
        }
    }

    fn total(matchup: &str, line: Option<f64>) -> FlatRecord {
        FlatRecord {
            identity_key: identity_key(matchup, "totals", MarketMode::Totals),
            subject: matchup.to_string(),
            market_key: "totals".to_string(),
            line,
            over_price: 1.90,
            under_price: Some(1.92),
            matchup: matchup.to_string(),
            bookmaker_title: "DraftKings".to_string(),
        }
    }

    #[test]
    fn scanner_includes_iff_abs_diff_meets_threshold() {
        let pre = vec![
            prop("Player X", "player_points", Some(20.5)),
            prop("Player Y", "player_points", Some(10.0)),
        ];
        let live = vec![
            prop("Player X", "player_points", Some(25.0)), // +4.5
            prop("Player Y", "player_points", Some(8.5)),  // -1.5
        ];

        let rows = scan_movers(&pre, &live, 3.0);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].subject, "Player X");
        assert!((rows[0].diff.unwrap() - 4.5).abs() < 1e-9);

        let rows = scan_movers(&pre, &live, 5.0);
        assert!(rows.is_empty());
    }

    #[test]
    fn scanner_excludes_null_lines_and_pre_only_records() {
        let pre = vec![
            prop("Null Pre", "player_points", None),
            prop("Null Live", "player_points", Some(12.5)),
            prop("Snapshot Only", "player_points", Some(30.5)),
        ];
        let live = vec![
            prop("Null Pre", "player_points", Some(99.0)),
            prop("Null Live", "player_points", None),
            prop("Live Only", "player_points", Some(40.5)),
        ];

        let rows = scan_movers(&pre, &live, 0.0);
        assert!(rows.is_empty());
    }

    #[test]
    fn scanner_negative_movement_counts_by_magnitude() {
        let pre = vec![prop("Dropper", "player_rebounds", Some(11.5))];
        let live = vec![prop("Dropper", "player_rebounds", Some(7.5))];

        let rows = scan_movers(&pre, &live, 3.0);
        assert_eq!(rows.len(), 1);
        assert!((rows[0].diff.unwrap() + 4.0).abs() < 1e-9);
    }

    #[test]
    fn scanner_sorts_largest_movers_first() {
        let pre = vec![
            prop("Small Move", "player_points", Some(20.0)),
            prop("Big Move", "player_points", Some(20.0)),
            prop("Mid Move", "player_points", Some(20.0)),
        ];
        let live = vec![
            prop("Small Move", "player_points", Some(21.0)),
            prop("Big Move", "player_points", Some(14.0)),
            prop("Mid Move", "player_points", Some(23.5)),
        ];

        let rows = scan_movers(&pre, &live, 1.0);
        let subjects: Vec<_> = rows.iter().map(|r| r.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Big Move", "Mid Move", "Small Move"]);
    }

    #[test]
    fn search_matches_case_insensitive_substring() {
        let pre = vec![
            prop("LeBron James", "player_points", Some(24.5)),
            prop("Anthony Davis", "player_rebounds", Some(12.5)),
        ];
        let live = vec![prop("LeBron James", "player_points", Some(26.5))];

        let rows = search_lines(&pre, &live, "lebron");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, LineStatus::Active);
        assert!((rows[0].diff.unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn search_inactive_row_has_no_diff() {
        let pre = vec![prop("Benched Star", "player_points", Some(18.5))];
        let live: Vec<FlatRecord> = vec![];

        let rows = search_lines(&pre, &live, "benched");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, LineStatus::Inactive);
        assert_eq!(rows[0].live_line, None);
        // Never a zero placeholder: None cannot be confused with a true
        // zero-movement active row.
        assert_eq!(rows[0].diff, None);
    }

    #[test]
    fn search_includes_rows_below_any_threshold() {
        let pre = vec![prop("Steady Player", "player_points", Some(22.5))];
        let live = vec![prop("Steady Player", "player_points", Some(22.5))];

        let rows = search_lines(&pre, &live, "steady");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].diff, Some(0.0));
        assert_eq!(rows[0].status, LineStatus::Active);
    }

    #[test]
    fn search_sorts_by_subject_then_market_priority() {
        let pre = vec![
            prop("Aaron Gordon", "player_rebounds", Some(8.5)),
            prop("Aaron Gordon", "unknown_market", Some(1.5)),
            prop("Aaron Gordon", "player_points", Some(15.5)),
            prop("Zion Williamson", "player_points", Some(24.5)),
        ];
        let live: Vec<FlatRecord> = vec![];

        let rows = search_lines(&pre, &live, "a");
        let keys: Vec<_> = rows
            .iter()
            .map(|r| (r.subject.as_str(), r.market_key.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("Aaron Gordon", "player_points"),
                ("Aaron Gordon", "player_rebounds"),
                ("Aaron Gordon", "unknown_market"),
                ("Zion Williamson", "player_points"),
            ]
        );
    }

    #[test]
    fn totals_join_is_per_game() {
        let pre = vec![total("Lakers @ Celtics", Some(220.5))];
        let live = vec![total("Lakers @ Celtics", Some(216.0))];

        let rows = totals_movers(&pre, &live, 4.0);
        assert_eq!(rows.len(), 1);
        assert!((rows[0].diff.unwrap() + 4.5).abs() < 1e-9);

        let rows = totals_movers(&pre, &live, 5.0);
        assert!(rows.is_empty());
    }

    #[test]
    fn market_priority_orders_unknown_last() {
        assert!(market_priority("player_points") < market_priority("player_rebounds"));
        assert!(market_priority("player_rebounds_assists") < market_priority("h2h"));
        assert_eq!(market_priority("h2h"), PROP_MARKETS.len());
    }

    #[test]
    fn status_messages_distinguish_empty_conditions() {
        let mut ctx = CompareContext {
            snapshot_present: false,
            live_event_count: 0,
            target_bookmaker: "draftkings",
            bookmaker_seen_live: false,
            observed_bookmakers: vec![],
            mode: ScanMode::Scanner,
            threshold: 2.0,
            query: "",
        };
        assert!(status_message(&ctx, 0).contains("No snapshot"));

        ctx.snapshot_present = true;
        assert!(status_message(&ctx, 0).contains("No live games"));

        ctx.live_event_count = 4;
        ctx.observed_bookmakers = vec!["fanduel".to_string(), "betmgm".to_string()];
        let msg = status_message(&ctx, 0);
        assert!(msg.contains("draftkings") && msg.contains("fanduel"));

        ctx.bookmaker_seen_live = true;
        assert!(status_message(&ctx, 0).contains("No lines moved"));
        assert!(status_message(&ctx, 3).contains("3"));
    }
}
