use serde::{Deserialize, Serialize};
use tracing::info;

use crate::normalizer::flatten_events;
use crate::types::{FlatRecord, MarketMode, RawEvent, Snapshot};

// ---------------------------------------------------------------------------
// Physical shapes
// ---------------------------------------------------------------------------

/// Every physical snapshot shape this system has ever written, resolved once
/// at load time. Consumers only ever see the current `Snapshot`.
#[derive(Debug)]
pub enum StoredShape {
    /// `{last_updated, data: {props, totals}}`, the current format.
    Current {
        last_updated: String,
        props: Vec<FlatRecord>,
        totals: Vec<FlatRecord>,
    },
    /// `{last_updated, games: [RawEvent]}`: raw events, pre-flattening era.
    GamesWrapper {
        last_updated: String,
        games: Vec<RawEvent>,
    },
    /// Bare `[RawEvent]`, the earliest format, no timestamp.
    BareEvents(Vec<RawEvent>),
    Unrecognized,
}

/// Wire form of the current shape. `save` writes this; `load` reads it back.
/// A missing timestamp degrades to "unknown", same as the legacy shapes.
#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentWire {
    #[serde(default = "unknown_timestamp")]
    pub last_updated: String,
    pub data: CurrentData,
}

fn unknown_timestamp() -> String {
    "unknown".to_string()
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CurrentData {
    #[serde(default)]
    pub props: Vec<FlatRecord>,
    #[serde(default)]
    pub totals: Vec<FlatRecord>,
}

impl From<&Snapshot> for CurrentWire {
    fn from(s: &Snapshot) -> Self {
        CurrentWire {
            last_updated: s.last_updated.clone(),
            data: CurrentData {
                props: s.props.clone(),
                totals: s.totals.clone(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution & migration
// ---------------------------------------------------------------------------

/// Decide which physical shape a stored blob is. An empty array is a valid
/// "no data yet" bare-events payload, not unrecognized.
pub fn resolve_shape(value: serde_json::Value) -> StoredShape {
    if value.is_array() {
        return match serde_json::from_value::<Vec<RawEvent>>(value) {
            Ok(events) => StoredShape::BareEvents(events),
            Err(_) => StoredShape::Unrecognized,
        };
    }

    let Some(obj) = value.as_object() else {
        return StoredShape::Unrecognized;
    };

    if obj.contains_key("data") {
        return match serde_json::from_value::<CurrentWire>(serde_json::Value::Object(obj.clone())) {
            Ok(wire) => StoredShape::Current {
                last_updated: wire.last_updated,
                props: wire.data.props,
                totals: wire.data.totals,
            },
            Err(_) => StoredShape::Unrecognized,
        };
    }

    if let Some(games_value) = obj.get("games") {
        let last_updated = obj
            .get("last_updated")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();
        return match serde_json::from_value::<Vec<RawEvent>>(games_value.clone()) {
            Ok(games) => StoredShape::GamesWrapper { last_updated, games },
            Err(_) => StoredShape::Unrecognized,
        };
    }

    StoredShape::Unrecognized
}

/// Normalize any recognized shape into the current `Snapshot`. Legacy shapes
/// carry raw events, so they are flattened here with the configured
/// bookmaker, both market families in one pass each. Returns `None` only
/// for unrecognized content.
pub fn migrate(shape: StoredShape, target_bookmaker: &str) -> Option<Snapshot> {
    match shape {
        StoredShape::Current {
            last_updated,
            props,
            totals,
        } => Some(Snapshot {
            last_updated,
            props,
            totals,
        }),
        StoredShape::GamesWrapper { last_updated, games } => {
            info!(games = games.len(), "migrating legacy games-wrapper snapshot");
            Some(flatten_legacy(games, last_updated, target_bookmaker))
        }
        StoredShape::BareEvents(events) => {
            info!(events = events.len(), "migrating legacy bare-events snapshot");
            Some(flatten_legacy(events, "unknown".to_string(), target_bookmaker))
        }
        StoredShape::Unrecognized => None,
    }
}

fn flatten_legacy(events: Vec<RawEvent>, last_updated: String, target_bookmaker: &str) -> Snapshot {
    let props = flatten_events(&events, target_bookmaker, MarketMode::Props);
    let totals = flatten_events(&events, target_bookmaker, MarketMode::Totals);
    Snapshot {
        last_updated,
        props: props.records,
        totals: totals.records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_event_json() -> serde_json::Value {
        json!({
            "id": "evt1",
            "home_team": "Celtics",
            "away_team": "Lakers",
            "bookmakers": [{
                "key": "draftkings",
                "title": "DraftKings",
                "markets": [
                    {
                        "key": "player_points",
                        "outcomes": [
                            {"name": "Over", "description": "Jayson Tatum", "price": 1.87, "point": 27.5},
                            {"name": "Under", "description": "Jayson Tatum", "price": 1.95, "point": 27.5}
                        ]
                    },
                    {
                        "key": "totals",
                        "outcomes": [
                            {"name": "Over", "price": 1.90, "point": 221.5},
                            {"name": "Under", "price": 1.92, "point": 221.5}
                        ]
                    }
                ]
            }]
        })
    }

    #[test]
    fn bare_event_list_is_flattened() {
        let shape = resolve_shape(json!([raw_event_json()]));
        assert!(matches!(shape, StoredShape::BareEvents(_)));

        let snapshot = migrate(shape, "draftkings").expect("recognized shape");
        assert_eq!(snapshot.props.len(), 1);
        assert_eq!(snapshot.totals.len(), 1);
        assert_eq!(snapshot.props[0].subject, "Jayson Tatum");
        assert_eq!(snapshot.totals[0].line, Some(221.5));
        assert_eq!(snapshot.last_updated, "unknown");
    }

    #[test]
    fn games_wrapper_keeps_its_timestamp() {
        let shape = resolve_shape(json!({
            "last_updated": "2026-01-14 18:00:00 UTC",
            "games": [raw_event_json()]
        }));
        let snapshot = migrate(shape, "draftkings").expect("recognized shape");
        assert_eq!(snapshot.last_updated, "2026-01-14 18:00:00 UTC");
        assert_eq!(snapshot.props.len(), 1);
    }

    #[test]
    fn current_shape_passes_through() {
        let shape = resolve_shape(json!({
            "last_updated": "2026-01-15 12:00:00 UTC",
            "data": {
                "props": [{
                    "identity_key": "Jayson Tatum|player_points",
                    "subject": "Jayson Tatum",
                    "market_key": "player_points",
                    "line": 27.5,
                    "over_price": 1.87,
                    "under_price": 1.95,
                    "matchup": "Lakers @ Celtics",
                    "bookmaker_title": "DraftKings"
                }],
                "totals": []
            }
        }));
        let snapshot = migrate(shape, "draftkings").expect("recognized shape");
        assert_eq!(snapshot.props.len(), 1);
        assert_eq!(snapshot.props[0].line, Some(27.5));
        assert!(snapshot.totals.is_empty());
    }

    #[test]
    fn current_shape_without_timestamp_still_loads() {
        let shape = resolve_shape(json!({
            "data": {"props": [], "totals": []}
        }));
        let snapshot = migrate(shape, "draftkings").expect("recognized shape");
        assert_eq!(snapshot.last_updated, "unknown");
    }

    #[test]
    fn legacy_migration_is_idempotent_through_resave() {
        // Load a {games: [...]} blob, write it back in current shape, reload:
        // the record content must be equivalent.
        let shape = resolve_shape(json!({
            "last_updated": "2026-01-14 18:00:00 UTC",
            "games": [raw_event_json()]
        }));
        let migrated = migrate(shape, "draftkings").unwrap();

        let resaved = serde_json::to_value(CurrentWire::from(&migrated)).unwrap();
        let reloaded = migrate(resolve_shape(resaved), "draftkings").unwrap();

        assert_eq!(reloaded.last_updated, migrated.last_updated);
        assert_eq!(reloaded.props, migrated.props);
        assert_eq!(reloaded.totals, migrated.totals);
    }

    #[test]
    fn empty_list_is_valid_empty_snapshot() {
        let snapshot = migrate(resolve_shape(json!([])), "draftkings").unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn unrecognized_shape_migrates_to_none() {
        assert!(migrate(resolve_shape(json!({"something": "else"})), "draftkings").is_none());
        assert!(migrate(resolve_shape(json!(42)), "draftkings").is_none());
    }
}
