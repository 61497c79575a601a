use crate::types::MarketMode;

/// Build the join key that correlates a pre-game record with its live
/// counterpart. Must be applied identically on both sides of the join.
///
/// Props: `"{player}|{market_key}"`. Totals: the matchup string alone;
/// a game has exactly one totals market, so the matchup is sufficient.
///
/// The subject is trimmed first: provider payloads are inconsistent about
/// trailing spaces, and an untrimmed subject silently breaks the join.
pub fn identity_key(subject: &str, market_key: &str, mode: MarketMode) -> String {
    let subject = subject.trim();
    match mode {
        MarketMode::Props => format!("{subject}|{market_key}"),
        MarketMode::Totals => subject.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn props_key_combines_subject_and_market() {
        let key = identity_key("LeBron James", "player_points", MarketMode::Props);
        assert_eq!(key, "LeBron James|player_points");
    }

    #[test]
    fn whitespace_variants_collide_to_same_key() {
        let padded = identity_key("  LeBron James ", "player_points", MarketMode::Props);
        let clean = identity_key("LeBron James", "player_points", MarketMode::Props);
        assert_eq!(padded, clean);
    }

    #[test]
    fn totals_key_is_matchup_only() {
        let key = identity_key("Lakers @ Celtics", "totals", MarketMode::Totals);
        assert_eq!(key, "Lakers @ Celtics");
    }
}
