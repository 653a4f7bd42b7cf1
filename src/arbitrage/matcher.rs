//! Cross-provider name matching.
//!
//! The odds provider and the exchange spell events and participants
//! independently ("Manchester United" vs "Man Utd"). Matching is exact on
//! normalized names first, then falls back to Jaro-Winkler similarity with a
//! tunable cutoff.
//!
//! Matching is two-stage: the odds event is matched to an exchange event
//! participant by participant, then outcomes are assigned one-to-one to that
//! event's contracts.
//! Matching a bare outcome name against every exchange key at once is wrong:
//! it pairs participants across unrelated fixtures.
//!
//! Fuzzy matches can be wrong. Alerts built on them are labelled with the
//! score so a reader can judge; they are a known source of false positives.

use once_cell::sync::Lazy;
use regex::Regex;
use time::Duration;

use crate::exchange::{ExchangeContract, ExchangeEvent};
use crate::odds::Event;

/// Default similarity cutoff.
pub const DEFAULT_CUTOFF: f64 = 0.6;

/// Exchange events starting further than this from the odds event never match.
pub const START_TIME_TOLERANCE: Duration = Duration::hours(12);

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\s]+").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static FIXTURE_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+(?:vs?\.?|@|-)\s+").expect("valid regex"));

/// How a pair of names was matched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchKind {
    /// Identical after normalization.
    Exact,
    /// Closest candidate above the cutoff.
    Fuzzy {
        /// Similarity in `[0, 1]`.
        score: f64,
    },
}

impl MatchKind {
    /// Similarity score (1.0 for exact).
    pub fn score(&self) -> f64 {
        match self {
            MatchKind::Exact => 1.0,
            MatchKind::Fuzzy { score } => *score,
        }
    }

    /// Whether the match was fuzzy.
    pub fn is_fuzzy(&self) -> bool {
        matches!(self, MatchKind::Fuzzy { .. })
    }

    /// Combine two stages; the result is only exact if both are.
    pub fn and(self, other: MatchKind) -> MatchKind {
        match (self, other) {
            (MatchKind::Exact, MatchKind::Exact) => MatchKind::Exact,
            (a, b) => MatchKind::Fuzzy {
                score: a.score().min(b.score()),
            },
        }
    }
}

/// Matching parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPolicy {
    /// Minimum similarity for a fuzzy match.
    pub cutoff: f64,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            cutoff: DEFAULT_CUTOFF,
        }
    }
}

/// Best candidate for a target name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match<'a> {
    /// The matched candidate as given.
    pub candidate: &'a str,
    /// Position in the candidate list.
    pub index: usize,
    /// Exact or fuzzy with score.
    pub kind: MatchKind,
}

/// Lowercase, strip punctuation and collapse whitespace.
pub fn normalize(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stripped = NON_ALPHANUMERIC.replace_all(&lowered, " ");
    WHITESPACE.replace_all(stripped.trim(), " ").into_owned()
}

/// Jaro-Winkler similarity of normalized names, in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::jaro_winkler(&normalize(a), &normalize(b))
}

/// Compare two normalized names under a policy.
fn compare_normalized(a: &str, b: &str, policy: &MatchPolicy) -> Option<MatchKind> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    if a == b {
        return Some(MatchKind::Exact);
    }
    let score = strsim::jaro_winkler(a, b);
    (score >= policy.cutoff).then_some(MatchKind::Fuzzy { score })
}

/// Find the best candidate for `target`.
///
/// An exact normalized match always wins. Otherwise the highest score at or
/// above the cutoff wins, ties going to the earliest candidate.
pub fn best_match<'a, I>(target: &str, candidates: I, policy: &MatchPolicy) -> Option<Match<'a>>
where
    I: IntoIterator<Item = &'a str>,
{
    let target = normalize(target);
    let mut best: Option<Match<'a>> = None;

    for (index, candidate) in candidates.into_iter().enumerate() {
        let Some(kind) = compare_normalized(&target, &normalize(candidate), policy) else {
            continue;
        };
        if kind == MatchKind::Exact {
            return Some(Match {
                candidate,
                index,
                kind,
            });
        }
        if best.map_or(true, |b| kind.score() > b.kind.score()) {
            best = Some(Match {
                candidate,
                index,
                kind,
            });
        }
    }

    best
}

/// Split an exchange event name ("A vs B", "A v B", "A @ B", "A - B") into
/// its two participants.
pub fn split_fixture(name: &str) -> Option<(&str, &str)> {
    let mut parts = FIXTURE_SEPARATOR.splitn(name, 2);
    let first = parts.next()?.trim();
    let second = parts.next()?.trim();
    if first.is_empty() || second.is_empty() {
        return None;
    }
    Some((first, second))
}

/// Match an odds event to an exchange event.
///
/// Both participants must clear the cutoff on their own, in home/away order
/// or swapped; a shared home team alone never pairs two fixtures. Exchange
/// events whose start time is known and too far from the odds event are
/// skipped, as are names that do not split into two participants.
pub fn match_event<'a>(
    event: &Event,
    candidates: &'a [ExchangeEvent],
    policy: &MatchPolicy,
) -> Option<(&'a ExchangeEvent, MatchKind)> {
    let [home, away] = event.participants().map(normalize);
    let mut best: Option<(&'a ExchangeEvent, MatchKind)> = None;

    for candidate in candidates.iter().filter(|c| {
        c.start
            .map_or(true, |s| (s - event.commence_time).abs() <= START_TIME_TOLERANCE)
    }) {
        let Some((first, second)) = split_fixture(&candidate.name) else {
            continue;
        };
        let (first, second) = (normalize(first), normalize(second));

        for (a, b) in [(&home, &away), (&away, &home)] {
            let (Some(k1), Some(k2)) = (
                compare_normalized(a, &first, policy),
                compare_normalized(b, &second, policy),
            ) else {
                continue;
            };
            let kind = k1.and(k2);
            if best.map_or(true, |(_, k)| kind.score() > k.score()) {
                best = Some((candidate, kind));
            }
        }
    }

    best
}

/// Assign outcome names to contracts within one exchange event.
///
/// Pairs at or above the cutoff are taken best first and each outcome and
/// each contract is used at most once, so two outcomes never share a lay
/// price. Ties go to the earlier outcome, then the earlier contract.
pub fn match_outcomes<'o, 'a, C>(
    outcomes: &[&'o str],
    contracts: C,
    policy: &MatchPolicy,
) -> Vec<(&'o str, &'a ExchangeContract, MatchKind)>
where
    C: IntoIterator<Item = &'a ExchangeContract>,
{
    let contracts: Vec<&'a ExchangeContract> = contracts.into_iter().collect();
    let contract_names: Vec<String> = contracts.iter().map(|c| normalize(&c.name)).collect();

    let mut pairs = Vec::new();
    for (oi, outcome) in outcomes.iter().enumerate() {
        let target = normalize(outcome);
        for (ci, name) in contract_names.iter().enumerate() {
            if let Some(kind) = compare_normalized(&target, name, policy) {
                pairs.push((oi, ci, kind));
            }
        }
    }
    pairs.sort_by(|a, b| b.2.score().total_cmp(&a.2.score()));

    let mut outcome_used = vec![false; outcomes.len()];
    let mut contract_used = vec![false; contracts.len()];
    let mut assigned = Vec::new();
    for (oi, ci, kind) in pairs {
        if outcome_used[oi] || contract_used[ci] {
            continue;
        }
        outcome_used[oi] = true;
        contract_used[ci] = true;
        assigned.push((outcomes[oi], contracts[ci], kind));
    }

    assigned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::MockExchangeEventBuilder;
    use crate::odds::MockEventBuilder;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use time::macros::datetime;

    const TEAMS: [&str; 3] = ["Manchester United", "Chelsea", "Arsenal"];

    #[test]
    fn normalize_strips_case_and_punctuation() {
        assert_eq!(normalize("  Man.  Utd! "), "man utd");
        assert_eq!(normalize("Paris Saint-Germain"), "paris saint germain");
        assert_eq!(normalize("Atlético"), "atlético");
    }

    #[test]
    fn fuzzy_matches_abbreviation() {
        let m = best_match("Man Utd", TEAMS, &MatchPolicy::default()).unwrap();
        assert_eq!(m.candidate, "Manchester United");
        assert!(m.kind.is_fuzzy());
        assert!(m.kind.score() >= DEFAULT_CUTOFF);
    }

    #[test]
    fn no_match_below_cutoff() {
        assert!(best_match("Zzzqqq", TEAMS, &MatchPolicy::default()).is_none());
        assert!(best_match("", TEAMS, &MatchPolicy::default()).is_none());
    }

    #[test]
    fn exact_match_wins_over_fuzzy() {
        let m = best_match("chelsea", ["Chelsea FC", "Chelsea"], &MatchPolicy::default()).unwrap();
        assert_eq!(m.candidate, "Chelsea");
        assert_eq!(m.kind, MatchKind::Exact);
    }

    #[test]
    fn matching_is_idempotent() {
        let policy = MatchPolicy::default();
        let first = best_match("Man Utd", TEAMS, &policy);
        let second = best_match("Man Utd", TEAMS, &policy);
        assert_eq!(first, second);
    }

    #[test]
    fn cutoff_is_tunable() {
        let strict = MatchPolicy { cutoff: 0.95 };
        assert!(best_match("Man Utd", TEAMS, &strict).is_none());
    }

    #[test]
    fn match_kind_combines_stages() {
        assert_eq!(MatchKind::Exact.and(MatchKind::Exact), MatchKind::Exact);
        let combined = MatchKind::Exact.and(MatchKind::Fuzzy { score: 0.7 });
        assert_eq!(combined, MatchKind::Fuzzy { score: 0.7 });
        let combined = MatchKind::Fuzzy { score: 0.9 }.and(MatchKind::Fuzzy { score: 0.8 });
        assert_eq!(combined.score(), 0.8);
    }

    #[test]
    fn event_then_outcome_matching() {
        let event = MockEventBuilder::new("e1", "soccer_epl", "Manchester United", "Chelsea")
            .commence_time(datetime!(2025-03-01 15:00 UTC))
            .build();
        let exchange = vec![
            MockExchangeEventBuilder::new("x1", "Arsenal vs Spurs")
                .lay("Arsenal", dec!(2.0))
                .build(),
            MockExchangeEventBuilder::new("x2", "Man Utd vs Chelsea")
                .start(datetime!(2025-03-01 15:00 UTC))
                .lay("Man Utd", dec!(2.2))
                .lay("Draw", dec!(3.4))
                .lay("Chelsea", dec!(3.1))
                .build(),
        ];
        let policy = MatchPolicy::default();

        let (matched, kind) = match_event(&event, &exchange, &policy).unwrap();
        assert_eq!(matched.id, "x2");
        assert!(kind.is_fuzzy());

        let assigned = match_outcomes(
            &["Manchester United", "Chelsea", "Draw"],
            &matched.contracts,
            &policy,
        );
        assert_eq!(assigned.len(), 3);
        let find = |o: &str| assigned.iter().find(|(name, _, _)| *name == o).unwrap();

        let (_, contract, kind) = find("Manchester United");
        assert_eq!(contract.name, "Man Utd");
        assert!(kind.is_fuzzy());

        let (_, contract, kind) = find("Draw");
        assert_eq!(contract.name, "Draw");
        assert_eq!(*kind, MatchKind::Exact);
    }

    #[test]
    fn fixture_sharing_one_participant_does_not_match() {
        let event = MockEventBuilder::new("e1", "soccer_epl", "Arsenal", "Chelsea").build();
        let exchange = vec![MockExchangeEventBuilder::new("x1", "Arsenal vs Spurs")
            .lay("Arsenal", dec!(1.5))
            .build()];

        assert!(match_event(&event, &exchange, &MatchPolicy::default()).is_none());
    }

    #[test]
    fn split_fixture_handles_separators() {
        assert_eq!(split_fixture("Arsenal vs Chelsea"), Some(("Arsenal", "Chelsea")));
        assert_eq!(split_fixture("Arsenal v Chelsea"), Some(("Arsenal", "Chelsea")));
        assert_eq!(split_fixture("Lakers @ Celtics"), Some(("Lakers", "Celtics")));
        assert_eq!(split_fixture("Aston Villa - Leeds"), Some(("Aston Villa", "Leeds")));
        assert_eq!(split_fixture("Premier League Winner"), None);
    }

    #[test]
    fn outcomes_never_share_a_contract() {
        let event = MockExchangeEventBuilder::new("x1", "Team A vs Team B")
            .lay("Team A", dec!(2.0))
            .build();

        let assigned =
            match_outcomes(&["Team B", "Team A"], &event.contracts, &MatchPolicy::default());

        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].0, "Team A");
        assert_eq!(assigned[0].2, MatchKind::Exact);
    }

    #[test]
    fn event_matching_accepts_swapped_order() {
        let event = MockEventBuilder::new("e1", "tennis_atp", "Alcaraz", "Sinner").build();
        let exchange = vec![MockExchangeEventBuilder::new("x1", "Sinner vs Alcaraz").build()];

        let (matched, kind) = match_event(&event, &exchange, &MatchPolicy::default()).unwrap();
        assert_eq!(matched.id, "x1");
        assert_eq!(kind, MatchKind::Exact);
    }

    #[test]
    fn event_matching_respects_start_time() {
        let event = MockEventBuilder::new("e1", "soccer_epl", "Arsenal", "Chelsea")
            .commence_time(datetime!(2025-03-01 15:00 UTC))
            .build();
        let exchange = vec![MockExchangeEventBuilder::new("x1", "Arsenal vs Chelsea")
            .start(datetime!(2025-05-10 15:00 UTC))
            .build()];

        assert!(match_event(&event, &exchange, &MatchPolicy::default()).is_none());
    }
}
