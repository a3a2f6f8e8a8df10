//! Pure vote-resolution decisions: winner, tie, and face-off outcomes.
//!
//! The winner resolver walks Voting → TieDetected → FaceOffActive →
//! FaceOffExpired → Resolved; the timed parts of that walk live in the
//! scheduler and the persisted [`FaceOffRecord`], while the decisions at each
//! step are the pure functions here.
//!
//! [`FaceOffRecord`]: crate::dao::models::FaceOffRecord

use std::collections::BTreeMap;

use indexmap::IndexMap;
use rand::seq::IndexedRandom;

/// Outcome of closing the weekly vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Nobody voted; the week is cancelled rather than crowning an arbitrary
    /// winner.
    NoVotes,
    /// A single team holds the maximum count.
    Winner(String),
    /// Two or more teams are tied at the maximum count, in tally order.
    Tie(Vec<String>),
}

/// Outcome of closing a face-off after its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaceOffOutcome {
    /// A single team holds the maximum face-off count.
    Winner(String),
    /// The face-off stayed tied (possibly with zero votes all around).
    StillTied(Vec<String>),
}

/// Decide the weekly outcome from the tally. Teams carry explicit zero counts,
/// so an all-zero tally means no votes were cast at all.
pub fn decide_weekly(tally: &IndexMap<String, u32>) -> VoteOutcome {
    let max_votes = tally.values().copied().max().unwrap_or(0);
    if max_votes == 0 {
        return VoteOutcome::NoVotes;
    }

    let winners: Vec<String> = tally
        .iter()
        .filter(|(_, count)| **count == max_votes)
        .map(|(team, _)| team.clone())
        .collect();

    match winners.as_slice() {
        [single] => VoteOutcome::Winner(single.clone()),
        _ => VoteOutcome::Tie(winners),
    }
}

/// Decide the face-off outcome from its results. Unlike the weekly decision,
/// an all-zero face-off does not cancel anything: the tie persists and is
/// broken at random by the caller.
pub fn decide_faceoff(results: &BTreeMap<String, u32>) -> FaceOffOutcome {
    let max_votes = results.values().copied().max().unwrap_or(0);
    let at_max: Vec<String> = results
        .iter()
        .filter(|(_, count)| **count == max_votes)
        .map(|(team, _)| team.clone())
        .collect();

    match at_max.as_slice() {
        [single] => FaceOffOutcome::Winner(single.clone()),
        _ => FaceOffOutcome::StillTied(at_max),
    }
}

/// Pick one of the still-tied teams uniformly at random.
pub fn pick_random(tied: &[String]) -> Option<String> {
    tied.choose(&mut rand::rng()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tally(entries: &[(&str, u32)]) -> IndexMap<String, u32> {
        entries
            .iter()
            .map(|(team, count)| ((*team).to_string(), *count))
            .collect()
    }

    #[test]
    fn unique_max_wins_outright() {
        let outcome = decide_weekly(&tally(&[("Moonlight", 5), ("Starfall", 3)]));
        assert_eq!(outcome, VoteOutcome::Winner("Moonlight".into()));
    }

    #[test]
    fn tied_max_reports_all_tied_teams() {
        let outcome = decide_weekly(&tally(&[("A", 5), ("B", 5), ("C", 3)]));
        assert_eq!(outcome, VoteOutcome::Tie(vec!["A".into(), "B".into()]));
    }

    #[test]
    fn empty_and_all_zero_tallies_yield_no_votes() {
        assert_eq!(decide_weekly(&IndexMap::new()), VoteOutcome::NoVotes);
        assert_eq!(
            decide_weekly(&tally(&[("A", 0), ("B", 0)])),
            VoteOutcome::NoVotes
        );
    }

    #[test]
    fn faceoff_unique_max_wins() {
        let results = BTreeMap::from([("A".to_string(), 10), ("B".to_string(), 7)]);
        assert_eq!(decide_faceoff(&results), FaceOffOutcome::Winner("A".into()));
    }

    #[test]
    fn faceoff_equal_counts_stay_tied() {
        let results = BTreeMap::from([("A".to_string(), 3), ("B".to_string(), 3)]);
        assert_eq!(
            decide_faceoff(&results),
            FaceOffOutcome::StillTied(vec!["A".into(), "B".into()])
        );
    }

    #[test]
    fn faceoff_with_no_votes_stays_fully_tied() {
        let results = BTreeMap::from([("A".to_string(), 0), ("B".to_string(), 0)]);
        assert_eq!(
            decide_faceoff(&results),
            FaceOffOutcome::StillTied(vec!["A".into(), "B".into()])
        );
    }

    #[test]
    fn random_pick_always_lands_on_a_tied_team() {
        let tied = vec!["A".to_string(), "B".to_string()];
        for _ in 0..50 {
            let pick = pick_random(&tied).unwrap();
            assert!(tied.contains(&pick));
        }
        assert_eq!(pick_random(&[]), None);
    }
}
