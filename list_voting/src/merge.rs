//! Runoff interpretation and the final interleaved merge of the two
//! preliminary lists.

use log::{debug, info};

use std::collections::{BTreeMap, BTreeSet};

use crate::config::{
    Candidate, Confirmation, EvaluationError, Group, PerGroup, RankedEntry, RunoffPick,
    RunoffRound,
};
use crate::messages::CombinedPosition;

/// Picks the entry of a completed preliminary list that is allowed to
/// occupy the group's lead position.
///
/// Scans increasing eligibility thresholds: for each threshold the
/// first entry (in list order) whose minimum eligible position is at or
/// below it wins. Entries passed over on the way are recorded.
pub(crate) fn runoff_pick(
    group: Group,
    list: &[RankedEntry],
    candidates: &BTreeMap<String, &Candidate>,
) -> Result<RunoffPick, EvaluationError> {
    let max_min = candidates
        .values()
        .map(|c| c.min_position)
        .max()
        .unwrap_or(1);
    for threshold in 1..=max_min {
        let found = list.iter().position(|entry| {
            candidates
                .get(&entry.candidate_id)
                .map(|c| c.min_position <= threshold)
                .unwrap_or(false)
        });
        if let Some(idx) = found {
            let skipped: Vec<String> = list[..idx]
                .iter()
                .map(|entry| entry.candidate_id.clone())
                .collect();
            debug!(
                "runoff_pick: group {} sends {} (threshold {}, skipped {})",
                group,
                list[idx].candidate_id,
                threshold,
                skipped.len()
            );
            return Ok(RunoffPick {
                candidate_id: list[idx].candidate_id.clone(),
                skipped_because_min_position: skipped,
            });
        }
    }
    Err(EvaluationError::NoRunoffCandidate(group))
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub(crate) enum RunoffOutcome {
    Undecided,
    Decided(Group),
}

/// Interprets the latest recorded runoff round. The runoff is decided
/// iff a round exists and its two group tallies differ.
pub(crate) fn resolve_runoff(rounds: &[RunoffRound]) -> RunoffOutcome {
    match rounds.last() {
        None => RunoffOutcome::Undecided,
        Some(round) if round.a == round.b => RunoffOutcome::Undecided,
        Some(round) if round.a > round.b => RunoffOutcome::Decided(Group::A),
        Some(_) => RunoffOutcome::Decided(Group::B),
    }
}

/// The candidate's current confirmation state: the last log entry wins.
fn current_confirmation(candidate: &str, log: &[Confirmation]) -> Option<bool> {
    log.iter()
        .rev()
        .find(|c| c.candidate == candidate)
        .map(|c| c.accepted)
}

/// A merge pass: either the combined list with its per-position
/// messages, or the confirmation request that interrupted it.
#[derive(PartialEq, Debug, Clone)]
pub(crate) enum Merge {
    Complete {
        entries: Vec<RankedEntry>,
        positions: Vec<CombinedPosition>,
    },
    NeedConfirmation {
        candidate: String,
        position: u32,
        partial: Vec<RankedEntry>,
    },
}

/// Interleaves the two preliminary lists into the combined ranking.
///
/// Position 1 is drawn from the runoff winner's list; afterwards the
/// lists alternate. A list whose turn it is but which has no eligible
/// candidate loses the position to the other list without advancing the
/// alternation. Eligibility: unplaced, minimum position reached, and
/// not rejected. The first in-turn eligible candidate without a
/// confirmation on record pauses the merge.
pub(crate) fn merge_lists(
    winner_group: Group,
    lists: &PerGroup<Vec<RankedEntry>>,
    candidates: &BTreeMap<String, &Candidate>,
    confirmations: &[Confirmation],
) -> Result<Merge, EvaluationError> {
    let min_position = |entry: &RankedEntry| -> u32 {
        candidates
            .get(&entry.candidate_id)
            .map(|c| c.min_position)
            .unwrap_or(1)
    };
    let rejected = |entry: &RankedEntry| -> bool {
        current_confirmation(&entry.candidate_id, confirmations) == Some(false)
    };

    // Rejected candidates never take a position and do not count
    // towards completion.
    let total: usize = [&lists.a, &lists.b]
        .iter()
        .flat_map(|list| list.iter())
        .filter(|entry| !rejected(entry))
        .count();

    let mut placed: BTreeSet<String> = BTreeSet::new();
    let mut entries: Vec<RankedEntry> = Vec::new();
    let mut positions: Vec<CombinedPosition> = Vec::new();
    let mut turn = winner_group;

    while entries.len() < total {
        let position = entries.len() as u32 + 1;
        let mut skipped: Vec<String> = Vec::new();
        let mut found: Option<(Group, RankedEntry)> = None;
        for group in [turn, turn.other()] {
            for entry in lists.get(group) {
                if placed.contains(&entry.candidate_id) || rejected(entry) {
                    continue;
                }
                if min_position(entry) <= position {
                    found = Some((group, entry.clone()));
                    break;
                }
                skipped.push(entry.candidate_id.clone());
            }
            if found.is_some() {
                break;
            }
        }

        let (group, entry) = match found {
            Some(x) => x,
            None => return Err(EvaluationError::NoEligibleCandidate { position }),
        };

        match current_confirmation(&entry.candidate_id, confirmations) {
            Some(true) => {}
            None => {
                return Ok(Merge::NeedConfirmation {
                    candidate: entry.candidate_id,
                    position,
                    partial: entries,
                });
            }
            // Rejected entries were filtered above.
            Some(false) => unreachable!("rejected candidate reached placement"),
        }

        let display_name = candidates
            .get(&entry.candidate_id)
            .map(|c| c.display_name())
            .unwrap_or_else(|| entry.candidate_id.clone());
        info!(
            "merge_lists: position {} goes to {} from group {}",
            position, display_name, group
        );
        positions.push(CombinedPosition {
            position,
            candidate_id: entry.candidate_id.clone(),
            from_group: group,
            score: entry.score,
            shift: entry.shift,
            skipped_because_min_position: skipped,
        });
        entries.push(RankedEntry {
            candidate_id: entry.candidate_id.clone(),
            score: entry.score,
            shift: entry.shift,
            position,
        });
        placed.insert(entry.candidate_id);

        // The alternation only advances when the list whose turn it
        // was actually supplied the candidate.
        if group == turn {
            turn = turn.other();
        }
    }

    Ok(Merge::Complete { entries, positions })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, group: Group, min_position: u32) -> Candidate {
        Candidate {
            id: id.to_string(),
            first_name: id.to_string(),
            last_name: "Test".to_string(),
            title: None,
            extra: None,
            group,
            min_position,
        }
    }

    fn entry(id: &str, score: f64, position: u32) -> RankedEntry {
        RankedEntry {
            candidate_id: id.to_string(),
            score,
            shift: 0,
            position,
        }
    }

    fn by_id(candidates: &[Candidate]) -> BTreeMap<String, &Candidate> {
        candidates.iter().map(|c| (c.id.clone(), c)).collect()
    }

    fn accept(ids: &[&str]) -> Vec<Confirmation> {
        ids.iter()
            .map(|id| Confirmation {
                candidate: id.to_string(),
                accepted: true,
            })
            .collect()
    }

    #[test]
    fn runoff_pick_respects_min_position() {
        let cands = vec![
            candidate("anna", Group::A, 3),
            candidate("berta", Group::A, 1),
        ];
        let list = vec![entry("anna", 7.0, 1), entry("berta", 6.0, 2)];
        let pick = runoff_pick(Group::A, &list, &by_id(&cands)).unwrap();
        assert_eq!(pick.candidate_id, "berta");
        assert_eq!(pick.skipped_because_min_position, vec!["anna".to_string()]);
    }

    #[test]
    fn runoff_pick_relaxes_the_threshold() {
        let cands = vec![
            candidate("anna", Group::A, 3),
            candidate("berta", Group::A, 2),
        ];
        let list = vec![entry("anna", 7.0, 1), entry("berta", 6.0, 2)];
        // Nobody may lead at threshold 1; threshold 2 admits berta.
        let pick = runoff_pick(Group::A, &list, &by_id(&cands)).unwrap();
        assert_eq!(pick.candidate_id, "berta");
    }

    #[test]
    fn runoff_is_undecided_without_rounds_or_with_equal_tallies() {
        assert_eq!(resolve_runoff(&[]), RunoffOutcome::Undecided);
        let equal = RunoffRound {
            total: 10,
            a: 4,
            b: 4,
            abstentions: 2,
        };
        assert_eq!(resolve_runoff(&[equal]), RunoffOutcome::Undecided);
    }

    #[test]
    fn only_the_latest_round_counts() {
        let rounds = vec![
            RunoffRound {
                total: 10,
                a: 6,
                b: 4,
                abstentions: 0,
            },
            RunoffRound {
                total: 10,
                a: 3,
                b: 7,
                abstentions: 0,
            },
        ];
        assert_eq!(resolve_runoff(&rounds), RunoffOutcome::Decided(Group::B));
    }

    #[test]
    fn merge_alternates_starting_with_the_winner_group() {
        let cands = vec![
            candidate("a1", Group::A, 1),
            candidate("a2", Group::A, 1),
            candidate("b1", Group::B, 1),
            candidate("b2", Group::B, 1),
        ];
        let lists = PerGroup {
            a: vec![entry("a1", 7.0, 1), entry("a2", 6.0, 2)],
            b: vec![entry("b1", 8.0, 1), entry("b2", 5.0, 2)],
        };
        let confirmations = accept(&["a1", "a2", "b1", "b2"]);
        match merge_lists(Group::B, &lists, &by_id(&cands), &confirmations).unwrap() {
            Merge::Complete { entries, positions } => {
                let order: Vec<&str> =
                    entries.iter().map(|e| e.candidate_id.as_str()).collect();
                assert_eq!(order, vec!["b1", "a1", "b2", "a2"]);
                assert_eq!(positions[0].from_group, Group::B);
                assert_eq!(positions[1].from_group, Group::A);
            }
            other => panic!("expected complete merge, got {:?}", other),
        }
    }

    #[test]
    fn failed_turn_consults_the_other_list_without_advancing() {
        // b1 may not take position 2 yet, so group A fills it and
        // group B keeps its turn for position 3.
        let cands = vec![
            candidate("a1", Group::A, 1),
            candidate("a2", Group::A, 1),
            candidate("b1", Group::B, 3),
        ];
        let lists = PerGroup {
            a: vec![entry("a1", 7.0, 1), entry("a2", 6.0, 2)],
            b: vec![entry("b1", 8.0, 1)],
        };
        let confirmations = accept(&["a1", "a2", "b1"]);
        match merge_lists(Group::A, &lists, &by_id(&cands), &confirmations).unwrap() {
            Merge::Complete { entries, positions } => {
                let order: Vec<&str> =
                    entries.iter().map(|e| e.candidate_id.as_str()).collect();
                assert_eq!(order, vec!["a1", "a2", "b1"]);
                assert_eq!(
                    positions[1].skipped_because_min_position,
                    vec!["b1".to_string()]
                );
                assert_eq!(positions[2].from_group, Group::B);
            }
            other => panic!("expected complete merge, got {:?}", other),
        }
    }

    #[test]
    fn merge_never_places_below_the_minimum_position() {
        let cands = vec![
            candidate("a1", Group::A, 1),
            candidate("a2", Group::A, 4),
            candidate("b1", Group::B, 1),
            candidate("b2", Group::B, 1),
        ];
        let lists = PerGroup {
            a: vec![entry("a2", 9.0, 1), entry("a1", 6.0, 2)],
            b: vec![entry("b1", 8.0, 1), entry("b2", 5.0, 2)],
        };
        let confirmations = accept(&["a1", "a2", "b1", "b2"]);
        match merge_lists(Group::A, &lists, &by_id(&cands), &confirmations).unwrap() {
            Merge::Complete { entries, .. } => {
                for e in &entries {
                    let min = cands.iter().find(|c| c.id == e.candidate_id).unwrap();
                    assert!(e.position >= min.min_position);
                }
                assert_eq!(entries.last().unwrap().candidate_id, "a2");
                assert_eq!(entries.last().unwrap().position, 4);
            }
            other => panic!("expected complete merge, got {:?}", other),
        }
    }

    #[test]
    fn missing_confirmation_pauses_the_merge() {
        let cands = vec![
            candidate("a1", Group::A, 1),
            candidate("b1", Group::B, 1),
        ];
        let lists = PerGroup {
            a: vec![entry("a1", 7.0, 1)],
            b: vec![entry("b1", 8.0, 1)],
        };
        let confirmations = accept(&["b1"]);
        match merge_lists(Group::B, &lists, &by_id(&cands), &confirmations).unwrap() {
            Merge::NeedConfirmation {
                candidate,
                position,
                partial,
            } => {
                assert_eq!(candidate, "a1");
                assert_eq!(position, 2);
                assert_eq!(partial.len(), 1);
            }
            other => panic!("expected confirmation request, got {:?}", other),
        }
    }

    #[test]
    fn rejected_candidates_are_passed_over() {
        let cands = vec![
            candidate("a1", Group::A, 1),
            candidate("a2", Group::A, 1),
            candidate("b1", Group::B, 1),
        ];
        let lists = PerGroup {
            a: vec![entry("a1", 7.0, 1), entry("a2", 6.0, 2)],
            b: vec![entry("b1", 8.0, 1)],
        };
        let mut confirmations = accept(&["a2", "b1"]);
        confirmations.push(Confirmation {
            candidate: "a1".to_string(),
            accepted: false,
        });
        match merge_lists(Group::A, &lists, &by_id(&cands), &confirmations).unwrap() {
            Merge::Complete { entries, .. } => {
                let order: Vec<&str> =
                    entries.iter().map(|e| e.candidate_id.as_str()).collect();
                assert_eq!(order, vec!["a2", "b1"]);
            }
            other => panic!("expected complete merge, got {:?}", other),
        }
    }

    #[test]
    fn blocked_position_is_a_data_error() {
        let cands = vec![
            candidate("a1", Group::A, 5),
            candidate("b1", Group::B, 5),
        ];
        let lists = PerGroup {
            a: vec![entry("a1", 7.0, 1)],
            b: vec![entry("b1", 8.0, 1)],
        };
        let confirmations = accept(&["a1", "b1"]);
        assert_eq!(
            merge_lists(Group::A, &lists, &by_id(&cands), &confirmations),
            Err(EvaluationError::NoEligibleCandidate { position: 1 })
        );
    }
}
