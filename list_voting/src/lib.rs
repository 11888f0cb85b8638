/*!
Tabulation engine for two-group ranked-list elections.

The engine turns a set of candidates, the canonical ballots produced by
[`BallotReconciler`] and an append-only log of external decisions (lot
draws, candidate confirmations, runoff rounds) into either a completed
combined list or a well-specified waiting state. See the [`manual`] for
the full rule set.

The computation is synchronous, side-effect free and deterministic:
calling [`evaluate`] twice on the same inputs yields identical results,
including the audit-message trace. Workflow pauses are ordinary
[`EvaluationResult`] variants, never errors; the caller appends the
missing decision to the log and evaluates again.
*/

pub mod builder;
mod config;
pub mod manual;
pub mod messages;
mod merge;
mod reconcile;
mod tabulate;

use log::{debug, info};

use std::collections::BTreeMap;

pub use crate::config::*;
pub use crate::reconcile::{BallotReconciler, Reconciled};
pub use crate::tabulate::{average_for, direct_comparison, Compared, DirectComparison};

use crate::merge::{merge_lists, resolve_runoff, runoff_pick, Merge, RunoffOutcome};
use crate::messages::{EvaluationMessage, QuorumRecord};
use crate::tabulate::{build_preliminary_list, ListBuild};

/// Validates the raw input before any tabulation: candidate ids must be
/// unique, every ranked id must belong to a candidate and scores must
/// stay within the ballot's domain.
fn checks(
    candidates: &[Candidate],
    ballots: &[CanonicalBallot],
) -> Result<(), EvaluationError> {
    let mut seen: BTreeMap<&str, ()> = BTreeMap::new();
    for candidate in candidates {
        if seen.insert(&candidate.id, ()).is_some() {
            return Err(EvaluationError::DuplicateCandidate(candidate.id.clone()));
        }
    }
    for ballot in ballots {
        for (candidate_id, &points) in &ballot.rankings {
            if !seen.contains_key(candidate_id.as_str()) {
                return Err(EvaluationError::UnknownCandidate(candidate_id.clone()));
            }
            if points > MAX_POINTS {
                return Err(EvaluationError::ScoreOutOfRange {
                    candidate: candidate_id.clone(),
                    points,
                });
            }
        }
    }
    Ok(())
}

/// Null-vote quorum screen: a candidate fails iff the ballots scoring
/// them exactly 0 are at least as many as the ballots scoring them
/// above 0. A candidate nobody scored fails as well.
fn screen_candidates(
    candidates: &[Candidate],
    ballots: &[CanonicalBallot],
) -> Vec<QuorumRecord> {
    candidates
        .iter()
        .map(|candidate| {
            let mut null_votes: u32 = 0;
            let mut scored: u32 = 0;
            for ballot in ballots {
                match ballot.rankings.get(&candidate.id) {
                    Some(0) => null_votes += 1,
                    Some(_) => scored += 1,
                    None => {}
                }
            }
            let record = QuorumRecord {
                candidate_id: candidate.id.clone(),
                null_votes,
                non_null_votes: scored,
                passed: null_votes < scored,
            };
            debug!(
                "screen_candidates: {} null {} non-null {} passed {}",
                record.candidate_id, record.null_votes, record.non_null_votes, record.passed
            );
            record
        })
        .collect()
}

/// Runs the whole pipeline once against the current inputs and decision
/// log.
///
/// `ballots` are canonical records; raw submissions must pass through
/// [`BallotReconciler`] first, and ballots still waiting on another
/// count are the caller's to report. The decision logs are append-only;
/// re-running after appending one decision either advances to the next
/// waiting state or completes, never regresses.
pub fn evaluate(
    candidates: &[Candidate],
    ballots: &[CanonicalBallot],
    lots: &[LotDecision],
    confirmations: &[Confirmation],
    runoff_rounds: &[RunoffRound],
) -> Result<EvaluationResult, EvaluationError> {
    if ballots.is_empty() {
        return Err(EvaluationError::NoBallots);
    }
    if candidates.is_empty() {
        return Err(EvaluationError::NoCandidates);
    }
    checks(candidates, ballots)?;
    info!(
        "evaluate: {} candidates, {} canonical ballots",
        candidates.len(),
        ballots.len()
    );

    let mut messages: Vec<EvaluationMessage> = Vec::new();

    let per_group_ballots: PerGroup<Vec<CanonicalBallot>> = PerGroup {
        a: ballots.iter().filter(|b| b.group == Group::A).cloned().collect(),
        b: ballots.iter().filter(|b| b.group == Group::B).cloned().collect(),
    };
    messages.push(EvaluationMessage::BallotCount {
        total: ballots.len() as u32,
        per_group: PerGroup {
            a: per_group_ballots.a.len() as u32,
            b: per_group_ballots.b.len() as u32,
        },
    });

    let quorum = screen_candidates(candidates, ballots);
    let passed: Vec<&Candidate> = candidates
        .iter()
        .zip(quorum.iter())
        .filter(|(_, record)| record.passed)
        .map(|(candidate, _)| candidate)
        .collect();
    messages.push(EvaluationMessage::Quorum {
        candidates: quorum,
    });

    let groups: PerGroup<Vec<Candidate>> = PerGroup {
        a: passed
            .iter()
            .filter(|c| c.group == Group::A)
            .map(|c| (*c).clone())
            .collect(),
        b: passed
            .iter()
            .filter(|c| c.group == Group::B)
            .map(|c| (*c).clone())
            .collect(),
    };
    if groups.a.is_empty() || groups.b.is_empty() {
        // The source rules leave single-group elections undefined.
        return Err(EvaluationError::Unsupported(
            "elections where only one group has eligible candidates",
        ));
    }

    let mut preliminary: PerGroup<Option<Vec<RankedEntry>>> = PerGroup::default();
    for group in Group::BOTH {
        let members = groups.get(group);
        let group_ballots = per_group_ballots.get(group);
        match build_preliminary_list(members, group_ballots, lots)? {
            ListBuild::Complete { entries, spots } => {
                messages.push(EvaluationMessage::PreliminaryList { group, spots });
                *preliminary.get_mut(group) = Some(entries);
            }
            ListBuild::NeedLot {
                candidates: tied,
                position,
                partial,
            } => {
                info!(
                    "evaluate: group {} needs a lot between {:?} for position {}",
                    group, tied, position
                );
                return Ok(EvaluationResult::NeedLot {
                    candidates: tied,
                    group,
                    position,
                    partial_list: partial,
                    preliminary_lists: preliminary,
                });
            }
        }
    }
    let preliminary: PerGroup<Vec<RankedEntry>> = PerGroup {
        a: preliminary.a.unwrap(),
        b: preliminary.b.unwrap(),
    };

    let candidates_by_id: BTreeMap<String, &Candidate> =
        candidates.iter().map(|c| (c.id.clone(), c)).collect();
    let picks: PerGroup<RunoffPick> = PerGroup {
        a: runoff_pick(Group::A, &preliminary.a, &candidates_by_id)?,
        b: runoff_pick(Group::B, &preliminary.b, &candidates_by_id)?,
    };
    messages.push(EvaluationMessage::RunoffCandidates {
        picks: picks.clone(),
    });

    let winner_group = match resolve_runoff(runoff_rounds) {
        RunoffOutcome::Undecided => {
            info!("evaluate: runoff undecided");
            return Ok(EvaluationResult::NeedRunoff {
                preliminary_lists: preliminary,
                runoff_candidates: picks,
            });
        }
        RunoffOutcome::Decided(group) => group,
    };
    // resolve_runoff only decides when a round exists.
    let latest = runoff_rounds.last().unwrap();
    info!("evaluate: runoff decided for group {}", winner_group);
    messages.push(EvaluationMessage::Runoff {
        candidates: PerGroup {
            a: picks.a.candidate_id.clone(),
            b: picks.b.candidate_id.clone(),
        },
        votes: PerGroup {
            a: latest.a,
            b: latest.b,
        },
    });

    match merge_lists(winner_group, &preliminary, &candidates_by_id, confirmations)? {
        Merge::NeedConfirmation {
            candidate,
            position,
            partial,
        } => Ok(EvaluationResult::NeedConfirmation {
            candidate,
            position,
            partial_list: partial,
            preliminary_lists: preliminary,
            runoff_candidates: picks,
        }),
        Merge::Complete { entries, positions } => {
            messages.push(EvaluationMessage::Combined { positions });
            Ok(EvaluationResult::ListComplete {
                final_list: entries,
                preliminary_lists: preliminary,
                runoff_candidates: picks,
                messages,
            })
        }
    }
}
