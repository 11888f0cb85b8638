//! Per-group tabulation: score averaging, point-count tie-break
//! cascades, direct comparison and preliminary list building.

use log::{debug, info};

use std::collections::{BTreeMap, BTreeSet};

use crate::config::{
    Candidate, CanonicalBallot, EvaluationError, LotDecision, RankedEntry, MAX_POINTS,
    SCORE_EPSILON,
};
use crate::messages::{SpotCandidate, SpotMessage, TieBreakStep};

/// Average score of `candidate` over the ballots that ranked them.
///
/// Abstaining ballots are excluded from numerator and denominator, not
/// treated as zero. Summation runs in ballot-slice order over integers
/// with a single final division, so the result is identical on every
/// invocation.
pub fn average_for(
    candidate: &str,
    ballots: &[CanonicalBallot],
) -> Result<f64, EvaluationError> {
    let mut sum: u64 = 0;
    let mut count: u64 = 0;
    for ballot in ballots {
        if let Some(&points) = ballot.rankings.get(candidate) {
            sum += points as u64;
            count += 1;
        }
    }
    if count == 0 {
        return Err(EvaluationError::NoScoringBallots(candidate.to_string()));
    }
    Ok(sum as f64 / count as f64)
}

/// Averages for a candidate set, in the given candidate order.
fn averages_for(
    candidates: &[String],
    ballots: &[CanonicalBallot],
) -> Result<Vec<(String, f64)>, EvaluationError> {
    let mut out: Vec<(String, f64)> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        out.push((candidate.clone(), average_for(candidate, ballots)?));
    }
    Ok(out)
}

/// The candidates achieving the maximal average, within
/// [`SCORE_EPSILON`]. Order follows the input.
fn top_tier(averages: &[(String, f64)]) -> Vec<String> {
    let mut max = f64::NEG_INFINITY;
    for (_, score) in averages {
        if *score > max {
            max = *score;
        }
    }
    averages
        .iter()
        .filter(|(_, score)| (max - score).abs() < SCORE_EPSILON)
        .map(|(candidate, _)| candidate.clone())
        .collect()
}

/// Runs the point-count cascade on a tied candidate set.
///
/// For each score level from [`MAX_POINTS`] down to 1, only candidates
/// achieving the level's maximum ballot count stay in. Stops as soon as
/// at most `stop_at` candidates remain. Every level visited is recorded
/// with its counts.
fn cascade(
    tied: &[String],
    ballots: &[CanonicalBallot],
    stop_at: usize,
) -> (Vec<String>, Vec<TieBreakStep>) {
    let mut remaining: Vec<String> = tied.to_vec();
    let mut trail: Vec<TieBreakStep> = Vec::new();
    for points in (1..=MAX_POINTS).rev() {
        if remaining.len() <= stop_at {
            break;
        }
        let counts: BTreeMap<String, u32> = remaining
            .iter()
            .map(|candidate| {
                let n = ballots
                    .iter()
                    .filter(|b| b.rankings.get(candidate) == Some(&points))
                    .count() as u32;
                (candidate.clone(), n)
            })
            .collect();
        let max = counts.values().max().copied().unwrap_or(0);
        remaining.retain(|candidate| counts[candidate] == max);
        debug!(
            "cascade: level {}: {} candidate(s) at max count {}",
            points,
            remaining.len(),
            max
        );
        trail.push(TieBreakStep { points, counts });
    }
    (remaining, trail)
}

/// Outcome of a full tie-break: either a unique winner or a request for
/// a manual draw on the narrowed set.
#[derive(PartialEq, Debug, Clone)]
pub(crate) enum TieBreak {
    Resolved {
        winner: String,
        trail: Vec<TieBreakStep>,
    },
    NeedLot {
        candidates: Vec<String>,
        trail: Vec<TieBreakStep>,
    },
}

/// Narrows a tied candidate set to a single winner: point-count cascade
/// first, then the lot-decision log on the remaining set.
pub(crate) fn resolve_tie(
    tied: &[String],
    ballots: &[CanonicalBallot],
    lots: &[LotDecision],
) -> TieBreak {
    let (remaining, trail) = cascade(tied, ballots, 1);
    if remaining.len() == 1 {
        return TieBreak::Resolved {
            winner: remaining.into_iter().next().unwrap(),
            trail,
        };
    }
    if let Some(lot) = lots.iter().find(|lot| lot.matches(&remaining)) {
        info!("resolve_tie: lot decided {} out of {:?}", lot.winner, remaining);
        return TieBreak::Resolved {
            winner: lot.winner.clone(),
            trail,
        };
    }
    TieBreak::NeedLot {
        candidates: remaining,
        trail,
    }
}

/// Result of one direct head-to-head comparison.
#[derive(PartialEq, Debug, Clone)]
pub struct DirectComparison {
    pub winner: String,
    pub loser: String,
    /// Ballots ranking the winner strictly above the loser.
    pub winner_ballots: u32,
    /// Ballots ranking the loser strictly above the winner.
    pub loser_ballots: u32,
    /// Ballots missing a score for one of the two candidates.
    pub excluded_ballots: u32,
    /// Ballots scoring both candidates equally.
    pub equal_ballots: u32,
    /// Cascade steps, non-empty iff the raw counts were tied.
    pub tie_breaker: Vec<TieBreakStep>,
}

/// Outcome of a head-to-head comparison: decided, or waiting on a
/// manual draw.
#[derive(PartialEq, Debug, Clone)]
pub enum Compared {
    Decided(DirectComparison),
    NeedLot {
        candidates: Vec<String>,
        trail: Vec<TieBreakStep>,
    },
}

/// Compares two candidates head to head over the ballots scoring both.
/// An exact tie is delegated to the tie-break cascade and, failing
/// that, the lot log.
pub fn direct_comparison(
    first: &str,
    second: &str,
    ballots: &[CanonicalBallot],
    lots: &[LotDecision],
) -> Compared {
    let mut above: u32 = 0;
    let mut below: u32 = 0;
    let mut equal: u32 = 0;
    let mut excluded: u32 = 0;
    for ballot in ballots {
        match (ballot.rankings.get(first), ballot.rankings.get(second)) {
            (Some(a), Some(b)) if a > b => above += 1,
            (Some(a), Some(b)) if a < b => below += 1,
            (Some(_), Some(_)) => equal += 1,
            _ => excluded += 1,
        }
    }
    debug!(
        "direct_comparison: {} {} vs {} {} (excluded {}, equal {})",
        first, above, second, below, excluded, equal
    );

    if above != below {
        let (winner, loser, winner_ballots, loser_ballots) = if above > below {
            (first, second, above, below)
        } else {
            (second, first, below, above)
        };
        return Compared::Decided(DirectComparison {
            winner: winner.to_string(),
            loser: loser.to_string(),
            winner_ballots,
            loser_ballots,
            excluded_ballots: excluded,
            equal_ballots: equal,
            tie_breaker: Vec::new(),
        });
    }

    let pair = [first.to_string(), second.to_string()];
    match resolve_tie(&pair, ballots, lots) {
        TieBreak::Resolved { winner, trail } => {
            let loser = if winner == first { second } else { first };
            Compared::Decided(DirectComparison {
                loser: loser.to_string(),
                winner,
                winner_ballots: above,
                loser_ballots: below,
                excluded_ballots: excluded,
                equal_ballots: equal,
                tie_breaker: trail,
            })
        }
        TieBreak::NeedLot { candidates, trail } => Compared::NeedLot { candidates, trail },
    }
}

/// A preliminary list pass: either the complete ordered list with its
/// per-position messages, or the lot request that interrupted it.
#[derive(PartialEq, Debug, Clone)]
pub(crate) enum ListBuild {
    Complete {
        entries: Vec<RankedEntry>,
        spots: Vec<SpotMessage>,
    },
    NeedLot {
        candidates: Vec<String>,
        position: u32,
        partial: Vec<RankedEntry>,
    },
}

/// Builds one group's preliminary list, assigning positions 1..K.
///
/// At each position the not-yet-placed candidates are narrowed to the
/// maximal-average tier. A unique top candidate is placed directly; a
/// tier of two goes into a direct comparison; a larger tier runs the
/// point-count cascade until one (placed directly) or two (compared)
/// remain, consulting the lot log when the cascade exhausts.
pub(crate) fn build_preliminary_list(
    members: &[Candidate],
    ballots: &[CanonicalBallot],
    lots: &[LotDecision],
) -> Result<ListBuild, EvaluationError> {
    let ids: Vec<String> = members.iter().map(|c| c.id.clone()).collect();
    let mut placed: BTreeSet<String> = BTreeSet::new();
    let mut shifts: BTreeMap<String, u32> = ids.iter().map(|id| (id.clone(), 0)).collect();
    let mut entries: Vec<RankedEntry> = Vec::new();
    let mut spots: Vec<SpotMessage> = Vec::new();

    for position in 1..=ids.len() as u32 {
        let remaining: Vec<String> = ids
            .iter()
            .filter(|id| !placed.contains(*id))
            .cloned()
            .collect();

        enum Step {
            Single {
                candidate: String,
                trail: Vec<TieBreakStep>,
                by_lot: bool,
            },
            Duo(String, String, Vec<TieBreakStep>),
            Blocked(Vec<String>),
        }

        let step = if remaining.len() == 1 {
            Step::Single {
                candidate: remaining[0].clone(),
                trail: Vec::new(),
                by_lot: false,
            }
        } else {
            let averages = averages_for(&remaining, ballots)?;
            let tier = top_tier(&averages);
            match tier.len() {
                1 => Step::Single {
                    candidate: tier.into_iter().next().unwrap(),
                    trail: Vec::new(),
                    by_lot: false,
                },
                2 => Step::Duo(tier[0].clone(), tier[1].clone(), Vec::new()),
                _ => {
                    let (reduced, trail) = cascade(&tier, ballots, 2);
                    match reduced.len() {
                        1 => Step::Single {
                            candidate: reduced.into_iter().next().unwrap(),
                            trail,
                            by_lot: false,
                        },
                        2 => Step::Duo(reduced[0].clone(), reduced[1].clone(), trail),
                        _ => match lots.iter().find(|lot| lot.matches(&reduced)) {
                            Some(lot) => Step::Single {
                                candidate: lot.winner.clone(),
                                trail,
                                by_lot: true,
                            },
                            None => Step::Blocked(reduced),
                        },
                    }
                }
            }
        };

        match step {
            Step::Single {
                candidate,
                trail,
                by_lot,
            } => {
                let score = average_for(&candidate, ballots)?;
                let shift = -(shifts[&candidate] as i32);
                debug!(
                    "build_preliminary_list: position {} single {} (lot: {})",
                    position, candidate, by_lot
                );
                entries.push(RankedEntry {
                    candidate_id: candidate.clone(),
                    score,
                    shift,
                    position,
                });
                spots.push(SpotMessage::Single {
                    position,
                    candidate_id: candidate.clone(),
                    score,
                    shift,
                    tie_breaker: trail,
                    decided_by_lot: by_lot,
                });
                placed.insert(candidate);
            }
            Step::Duo(first, second, tier_trail) => match direct_comparison(&first, &second, ballots, lots)
            {
                Compared::NeedLot { candidates, .. } => {
                    return Ok(ListBuild::NeedLot {
                        candidates,
                        position,
                        partial: entries,
                    });
                }
                Compared::Decided(cmp) => {
                    *shifts.get_mut(&cmp.loser).unwrap() += 1;
                    let winner_score = average_for(&cmp.winner, ballots)?;
                    let loser_score = average_for(&cmp.loser, ballots)?;
                    let winner_shift = -(shifts[&cmp.winner] as i32);
                    let mut tie_breaker = tier_trail;
                    tie_breaker.extend(cmp.tie_breaker);
                    info!(
                        "build_preliminary_list: position {}: {} wins against {} ({} to {})",
                        position, cmp.winner, cmp.loser, cmp.winner_ballots, cmp.loser_ballots
                    );
                    entries.push(RankedEntry {
                        candidate_id: cmp.winner.clone(),
                        score: winner_score,
                        shift: winner_shift,
                        position,
                    });
                    spots.push(SpotMessage::Duo {
                        position,
                        winner: SpotCandidate {
                            candidate_id: cmp.winner.clone(),
                            score: winner_score,
                            shift: winner_shift,
                            comparison_ballots: cmp.winner_ballots,
                        },
                        loser: SpotCandidate {
                            candidate_id: cmp.loser.clone(),
                            score: loser_score,
                            shift: -(shifts[&cmp.loser] as i32),
                            comparison_ballots: cmp.loser_ballots,
                        },
                        excluded_ballots: cmp.excluded_ballots,
                        equal_ballots: cmp.equal_ballots,
                        tie_breaker,
                    });
                    placed.insert(cmp.winner);
                }
            },
            Step::Blocked(candidates) => {
                return Ok(ListBuild::NeedLot {
                    candidates,
                    position,
                    partial: entries,
                });
            }
        }
    }

    Ok(ListBuild::Complete { entries, spots })
}
