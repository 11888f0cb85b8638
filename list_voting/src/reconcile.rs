//! Reconciliation of repeated ballot counts into canonical records.
//!
//! Every physical ballot is counted at least twice. Two matching counts
//! make the ballot canonical; two differing counts demand a third; from
//! the third count on, the most recent submission supersedes everything
//! before it.

use log::debug;

use crate::config::{BallotSubmission, CanonicalBallot, EvaluationError, Group};

/// Outcome of resolving one ballot id.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Reconciled {
    Canonical(CanonicalBallot),
    /// The ballot cannot be trusted yet and needs another count.
    AdditionalCountNeeded,
}

pub struct BallotReconciler<'a> {
    submissions: &'a [BallotSubmission],
}

impl<'a> BallotReconciler<'a> {
    pub fn new(submissions: &'a [BallotSubmission]) -> BallotReconciler<'a> {
        BallotReconciler { submissions }
    }

    /// All distinct ballot ids, in first-seen order.
    pub fn ballot_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for sub in self.submissions {
            if !ids.contains(&sub.ballot_id) {
                ids.push(sub.ballot_id.clone());
            }
        }
        ids
    }

    /// Submissions for one ballot id, most recent first. The sort is
    /// stable so equal timestamps keep their input order.
    fn submissions_for(&self, ballot_id: &str) -> Vec<&'a BallotSubmission> {
        let mut subs: Vec<&BallotSubmission> = self
            .submissions
            .iter()
            .filter(|s| s.ballot_id == ballot_id)
            .collect();
        subs.sort_by(|x, y| y.created.cmp(&x.created));
        subs
    }

    /// Resolves one ballot id into a canonical record, or reports that
    /// another count is required.
    pub fn resolve(&self, ballot_id: &str) -> Result<Reconciled, EvaluationError> {
        let subs = self.submissions_for(ballot_id);
        match subs.as_slice() {
            [] => Err(EvaluationError::UnknownBallot(ballot_id.to_string())),
            [_single] => Ok(Reconciled::AdditionalCountNeeded),
            [first, second] => {
                if first.rankings == second.rankings {
                    Ok(Reconciled::Canonical(canonical(first)))
                } else {
                    debug!(
                        "resolve: counts for ballot {} differ, third count required",
                        ballot_id
                    );
                    Ok(Reconciled::AdditionalCountNeeded)
                }
            }
            // Three or more counts: the most recent one supersedes.
            [latest, ..] => Ok(Reconciled::Canonical(canonical(latest))),
        }
    }

    /// The canonical records of all ballots resolvable so far. Blocked
    /// ballots are left out, not folded in.
    pub fn merged(&self) -> Vec<CanonicalBallot> {
        let mut out: Vec<CanonicalBallot> = Vec::new();
        for id in self.ballot_ids() {
            if let Ok(Reconciled::Canonical(ballot)) = self.resolve(&id) {
                out.push(ballot);
            }
        }
        out
    }

    pub fn merged_by_group(&self, group: Group) -> Vec<CanonicalBallot> {
        self.merged()
            .into_iter()
            .filter(|b| b.group == group)
            .collect()
    }

    /// Ballot ids still blocked on another count.
    pub fn additional_count_needed(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for id in self.ballot_ids() {
            if let Ok(Reconciled::AdditionalCountNeeded) = self.resolve(&id) {
                out.push(id);
            }
        }
        out
    }

    /// True iff every ballot resolves into a canonical record.
    pub fn validate(&self) -> bool {
        self.additional_count_needed().is_empty()
    }
}

fn canonical(sub: &BallotSubmission) -> CanonicalBallot {
    CanonicalBallot {
        ballot_id: sub.ballot_id.clone(),
        group: sub.group,
        rankings: sub.rankings.clone(),
    }
}
