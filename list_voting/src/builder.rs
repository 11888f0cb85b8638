pub use crate::config::*;

use crate::reconcile::BallotReconciler;

/// A builder for assembling an election incrementally.
///
/// The builder collects candidates, raw ballot submissions and the
/// external decision log, reconciles the submissions and runs the
/// evaluation. It is the recommended entry point for programmatic use;
/// callers with pre-reconciled ballots can call [`crate::evaluate`]
/// directly.
///
/// ```
/// pub use list_voting::builder::Builder;
/// pub use list_voting::{EvaluationResult, Group};
/// # use list_voting::EvaluationError;
///
/// let mut builder = Builder::new()
///     .candidate("anna", Group::A, 1)
///     .candidate("carl", Group::B, 1);
///
/// // Every ballot is counted twice.
/// builder.add_submission("a-1", Group::A, 10, &[("anna", 8)]);
/// builder.add_submission("a-1", Group::A, 20, &[("anna", 8)]);
/// builder.add_submission("b-1", Group::B, 10, &[("carl", 6)]);
/// builder.add_submission("b-1", Group::B, 20, &[("carl", 6)]);
///
/// let result = builder.evaluate()?;
/// assert!(matches!(result, EvaluationResult::NeedRunoff { .. }));
///
/// # Ok::<(), EvaluationError>(())
/// ```
#[derive(Default)]
pub struct Builder {
    pub(crate) _candidates: Vec<Candidate>,
    pub(crate) _submissions: Vec<BallotSubmission>,
    pub(crate) _lots: Vec<LotDecision>,
    pub(crate) _confirmations: Vec<Confirmation>,
    pub(crate) _runoff_rounds: Vec<RunoffRound>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Adds a candidate with the id doubling as the displayed name.
    ///
    /// It is the simplest use case for most cases; use
    /// [`Builder::add_candidate`] when the full name record matters.
    pub fn candidate(self, id: &str, group: Group, min_position: u32) -> Builder {
        self.add_candidate(Candidate {
            id: id.to_string(),
            first_name: id.to_string(),
            last_name: String::new(),
            title: None,
            extra: None,
            group,
            min_position,
        })
    }

    pub fn add_candidate(mut self, candidate: Candidate) -> Builder {
        self._candidates.push(candidate);
        self
    }

    /// Records one physical count of one ballot. The same ballot id is
    /// expected to show up once per count.
    pub fn add_submission(
        &mut self,
        ballot_id: &str,
        group: Group,
        created: u64,
        rankings: &[(&str, u32)],
    ) {
        let rankings: Rankings = rankings
            .iter()
            .map(|(candidate, points)| (candidate.to_string(), *points))
            .collect();
        self._submissions.push(BallotSubmission {
            ballot_id: ballot_id.to_string(),
            group,
            created,
            rankings,
        });
    }

    /// Appends a manual draw to the decision log.
    pub fn lot(&mut self, candidates: &[String], winner: &str) {
        self._lots.push(LotDecision {
            candidates: candidates.to_vec(),
            winner: winner.to_string(),
        });
    }

    /// Appends a candidate's acceptance or rejection to the decision
    /// log. A later record for the same candidate supersedes.
    pub fn confirm(&mut self, candidate: &str, accepted: bool) {
        self._confirmations.push(Confirmation {
            candidate: candidate.to_string(),
            accepted,
        });
    }

    /// Appends a runoff round tally. Only the latest round counts.
    pub fn runoff_round(&mut self, total: u32, a: u32, b: u32, abstentions: u32) {
        self._runoff_rounds.push(RunoffRound {
            total,
            a,
            b,
            abstentions,
        });
    }

    /// Ballot ids still waiting on another count after reconciliation.
    pub fn additional_count_needed(&self) -> Vec<String> {
        BallotReconciler::new(&self._submissions).additional_count_needed()
    }

    /// Reconciles the submissions and runs one evaluation pass.
    pub fn evaluate(&self) -> Result<EvaluationResult, EvaluationError> {
        let ballots = BallotReconciler::new(&self._submissions).merged();
        crate::evaluate(
            &self._candidates,
            &ballots,
            &self._lots,
            &self._confirmations,
            &self._runoff_rounds,
        )
    }
}
