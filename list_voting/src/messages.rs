//! Structured audit-trace messages.
//!
//! Every stage of the pipeline reports what it decided and why through
//! these types. They are first-class return data, not a logging side
//! channel: tests and the certificate generator assert on them
//! directly.

use std::collections::BTreeMap;

use crate::config::{Group, PerGroup, RunoffPick};

/// Null-vote quorum screening record for one candidate.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct QuorumRecord {
    pub candidate_id: String,
    /// Canonical ballots scoring the candidate exactly 0.
    pub null_votes: u32,
    /// Canonical ballots scoring the candidate with anything above 0.
    pub non_null_votes: u32,
    pub passed: bool,
}

/// One level of the point-count cascade: how many ballots gave each
/// still-tied candidate exactly `points`.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TieBreakStep {
    pub points: u32,
    pub counts: BTreeMap<String, u32>,
}

/// One side of a direct comparison.
#[derive(PartialEq, Debug, Clone)]
pub struct SpotCandidate {
    pub candidate_id: String,
    pub score: f64,
    pub shift: i32,
    /// Ballots counted for this candidate in the comparison.
    pub comparison_ballots: u32,
}

/// How one preliminary-list position was filled.
#[derive(PartialEq, Debug, Clone)]
pub enum SpotMessage {
    /// Placed without a direct comparison.
    Single {
        position: u32,
        candidate_id: String,
        score: f64,
        shift: i32,
        /// Cascade steps that narrowed a larger tied tier down to this
        /// candidate, when any were needed.
        tie_breaker: Vec<TieBreakStep>,
        /// True when the exhausted cascade was settled by a recorded
        /// lot draw.
        decided_by_lot: bool,
    },
    /// Placed by direct comparison between the top two contenders.
    Duo {
        position: u32,
        winner: SpotCandidate,
        loser: SpotCandidate,
        /// Ballots missing one of the two candidates.
        excluded_ballots: u32,
        /// Ballots scoring both candidates equally.
        equal_ballots: u32,
        /// Cascade steps: first the ones that narrowed a larger tier
        /// down to this pair, then the ones breaking a tied comparison.
        tie_breaker: Vec<TieBreakStep>,
    },
}

/// One position of the combined list.
#[derive(PartialEq, Debug, Clone)]
pub struct CombinedPosition {
    pub position: u32,
    pub candidate_id: String,
    /// The preliminary list the candidate was drawn from.
    pub from_group: Group,
    pub score: f64,
    pub shift: i32,
    /// Candidates passed over because their minimum eligible position
    /// was not reached yet.
    pub skipped_because_min_position: Vec<String>,
}

#[derive(PartialEq, Debug, Clone)]
pub enum EvaluationMessage {
    /// Canonical ballots that entered the tabulation.
    BallotCount { total: u32, per_group: PerGroup<u32> },
    /// Null-vote quorum screening, one record per candidate.
    Quorum { candidates: Vec<QuorumRecord> },
    /// The per-position decisions for one group's preliminary list.
    PreliminaryList { group: Group, spots: Vec<SpotMessage> },
    /// Which candidate each group sends into the runoff.
    RunoffCandidates { picks: PerGroup<RunoffPick> },
    /// The authoritative (latest) runoff round.
    Runoff {
        candidates: PerGroup<String>,
        votes: PerGroup<u32>,
    },
    /// The interleaved merge of the two preliminary lists.
    Combined { positions: Vec<CombinedPosition> },
}
