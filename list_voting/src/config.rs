// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

/// The highest score a voter may give to a candidate. The tie-break
/// cascade walks from this level down to 1.
pub const MAX_POINTS: u32 = 10;

/// Tolerance when comparing two averaged scores for equality.
///
/// This is a policy choice of the election rules, not a numerical
/// workaround: scores are sums of small integers divided by a ballot
/// count, so any two averages closer than this are considered tied.
pub const SCORE_EPSILON: f64 = 1e-7;

/// One of the two disjoint candidate groups. The tabulation rules are
/// applied symmetrically to each.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Group {
    A,
    B,
}

impl Group {
    /// Both groups, in evaluation order.
    pub const BOTH: [Group; 2] = [Group::A, Group::B];

    pub fn other(self) -> Group {
        match self {
            Group::A => Group::B,
            Group::B => Group::A,
        }
    }
}

impl Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Group::A => write!(f, "a"),
            Group::B => write!(f, "b"),
        }
    }
}

/// A container holding one value per candidate group.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct PerGroup<T> {
    pub a: T,
    pub b: T,
}

impl<T> PerGroup<T> {
    pub fn get(&self, group: Group) -> &T {
        match group {
            Group::A => &self.a,
            Group::B => &self.b,
        }
    }

    pub fn get_mut(&mut self, group: Group) -> &mut T {
        match group {
            Group::A => &mut self.a,
            Group::B => &mut self.b,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Candidate {
    /// Unique within one election.
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub title: Option<String>,
    pub extra: Option<String>,
    pub group: Group,
    /// The earliest list position this candidate may legally occupy
    /// (1-based).
    pub min_position: u32,
}

impl Candidate {
    /// The printable name: title, first name, last name, extra.
    pub fn display_name(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(title) = &self.title {
            parts.push(title);
        }
        if !self.first_name.is_empty() {
            parts.push(&self.first_name);
        }
        if !self.last_name.is_empty() {
            parts.push(&self.last_name);
        }
        if let Some(extra) = &self.extra {
            parts.push(extra);
        }
        parts.join(" ")
    }
}

/// Scores by candidate id. A candidate absent from the map abstained on
/// that ballot; a score of 0 is an explicit null vote.
pub type Rankings = BTreeMap<String, u32>;

/// One physical count of one ballot, as delivered by the capture layer.
/// The capture layer does not deduplicate: the same ballot id shows up
/// once per count.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BallotSubmission {
    pub ballot_id: String,
    pub group: Group,
    /// Timestamp of the count. Later counts supersede earlier ones.
    pub created: u64,
    pub rankings: Rankings,
}

/// The reconciled, trusted record for one ballot id.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CanonicalBallot {
    pub ballot_id: String,
    pub group: Group,
    pub rankings: Rankings,
}

/// External record of a manual draw between tied candidates. The
/// candidate set is order-independent.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct LotDecision {
    pub candidates: Vec<String>,
    pub winner: String,
}

impl LotDecision {
    /// Set-equality match against a tied candidate set.
    pub fn matches(&self, tied: &[String]) -> bool {
        self.candidates.len() == tied.len()
            && tied.iter().all(|c| self.candidates.contains(c))
    }
}

/// External record of a candidate accepting or declining their
/// placement. Absence of a record is not a rejection.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Confirmation {
    pub candidate: String,
    pub accepted: bool,
}

/// Tally of one runoff vote between the two group-winners. Only the
/// latest round is authoritative.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RunoffRound {
    pub total: u32,
    pub a: u32,
    pub b: u32,
    pub abstentions: u32,
}

// ******** Output data structures *********

/// A candidate's computed standing on a produced list.
#[derive(PartialEq, Debug, Clone)]
pub struct RankedEntry {
    pub candidate_id: String,
    /// Average score over the ballots that ranked the candidate.
    pub score: f64,
    /// Lost direct comparisons, reported as a negative offset. Audit
    /// only; never alters ordering.
    pub shift: i32,
    pub position: u32,
}

/// The candidate a group sends into the runoff, with the entries that
/// were passed over on the way because of their minimum position.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RunoffPick {
    pub candidate_id: String,
    pub skipped_because_min_position: Vec<String>,
}

/// Outcome of one orchestration pass.
///
/// The three `Need*` variants are ordinary workflow pauses: the caller
/// collects the missing external decision, appends it to the decision
/// log and calls [`crate::evaluate`] again. Each variant carries the
/// context needed to resume.
#[derive(PartialEq, Debug, Clone)]
pub enum EvaluationResult {
    /// All deterministic tie-break rules exhausted; a manual draw
    /// between `candidates` is required before `position` on the given
    /// group list can be filled.
    NeedLot {
        candidates: Vec<String>,
        group: Group,
        position: u32,
        partial_list: Vec<RankedEntry>,
        /// Group lists already completed when the pass was aborted.
        preliminary_lists: PerGroup<Option<Vec<RankedEntry>>>,
    },
    /// Both preliminary lists are complete but no runoff round has
    /// decided which group leads the combined list.
    NeedRunoff {
        preliminary_lists: PerGroup<Vec<RankedEntry>>,
        runoff_candidates: PerGroup<RunoffPick>,
    },
    /// The merge reached a candidate with no confirmation on record.
    NeedConfirmation {
        candidate: String,
        position: u32,
        partial_list: Vec<RankedEntry>,
        preliminary_lists: PerGroup<Vec<RankedEntry>>,
        runoff_candidates: PerGroup<RunoffPick>,
    },
    /// Terminal state: the combined list is fully assigned. Carries the
    /// complete decision trace for audit and certificate generation.
    ListComplete {
        final_list: Vec<RankedEntry>,
        preliminary_lists: PerGroup<Vec<RankedEntry>>,
        runoff_candidates: PerGroup<RunoffPick>,
        messages: Vec<crate::messages::EvaluationMessage>,
    },
}

/// Errors that abort an evaluation pass entirely.
///
/// These are defects in the upstream input, never workflow pauses
/// (pauses are [`EvaluationResult`] variants). The engine does not
/// retry; the caller must fix the input. `Unsupported` is the distinct
/// kind for rule branches that are deliberately not implemented.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum EvaluationError {
    NoBallots,
    NoCandidates,
    /// A ballot id with no submissions was requested.
    UnknownBallot(String),
    /// A ranking references a candidate id absent from the candidate set.
    UnknownCandidate(String),
    DuplicateCandidate(String),
    ScoreOutOfRange { candidate: String, points: u32 },
    /// A candidate has no ballot ranking them at all.
    NoScoringBallots(String),
    /// A group list has no candidate allowed on any position.
    NoRunoffCandidate(Group),
    /// No unplaced candidate on either list may occupy the next
    /// combined position.
    NoEligibleCandidate { position: u32 },
    Unsupported(&'static str),
}

impl Error for EvaluationError {}

impl Display for EvaluationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluationError::NoBallots => write!(f, "no ballots to evaluate"),
            EvaluationError::NoCandidates => write!(f, "no candidates to evaluate"),
            EvaluationError::UnknownBallot(id) => {
                write!(f, "no submissions found for ballot {}", id)
            }
            EvaluationError::UnknownCandidate(id) => {
                write!(f, "ranking references unknown candidate {}", id)
            }
            EvaluationError::DuplicateCandidate(id) => {
                write!(f, "duplicate candidate id {}", id)
            }
            EvaluationError::ScoreOutOfRange { candidate, points } => {
                write!(
                    f,
                    "score {} for candidate {} is above the maximum of {}",
                    points, candidate, MAX_POINTS
                )
            }
            EvaluationError::NoScoringBallots(id) => {
                write!(f, "candidate {} has no scoring ballot", id)
            }
            EvaluationError::NoRunoffCandidate(group) => {
                write!(f, "no runoff candidate found on group list {}", group)
            }
            EvaluationError::NoEligibleCandidate { position } => {
                write!(f, "no candidate is eligible for position {}", position)
            }
            EvaluationError::Unsupported(what) => {
                write!(f, "not implemented: {}", what)
            }
        }
    }
}
