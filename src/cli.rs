use log::{info, warn};

use list_voting::*;
use snafu::{prelude::*, Snafu};

use std::fs;

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::cli::config_reader::*;

#[derive(Debug, Snafu)]
pub enum CliError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display(""))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Unknown group label {label} (expected 'a' or 'b')"))]
    UnknownGroup { label: String },
    #[snafu(display("Error writing summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

type CliResult<T> = Result<T, CliError>;

pub mod config_reader {
    use crate::cli::*;
    use std::collections::BTreeMap;

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct CandidateRecord {
        pub id: String,
        #[serde(rename = "firstName")]
        pub first_name: String,
        #[serde(rename = "lastName")]
        pub last_name: String,
        pub title: Option<String>,
        pub extra: Option<String>,
        pub group: String,
        #[serde(rename = "minPosition")]
        pub min_position: u32,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct SubmissionRecord {
        #[serde(rename = "ballotId")]
        pub ballot_id: String,
        pub group: String,
        pub created: u64,
        pub rankings: BTreeMap<String, u32>,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct LotRecord {
        pub candidates: Vec<String>,
        pub winner: String,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct ConfirmationRecord {
        pub candidate: String,
        pub accepted: bool,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct RunoffRecord {
        pub total: u32,
        pub a: u32,
        pub b: u32,
        pub abstentions: u32,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct ElectionConfig {
        pub candidates: Vec<CandidateRecord>,
        pub submissions: Vec<SubmissionRecord>,
        #[serde(rename = "lotDecisions", default)]
        pub lot_decisions: Vec<LotRecord>,
        #[serde(default)]
        pub confirmations: Vec<ConfirmationRecord>,
        #[serde(rename = "runoffRounds", default)]
        pub runoff_rounds: Vec<RunoffRecord>,
    }

    pub fn read_config(path: String) -> CliResult<ElectionConfig> {
        let contents = fs::read_to_string(path.clone())
            .context(OpeningJsonSnafu { path })?;
        let config: ElectionConfig =
            serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
        Ok(config)
    }

    pub fn read_summary(path: String) -> CliResult<JSValue> {
        let contents = fs::read_to_string(path.clone())
            .context(OpeningJsonSnafu { path })?;
        let js: JSValue =
            serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
        Ok(js)
    }

    pub fn parse_group(label: &str) -> CliResult<Group> {
        match label {
            "a" => Ok(Group::A),
            "b" => Ok(Group::B),
            _ => UnknownGroupSnafu { label }.fail(),
        }
    }
}

fn to_candidates(records: &[CandidateRecord]) -> CliResult<Vec<Candidate>> {
    records
        .iter()
        .map(|r| {
            Ok(Candidate {
                id: r.id.clone(),
                first_name: r.first_name.clone(),
                last_name: r.last_name.clone(),
                title: r.title.clone(),
                extra: r.extra.clone(),
                group: parse_group(&r.group)?,
                min_position: r.min_position,
            })
        })
        .collect()
}

fn to_submissions(records: &[SubmissionRecord]) -> CliResult<Vec<BallotSubmission>> {
    records
        .iter()
        .map(|r| {
            Ok(BallotSubmission {
                ballot_id: r.ballot_id.clone(),
                group: parse_group(&r.group)?,
                created: r.created,
                rankings: r.rankings.clone(),
            })
        })
        .collect()
}

fn entries_js(entries: &[RankedEntry]) -> Vec<JSValue> {
    entries
        .iter()
        .map(|e| {
            json!({
                "candidateId": e.candidate_id,
                "score": e.score,
                "shift": e.shift,
                "position": e.position,
            })
        })
        .collect()
}

fn pick_js(pick: &RunoffPick) -> JSValue {
    json!({
        "candidateId": pick.candidate_id,
        "skippedBecauseMinPosition": pick.skipped_because_min_position,
    })
}

fn lists_js(lists: &PerGroup<Vec<RankedEntry>>) -> JSValue {
    json!({
        "a": entries_js(&lists.a),
        "b": entries_js(&lists.b),
    })
}

fn steps_js(steps: &[messages::TieBreakStep]) -> Vec<JSValue> {
    steps
        .iter()
        .map(|s| json!({"points": s.points, "counts": s.counts}))
        .collect()
}

fn spot_js(spot: &messages::SpotMessage) -> JSValue {
    match spot {
        messages::SpotMessage::Single {
            position,
            candidate_id,
            score,
            shift,
            tie_breaker,
            decided_by_lot,
        } => json!({
            "kind": "single",
            "position": position,
            "candidateId": candidate_id,
            "score": score,
            "shift": shift,
            "tieBreaker": steps_js(tie_breaker),
            "decidedByLot": decided_by_lot,
        }),
        messages::SpotMessage::Duo {
            position,
            winner,
            loser,
            excluded_ballots,
            equal_ballots,
            tie_breaker,
        } => {
            let side = |c: &messages::SpotCandidate| {
                json!({
                    "candidateId": c.candidate_id,
                    "score": c.score,
                    "shift": c.shift,
                    "comparisonBallots": c.comparison_ballots,
                })
            };
            json!({
                "kind": "duo",
                "position": position,
                "winner": side(winner),
                "loser": side(loser),
                "excludedBallots": excluded_ballots,
                "equalBallots": equal_ballots,
                "tieBreaker": steps_js(tie_breaker),
            })
        }
    }
}

fn messages_js(msgs: &[messages::EvaluationMessage]) -> Vec<JSValue> {
    use messages::EvaluationMessage::*;
    msgs.iter()
        .map(|m| match m {
            BallotCount { total, per_group } => json!({
                "type": "ballotCount",
                "total": total,
                "groupA": per_group.a,
                "groupB": per_group.b,
            }),
            Quorum { candidates } => {
                let records: Vec<JSValue> = candidates
                    .iter()
                    .map(|r| {
                        json!({
                            "candidateId": r.candidate_id,
                            "nullVotes": r.null_votes,
                            "nonNullVotes": r.non_null_votes,
                            "passed": r.passed,
                        })
                    })
                    .collect();
                json!({"type": "quorum", "candidates": records})
            }
            PreliminaryList { group, spots } => {
                let spots: Vec<JSValue> = spots.iter().map(spot_js).collect();
                json!({
                    "type": "preliminaryList",
                    "group": group.to_string(),
                    "spots": spots,
                })
            }
            RunoffCandidates { picks } => json!({
                "type": "runoffCandidates",
                "groupA": pick_js(&picks.a),
                "groupB": pick_js(&picks.b),
            }),
            Runoff { candidates, votes } => json!({
                "type": "runoff",
                "groupA": {"candidateId": candidates.a, "votes": votes.a},
                "groupB": {"candidateId": candidates.b, "votes": votes.b},
            }),
            Combined { positions } => {
                let positions: Vec<JSValue> = positions
                    .iter()
                    .map(|p| {
                        json!({
                            "position": p.position,
                            "candidateId": p.candidate_id,
                            "fromGroup": p.from_group.to_string(),
                            "score": p.score,
                            "shift": p.shift,
                            "skippedBecauseMinPosition": p.skipped_because_min_position,
                        })
                    })
                    .collect();
                json!({"type": "combined", "positions": positions})
            }
        })
        .collect()
}

fn build_summary_js(result: &EvaluationResult, additional_count_needed: &[String]) -> JSValue {
    let body = match result {
        EvaluationResult::NeedLot {
            candidates,
            group,
            position,
            partial_list,
            preliminary_lists,
        } => {
            let maybe_list = |l: &Option<Vec<RankedEntry>>| match l {
                Some(entries) => json!(entries_js(entries)),
                None => JSValue::Null,
            };
            json!({
                "status": "need-lot",
                "candidates": candidates,
                "group": group.to_string(),
                "position": position,
                "partialList": entries_js(partial_list),
                "preliminaryLists": {
                    "a": maybe_list(&preliminary_lists.a),
                    "b": maybe_list(&preliminary_lists.b),
                },
            })
        }
        EvaluationResult::NeedRunoff {
            preliminary_lists,
            runoff_candidates,
        } => json!({
            "status": "need-runoff",
            "preliminaryLists": lists_js(preliminary_lists),
            "runoffCandidates": {
                "a": pick_js(&runoff_candidates.a),
                "b": pick_js(&runoff_candidates.b),
            },
        }),
        EvaluationResult::NeedConfirmation {
            candidate,
            position,
            partial_list,
            preliminary_lists,
            runoff_candidates,
        } => json!({
            "status": "need-confirmation",
            "candidate": candidate,
            "position": position,
            "partialList": entries_js(partial_list),
            "preliminaryLists": lists_js(preliminary_lists),
            "runoffCandidates": {
                "a": pick_js(&runoff_candidates.a),
                "b": pick_js(&runoff_candidates.b),
            },
        }),
        EvaluationResult::ListComplete {
            final_list,
            preliminary_lists,
            runoff_candidates,
            messages,
        } => json!({
            "status": "list-complete",
            "finalList": entries_js(final_list),
            "preliminaryLists": lists_js(preliminary_lists),
            "runoffCandidates": {
                "a": pick_js(&runoff_candidates.a),
                "b": pick_js(&runoff_candidates.b),
            },
            "messages": messages_js(messages),
        }),
    };
    let mut summary = body;
    summary["additionalCountNeeded"] = json!(additional_count_needed);
    summary
}

pub fn run_evaluation(
    config_path: String,
    out_path: Option<String>,
    check_summary_path: Option<String>,
) -> CliResult<()> {
    let config = read_config(config_path)?;
    info!(
        "config: {} candidates, {} submissions",
        config.candidates.len(),
        config.submissions.len()
    );

    let candidates = to_candidates(&config.candidates)?;
    let submissions = to_submissions(&config.submissions)?;
    let lots: Vec<LotDecision> = config
        .lot_decisions
        .iter()
        .map(|r| LotDecision {
            candidates: r.candidates.clone(),
            winner: r.winner.clone(),
        })
        .collect();
    let confirmations: Vec<Confirmation> = config
        .confirmations
        .iter()
        .map(|r| Confirmation {
            candidate: r.candidate.clone(),
            accepted: r.accepted,
        })
        .collect();
    let runoff_rounds: Vec<RunoffRound> = config
        .runoff_rounds
        .iter()
        .map(|r| RunoffRound {
            total: r.total,
            a: r.a,
            b: r.b,
            abstentions: r.abstentions,
        })
        .collect();

    let reconciler = BallotReconciler::new(&submissions);
    let additional = reconciler.additional_count_needed();
    if !additional.is_empty() {
        warn!(
            "{} ballot(s) still need another count: {:?}",
            additional.len(),
            additional
        );
    }
    let ballots = reconciler.merged();

    let result = match evaluate(&candidates, &ballots, &lots, &confirmations, &runoff_rounds) {
        Ok(x) => x,
        Err(x) => {
            whatever!("Evaluation error: {}", x)
        }
    };

    // Assemble the final json
    let result_js = build_summary_js(&result, &additional);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    match out_path {
        None => {}
        Some(p) if p == "stdout" => println!("{}", pretty_js_stats),
        Some(p) => {
            fs::write(p.clone(), pretty_js_stats.as_str())
                .context(WritingSummarySnafu { path: p })?;
        }
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
    {
        "candidates": [
            {"id": "anna", "firstName": "Anna", "lastName": "Andersson",
             "group": "a", "minPosition": 1},
            {"id": "carl", "firstName": "Carl", "lastName": "Carlsson",
             "title": "Dr.", "group": "b", "minPosition": 1}
        ],
        "submissions": [
            {"ballotId": "a-1", "group": "a", "created": 10, "rankings": {"anna": 8}},
            {"ballotId": "a-1", "group": "a", "created": 20, "rankings": {"anna": 8}},
            {"ballotId": "b-1", "group": "b", "created": 10, "rankings": {"carl": 6}},
            {"ballotId": "b-1", "group": "b", "created": 20, "rankings": {"carl": 6}}
        ],
        "runoffRounds": [
            {"total": 10, "a": 6, "b": 4, "abstentions": 0}
        ],
        "confirmations": [
            {"candidate": "anna", "accepted": true},
            {"candidate": "carl", "accepted": true}
        ]
    }
    "#;

    fn parsed() -> ElectionConfig {
        serde_json::from_str(CONFIG).unwrap()
    }

    #[test]
    fn config_parsing() {
        let config = parsed();
        assert_eq!(config.candidates.len(), 2);
        assert_eq!(config.candidates[1].title, Some("Dr.".to_string()));
        assert_eq!(config.submissions.len(), 4);
        assert_eq!(config.submissions[0].rankings["anna"], 8);
        assert_eq!(config.runoff_rounds.len(), 1);
        // Absent decision logs default to empty.
        assert!(config.lot_decisions.is_empty());
    }

    #[test]
    fn group_labels() {
        assert_eq!(parse_group("a").unwrap(), Group::A);
        assert_eq!(parse_group("b").unwrap(), Group::B);
        assert!(parse_group("c").is_err());
    }

    #[test]
    fn summary_of_a_complete_evaluation() {
        let config = parsed();
        let candidates = to_candidates(&config.candidates).unwrap();
        let submissions = to_submissions(&config.submissions).unwrap();
        let confirmations: Vec<Confirmation> = config
            .confirmations
            .iter()
            .map(|r| Confirmation {
                candidate: r.candidate.clone(),
                accepted: r.accepted,
            })
            .collect();
        let runoff_rounds: Vec<RunoffRound> = config
            .runoff_rounds
            .iter()
            .map(|r| RunoffRound {
                total: r.total,
                a: r.a,
                b: r.b,
                abstentions: r.abstentions,
            })
            .collect();

        let reconciler = BallotReconciler::new(&submissions);
        assert!(reconciler.validate());
        let ballots = reconciler.merged();
        let result = evaluate(&candidates, &ballots, &[], &confirmations, &runoff_rounds)
            .unwrap();
        let js = build_summary_js(&result, &[]);
        assert_eq!(js["status"], "list-complete");
        assert_eq!(js["finalList"][0]["candidateId"], "anna");
        assert_eq!(js["finalList"][1]["candidateId"], "carl");
        assert_eq!(js["additionalCountNeeded"], json!([]));
    }

    #[test]
    fn summary_reports_blocked_ballots() {
        let config = parsed();
        let candidates = to_candidates(&config.candidates).unwrap();
        let mut submissions = to_submissions(&config.submissions).unwrap();
        // A single count of a new ballot stays blocked.
        submissions.push(BallotSubmission {
            ballot_id: "a-2".to_string(),
            group: Group::A,
            created: 30,
            rankings: [("anna".to_string(), 4)].into_iter().collect(),
        });
        let reconciler = BallotReconciler::new(&submissions);
        let additional = reconciler.additional_count_needed();
        assert_eq!(additional, vec!["a-2".to_string()]);

        let ballots = reconciler.merged();
        let result = evaluate(&candidates, &ballots, &[], &[], &[]).unwrap();
        let js = build_summary_js(&result, &additional);
        assert_eq!(js["status"], "need-runoff");
        assert_eq!(js["additionalCountNeeded"], json!(["a-2"]));
    }
}
