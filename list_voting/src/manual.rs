/*!

This is the long-form manual for `list_voting` and `listvote`.

## The election model

An election ranks candidates from two disjoint groups (`a` and `b`)
into one combined list. Voters score each candidate on a ballot with 0
to 10 points; 0 is an explicit null vote, a missing score is an
abstention. The tabulation runs in stages:

1. **Reconciliation** Every physical ballot is counted at least twice.
   Two matching counts make the ballot canonical. Two differing counts
   block the ballot until a third count arrives; from the third count
   on, the most recent count supersedes everything before it.
2. **Quorum screening** A candidate is dropped when the ballots scoring
   them 0 are at least as many as the ballots scoring them above 0.
3. **Preliminary lists** Each group is ranked separately by average
   score (abstentions excluded from the average). When the two best
   remaining candidates are tied on average, a direct head-to-head
   comparison over the ballots scoring both decides the position; the
   passed-over candidate is recorded with a shift of -1 per lost
   comparison. Ties that survive the comparison run a point-count
   cascade: from 10 points down to 1, only the candidates with the most
   ballots at that exact score stay in.
4. **Lots** A tie that survives the cascade is decided by a manual
   draw. The evaluation pauses, reports the tied candidates and resumes
   once the draw is appended to the decision log.
5. **Runoff** The first *eligible* candidate of each preliminary list
   (respecting each candidate's minimum position) stands in a runoff
   vote between the groups. The winning group leads the combined list.
   Only the latest runoff round is authoritative; a tied round pauses
   the evaluation for another round.
6. **Merge** The combined list alternates between the two preliminary
   lists, starting with the runoff winner. A candidate whose minimum
   position is not reached yet is passed over; if a group has nobody to
   offer for its turn, the other list fills in without the turn
   advancing. Every placement requires the candidate's confirmation;
   the evaluation pauses on the first candidate without one. A
   candidate who declined is left off the list entirely.

All pauses are ordinary return values. Re-running the evaluation with
one more decision in the log always advances past the pause point or
completes; it never regresses.

## Input format

`listvote` reads a single JSON document:

```text
{
  "candidates": [
    { "id": "anna", "firstName": "Anna", "lastName": "Andersson",
      "title": "Dr.", "group": "a", "minPosition": 1 }
  ],
  "submissions": [
    { "ballotId": "a-001", "group": "a", "created": 1724659200,
      "rankings": { "anna": 8, "berta": 0 } }
  ],
  "lotDecisions": [
    { "candidates": ["anna", "berta"], "winner": "anna" }
  ],
  "confirmations": [
    { "candidate": "anna", "accepted": true }
  ],
  "runoffRounds": [
    { "total": 120, "a": 64, "b": 52, "abstentions": 4 }
  ]
}
```

Notes:
- `title` and `extra` on a candidate are optional.
- `group` is the string `"a"` or `"b"`.
- `rankings` maps candidate ids to integer scores between 0 and 10.
- The three decision arrays are append-only logs and may be empty or
  absent. For `confirmations` and `runoffRounds` the latest entry
  wins.

## Output

The summary written with `--out` mirrors the evaluation outcome: a
`status` of `need-lot`, `need-runoff`, `need-confirmation` or
`list-complete`, the context of the pause (tied candidates, runoff
standings or the candidate awaiting confirmation), the preliminary
lists computed so far and, on completion, the combined list with the
full decision trace. Ballots still blocked on another count are listed
under `additionalCountNeeded`.

The `--reference` flag compares the generated summary against a
previously saved one and prints a diff, which is handy for regression
checks of a tabulation pipeline.

 */
