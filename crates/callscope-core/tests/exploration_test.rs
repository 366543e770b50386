//! End-to-end tests of the exploration loop against a scripted oracle

mod common;

use callscope_core::explore::{derive_call_chain, BLACKBOARD_FILE, EXPLANATION_FILE, RUN_LOG_FILE};
use callscope_core::{
    Action, Blackboard, BlackboardPatch, CallEdge, ExplorationConfig, Explorer, OracleError,
    PlannerOutput, RepoIndex, RunOptions, SearchEngine, StopReason, Synthesis,
};
use common::{call_chain_repo, write_tree, ScriptedOracle};
use std::sync::Arc;
use tempfile::TempDir;

fn config() -> ExplorationConfig {
    ExplorationConfig {
        oracle_max_retries: 1,
        retry_backoff_ms: 1,
        oracle_timeout_secs: 5,
        ..Default::default()
    }
}

fn explorer(
    dir: &TempDir,
    oracle: Arc<ScriptedOracle>,
    config: ExplorationConfig,
    options: RunOptions,
) -> Explorer {
    let index = Arc::new(RepoIndex::build(dir.path()).unwrap());
    let engine = Arc::new(SearchEngine::new(index));
    Explorer::new(engine, oracle, config, options)
}

fn messages(bb: &Blackboard) -> Vec<&str> {
    bb.log_entries().iter().map(|e| e.message.as_str()).collect()
}

fn synthesis(text: &str) -> Result<Synthesis, OracleError> {
    Ok(Synthesis {
        explanation: text.to_string(),
        call_chain: Vec::new(),
    })
}

#[tokio::test]
async fn test_planner_stop_in_first_round() {
    let dir = call_chain_repo();
    let oracle = Arc::new(ScriptedOracle::new(vec![Ok(PlannerOutput::stop("enough"))]));

    let out = explorer(&dir, oracle.clone(), config(), RunOptions::new("a.foo"))
        .run()
        .await;

    assert_eq!(out.stop_reason, StopReason::Planner("enough".to_string()));
    assert_eq!(out.blackboard.iterations(), 1);
    assert!(out.blackboard.evidence().contains_key("a.foo"));
    assert_eq!(out.blackboard.current_focus(), "a.foo");
    let planner_lines = messages(&out.blackboard)
        .into_iter()
        .filter(|m| m.starts_with("[planner]"))
        .count();
    assert_eq!(planner_lines, 1);
    assert_eq!(oracle.plan_calls(), 1);
    assert_eq!(oracle.synthesis_calls(), 1);
    assert!(!out.fallback);
    assert!(out.document.contains("foo returns the result of bar."));
    assert!(out.document.contains("- Stop reason: planner stop: enough"));

    // Bootstrap saw the hint inferred from the target.
    let log = messages(&out.blackboard);
    assert_eq!(log[0], "[bootstrap] target=a.foo hint_file=a.py");
}

#[tokio::test]
async fn test_unavailable_oracle_falls_back_to_evidence() {
    let dir = call_chain_repo();
    let oracle = Arc::new(ScriptedOracle::failing());

    let out = explorer(&dir, oracle.clone(), config(), RunOptions::new("a.foo"))
        .run()
        .await;

    assert_eq!(out.stop_reason, StopReason::PlannerUnavailable);
    assert!(out.fallback);
    // One attempt plus one retry for each oracle step.
    assert_eq!(oracle.plan_calls(), 2);
    assert_eq!(oracle.synthesis_calls(), 2);
    assert!(out.blackboard.evidence().contains_key("a.foo"));
    assert!(out.synthesis.explanation.contains("### a.foo (function) [a.py:L4-L5]"));
    assert!(out.document.contains("- Synthesis: fallback"));
    assert!(messages(&out.blackboard)
        .iter()
        .any(|m| m.starts_with("[planner] unavailable: oracle transport error")));
}

#[tokio::test]
async fn test_follows_calls_across_rounds() {
    let dir = call_chain_repo();
    let oracle = Arc::new(ScriptedOracle::new(vec![Ok(PlannerOutput::actions(
        vec![Action::open("bar")],
        "open the callee",
    ))]));

    let out = explorer(&dir, oracle.clone(), config(), RunOptions::new("a.foo"))
        .run()
        .await;

    assert_eq!(
        out.stop_reason,
        StopReason::Planner("script finished".to_string())
    );
    assert_eq!(out.blackboard.iterations(), 2);
    let keys: Vec<&String> = out.blackboard.evidence().keys().collect();
    assert_eq!(keys, vec!["a.foo", "b.bar"]);
    assert!(out.blackboard.unresolved().is_empty());
    assert!(out.blackboard.is_consistent());

    let requests = oracle.plan_requests.lock();
    assert_eq!(requests[0].summary["resolved_count"], 1);
    assert_eq!(requests[0].summary["frontier"][0], "bar");
    assert_eq!(requests[1].summary["resolved_count"], 2);
    assert_eq!(requests[1].round, 2);

    // `b.helper` was never opened, so only one edge is backed by evidence.
    let engine = SearchEngine::new(Arc::new(RepoIndex::build(dir.path()).unwrap()));
    assert_eq!(
        derive_call_chain(&out.blackboard, &engine),
        vec![CallEdge::new("a.foo", "b.bar")]
    );
}

#[tokio::test]
async fn test_opening_one_candidate_keeps_reference_ambiguous() {
    let dir = write_tree(&[
        ("a.py", "def normalize(x):\n    return x\n"),
        ("b.py", "def normalize(x):\n    return -x\n"),
        ("c.py", "def run(x):\n    return normalize(x)\n"),
    ]);
    let oracle = Arc::new(ScriptedOracle::new(vec![Ok(PlannerOutput::actions(
        vec![Action::open("b.normalize")],
        "look at one implementation",
    ))]));

    let out = explorer(&dir, oracle, config(), RunOptions::new("c.run"))
        .run()
        .await;

    assert!(out.blackboard.evidence().contains_key("b.normalize"));
    let entry = &out.blackboard.unresolved()["normalize"];
    assert_eq!(entry.candidates, vec!["a.normalize", "b.normalize"]);
    assert_eq!(entry.origin.as_deref(), Some("c.run"));
    assert!(out.blackboard.is_consistent());

    let engine = SearchEngine::new(Arc::new(RepoIndex::build(dir.path()).unwrap()));
    assert!(derive_call_chain(&out.blackboard, &engine).is_empty());
    assert!(out
        .document
        .contains("- `normalize`: ambiguous: 2 candidates [candidates: a.normalize, b.normalize]"));
}

#[tokio::test]
async fn test_iteration_budget_is_enforced() {
    let dir = call_chain_repo();
    let oracle = Arc::new(ScriptedOracle::new(Vec::new()).with_plan_default(|| {
        Ok(PlannerOutput::actions(
            vec![Action::FindUsages {
                needle: "helper".to_string(),
                top_k: 10,
            }],
            "keep looking",
        ))
    }));
    let config = ExplorationConfig {
        max_iters: 2,
        ..config()
    };

    let out = explorer(&dir, oracle.clone(), config, RunOptions::new("a.foo"))
        .run()
        .await;

    assert_eq!(out.stop_reason, StopReason::BudgetExhausted);
    assert_eq!(oracle.plan_calls(), 2);
    assert_eq!(out.blackboard.iterations(), 2);
    assert_eq!(out.blackboard.usages()["helper"].len(), 2);
    assert!(out.document.contains("- Stop reason: budget exhausted"));
}

#[tokio::test]
async fn test_rejected_patch_changes_nothing_but_the_log() {
    let dir = call_chain_repo();
    let patch = BlackboardPatch {
        current_focus: Some("nowhere.sym".to_string()),
        remove_unresolved: vec!["a.foo".to_string()],
        ..Default::default()
    };
    let oracle = Arc::new(ScriptedOracle::new(vec![Ok(PlannerOutput::actions(
        vec![Action::open("bar")],
        "open bar",
    )
    .with_patch(patch))]));

    let out = explorer(&dir, oracle, config(), RunOptions::new("a.foo"))
        .run()
        .await;

    assert_eq!(out.blackboard.current_focus(), "a.foo");
    assert!(messages(&out.blackboard)
        .contains(&"[patch] rejected: unknown keys nowhere.sym"));
    // Actions from the same plan still run.
    assert!(out.blackboard.evidence().contains_key("b.bar"));
}

#[tokio::test]
async fn test_valid_patch_moves_focus() {
    let dir = call_chain_repo();
    let oracle = Arc::new(ScriptedOracle::new(vec![
        Ok(PlannerOutput::actions(vec![Action::open("bar")], "open bar")),
        Ok(PlannerOutput::actions(
            vec![Action::FindUsages {
                needle: "bar".to_string(),
                top_k: 5,
            }],
            "who else calls bar",
        )
        .with_patch(BlackboardPatch {
            current_focus: Some("b.bar".to_string()),
            add_unresolved: vec!["np.array".to_string()],
            ..Default::default()
        })),
    ]));

    let out = explorer(&dir, oracle.clone(), config(), RunOptions::new("a.foo"))
        .run()
        .await;

    assert_eq!(out.blackboard.current_focus(), "b.bar");
    assert!(out.blackboard.unresolved().contains_key("np.array"));
    let requests = oracle.plan_requests.lock();
    assert_eq!(requests[2].summary["current_focus"], "b.bar");
    assert_eq!(requests[2].summary["evidence"][0]["qualified_name"], "b.bar");
}

#[tokio::test]
async fn test_cancellation_skips_synthesizer() {
    let dir = call_chain_repo();
    let token = tokio_util::sync::CancellationToken::new();
    let hook_token = token.clone();
    let oracle = Arc::new(
        ScriptedOracle::new(Vec::new())
            .with_plan_default(|| {
                Ok(PlannerOutput::actions(vec![Action::open("bar")], "open bar"))
            })
            .on_plan(move || hook_token.cancel()),
    );

    let out = explorer(&dir, oracle.clone(), config(), RunOptions::new("a.foo"))
        .with_cancellation(token)
        .run()
        .await;

    assert_eq!(out.stop_reason, StopReason::Cancelled);
    assert_eq!(oracle.plan_calls(), 1);
    assert_eq!(oracle.synthesis_calls(), 0);
    assert!(out.fallback);
    assert!(out.blackboard.evidence().contains_key("a.foo"));
    assert!(!out.blackboard.evidence().contains_key("b.bar"));
    assert!(messages(&out.blackboard).contains(&"[synthesizer] skipped after cancellation"));
}

#[tokio::test]
async fn test_hedged_explanation_is_rewritten_once() {
    let dir = call_chain_repo();
    let oracle = Arc::new(ScriptedOracle::new(vec![Ok(PlannerOutput::stop("enough"))]).with_syntheses(
        vec![
            synthesis("foo probably delegates to bar."),
            synthesis("foo delegates to bar."),
        ],
    ));

    let out = explorer(&dir, oracle.clone(), config(), RunOptions::new("a.foo"))
        .run()
        .await;

    assert_eq!(oracle.synthesis_calls(), 2);
    assert_eq!(out.synthesis.explanation, "foo delegates to bar.");
    assert!(!out.fallback);
    let requests = oracle.synthesis_requests.lock();
    assert!(requests[0].banned_words.is_empty());
    assert_eq!(requests[1].banned_words, vec!["probably"]);
    assert!(messages(&out.blackboard).contains(&"[synthesizer] rewriting to avoid: probably"));
}

#[tokio::test]
async fn test_artifacts_written_to_outdir() {
    let dir = call_chain_repo();
    let outdir = dir.path().join("_out");
    let oracle = Arc::new(ScriptedOracle::new(vec![Ok(PlannerOutput::stop("enough"))]));
    let options = RunOptions {
        outdir: Some(outdir.clone()),
        ..RunOptions::new("a.foo")
    };

    let out = explorer(&dir, oracle, config(), options).run().await;

    let artifacts = out.artifacts.as_ref().unwrap();
    assert_eq!(artifacts.blackboard, outdir.join(BLACKBOARD_FILE));
    assert_eq!(artifacts.explanation, outdir.join(EXPLANATION_FILE));

    let written = std::fs::read_to_string(&artifacts.explanation).unwrap();
    assert_eq!(written, out.document);
    assert!(written.starts_with("# a.foo\n"));

    let snapshot: Blackboard =
        serde_json::from_str(&std::fs::read_to_string(&artifacts.blackboard).unwrap()).unwrap();
    assert_eq!(snapshot.evidence(), out.blackboard.evidence());
    assert!(!outdir.join(format!("{}.tmp", BLACKBOARD_FILE)).exists());

    assert_eq!(artifacts.run_log, Some(outdir.join(RUN_LOG_FILE)));
    let run_log = std::fs::read_to_string(outdir.join(RUN_LOG_FILE)).unwrap();
    let position = |needle: &str| {
        run_log
            .find(needle)
            .unwrap_or_else(|| panic!("run.log lacks {:?}:\n{}", needle, run_log))
    };
    let ordered = [
        "] [init] target=a.foo oracle=scripted hint_file=- max_iters=3",
        "] [bootstrap] target=a.foo hint_file=a.py",
        "\"label\": \"blackboard_after_bootstrap\"",
        "\"label\": \"planner_output_round_1\"",
        "] [planner] stop=true actions=0 reason=enough",
        "\"label\": \"blackboard_after_round_1\"",
        "\"label\": \"final_blackboard\"",
        "] final_explanation:\n# a.foo",
        "] [done] run finished",
    ];
    let positions: Vec<usize> = ordered.iter().map(|n| position(n)).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{:?}", positions);
}

#[tokio::test]
async fn test_unwritable_outdir_keeps_the_result() {
    let dir = call_chain_repo();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();
    let oracle = Arc::new(ScriptedOracle::new(vec![Ok(PlannerOutput::stop("enough"))]));
    let options = RunOptions {
        outdir: Some(blocker.join("out")),
        ..RunOptions::new("a.foo")
    };

    let out = explorer(&dir, oracle, config(), options).run().await;

    assert!(out.artifacts.is_none());
    assert!(!out.fallback);
    assert_eq!(out.synthesis.explanation, "foo returns the result of bar.");
    assert!(out.document.contains("- Stop reason: planner stop: enough"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_outcomes_logged_in_action_order() {
    let dir = call_chain_repo();
    let oracle = Arc::new(ScriptedOracle::new(vec![Ok(PlannerOutput::actions(
        vec![
            Action::open("bar"),
            Action::FindUsages {
                needle: "helper".to_string(),
                top_k: 10,
            },
            Action::open("missing_fn"),
        ],
        "fan out",
    ))]));

    let out = explorer(&dir, oracle, config(), RunOptions::new("a.foo"))
        .run()
        .await;

    let round_one: Vec<&str> = out
        .blackboard
        .log_entries()
        .iter()
        .filter(|e| e.round == 1 && e.message.starts_with("[executor]"))
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(round_one.len(), 3);
    assert!(round_one[0].starts_with("[executor] OPEN_SYMBOL ok: b.bar @ b.py:1-2"));
    assert!(round_one[1].starts_with("[executor] FIND_USAGES helper: via text_search"));
    assert!(round_one[2].starts_with("[executor] OPEN_SYMBOL miss: missing_fn"));
    assert!(out.blackboard.unresolved().contains_key("missing_fn"));
}

#[tokio::test]
async fn test_round_action_limit_drops_extra_actions() {
    let dir = call_chain_repo();
    let oracle = Arc::new(ScriptedOracle::new(vec![Ok(PlannerOutput::actions(
        vec![
            Action::open("bar"),
            Action::FindUsages {
                needle: "helper".to_string(),
                top_k: 10,
            },
        ],
        "two things",
    ))]));
    let config = ExplorationConfig {
        max_actions_per_round: 1,
        ..config()
    };

    let out = explorer(&dir, oracle, config, RunOptions::new("a.foo"))
        .run()
        .await;

    assert!(messages(&out.blackboard)
        .contains(&"[loop] dropped FIND_USAGES helper: round action limit reached"));
    assert!(out.blackboard.usages().is_empty());
    assert!(out.blackboard.evidence().contains_key("b.bar"));
}

#[tokio::test]
async fn test_planning_only_known_symbols_stops() {
    let dir = call_chain_repo();
    let oracle = Arc::new(ScriptedOracle::new(vec![Ok(PlannerOutput::actions(
        vec![Action::open("a.foo"), Action::open("foo")],
        "reopen",
    ))]));

    let out = explorer(&dir, oracle.clone(), config(), RunOptions::new("a.foo"))
        .run()
        .await;

    assert_eq!(
        out.stop_reason,
        StopReason::Planner("reopen (all planned actions already resolved)".to_string())
    );
    assert_eq!(oracle.plan_calls(), 1);
}

#[tokio::test]
async fn test_unknown_target_is_recorded_unresolved() {
    let dir = call_chain_repo();
    let oracle = Arc::new(ScriptedOracle::new(vec![Ok(PlannerOutput::stop("nothing to see"))]));

    let out = explorer(&dir, oracle, config(), RunOptions::new("nope.missing"))
        .run()
        .await;

    assert!(out.blackboard.evidence().is_empty());
    assert_eq!(out.blackboard.current_focus(), "nope.missing");
    let entry = &out.blackboard.unresolved()["nope.missing"];
    assert_eq!(entry.reason, "symbol not found: nope.missing");
    assert!(out.document.contains("- `nope.missing`: symbol not found: nope.missing"));
}
