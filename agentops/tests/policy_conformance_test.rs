//! MemRL policy conformance — the literal contract scenarios.

use agentops::config::MemrlMode;
use agentops::policy::{
    bucket, default_contract, evaluate, AttemptBucket, PolicyAction, PolicyInput, PolicyRule,
    WILDCARD,
};

// ── S4: enforce × vibe_fail × final ──────────────────────────────────

#[test]
fn conformance_enforce_vibe_fail_final_escalates() {
    let contract = default_contract();
    contract.validate().unwrap();

    let input = PolicyInput::from_attempts(MemrlMode::Enforce, "vibe_fail", 3, 3);
    assert_eq!(bucket(3, 3), AttemptBucket::Final);

    let decision = evaluate(&contract, &input);
    assert_eq!(decision.action, PolicyAction::Escalate);
    assert_eq!(decision.rule_id, "enforce.vibe_fail.final");
}

// ── S5: wildcard tie-break by lexical rule id ────────────────────────

#[test]
fn conformance_tie_break_prefers_rule_a() {
    let mut contract = default_contract();
    contract.rules = vec![
        PolicyRule {
            rule_id: "a".to_string(),
            mode: MemrlMode::Enforce,
            failure_class: WILDCARD.to_string(),
            attempt_bucket: WILDCARD.to_string(),
            action: PolicyAction::Escalate,
            priority: 7,
        },
        PolicyRule {
            rule_id: "z".to_string(),
            mode: MemrlMode::Enforce,
            failure_class: WILDCARD.to_string(),
            attempt_bucket: WILDCARD.to_string(),
            action: PolicyAction::Retry,
            priority: 7,
        },
    ];
    contract.validate().unwrap();

    let input = PolicyInput::new(MemrlMode::Enforce, "vibe_fail", AttemptBucket::Middle);
    let decision = evaluate(&contract, &input);
    assert_eq!(decision.rule_id, "a");
    assert_eq!(decision.action, PolicyAction::Escalate);
}

// ── Determinism over repeats, all modes ──────────────────────────────

#[test]
fn conformance_repeated_evaluation_is_identical() {
    let contract = default_contract();
    for mode in [MemrlMode::Off, MemrlMode::Observe, MemrlMode::Enforce] {
        for class in ["pre_mortem_fail", "crank_partial", "phase_stall"] {
            for (attempt, max) in [(1, 4), (2, 4), (4, 4), (9, 4)] {
                let input = PolicyInput::from_attempts(mode, class, attempt, max);
                let first = evaluate(&contract, &input);
                for _ in 0..25 {
                    assert_eq!(evaluate(&contract, &input), first);
                }
            }
        }
    }
}

// ── Retry early, escalate late, across every class ───────────────────

#[test]
fn conformance_bucket_policy_shape() {
    let contract = default_contract();
    for class in [
        "pre_mortem_fail",
        "crank_partial",
        "vibe_fail",
        "phase_timeout",
        "phase_stall",
        "phase_exit_error",
    ] {
        let early = evaluate(
            &contract,
            &PolicyInput::from_attempts(MemrlMode::Observe, class, 1, 3),
        );
        assert_eq!(early.action, PolicyAction::Retry, "{class} initial");

        let last = evaluate(
            &contract,
            &PolicyInput::from_attempts(MemrlMode::Observe, class, 3, 3),
        );
        assert_eq!(last.action, PolicyAction::Escalate, "{class} final");

        let over = evaluate(
            &contract,
            &PolicyInput::from_attempts(MemrlMode::Observe, class, 5, 3),
        );
        assert_eq!(over.action, PolicyAction::Escalate, "{class} overflow");
    }
}

#[test]
fn conformance_crank_blocked_is_special_under_enforce() {
    let contract = default_contract();
    let enforce_initial = evaluate(
        &contract,
        &PolicyInput::from_attempts(MemrlMode::Enforce, "crank_blocked", 1, 3),
    );
    assert_eq!(enforce_initial.action, PolicyAction::Escalate);

    let observe_initial = evaluate(
        &contract,
        &PolicyInput::from_attempts(MemrlMode::Observe, "crank_blocked", 1, 3),
    );
    assert_eq!(observe_initial.action, PolicyAction::Retry);
}

// ── Degenerate inputs ────────────────────────────────────────────────

#[test]
fn conformance_default_actions() {
    let contract = default_contract();

    let missing = evaluate(
        &contract,
        &PolicyInput::new(MemrlMode::Enforce, "vibe_fail", AttemptBucket::Middle)
            .without_metadata(),
    );
    assert_eq!(missing.rule_id, "default.missing_metadata");
    assert_eq!(missing.reason, "missing_metadata");

    let unknown = evaluate(
        &contract,
        &PolicyInput::new(MemrlMode::Enforce, "gremlins", AttemptBucket::Middle),
    );
    assert_eq!(unknown.rule_id, "default.unknown_failure_class");
    assert_eq!(unknown.reason, "unknown_failure_class");
}
