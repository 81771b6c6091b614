//! End-to-end tests for the library pipeline over the fixture files

use std::fs;
use std::path::PathBuf;

use pyrefine::classifier::{train, GateDecision, RiskClassifier, TrainingExample};
use pyrefine::config::RunConfig;
use pyrefine::pipeline::{analyze_source, Refactorer};
use pyrefine::RefactorError;
use tempfile::TempDir;

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e))
}

fn refactorer() -> Refactorer {
    Refactorer::new(RunConfig::default()).unwrap()
}

#[test]
fn test_fixture_issue_counts() {
    let loops = analyze_source(&fixture("sample_loop.py")).unwrap();
    assert_eq!(loops.loops.len(), 2);
    assert_eq!(loops.loops[0].line(), 3);

    let nested = analyze_source(&fixture("sample_nested_if.py")).unwrap();
    assert_eq!(nested.nested_conditionals.len(), 2);

    let chain = analyze_source(&fixture("sample_if_chain.py")).unwrap();
    assert_eq!(chain.conditional_chains.len(), 1);
    assert_eq!(
        chain.conditional_chains[0].to_string(),
        "Line 2: If-elif-else chain can be replaced with a dictionary."
    );

    assert!(analyze_source(&fixture("sample_no_issues.py")).unwrap().is_empty());
}

#[test]
fn test_clean_file_is_returned_verbatim() {
    let source = fixture("sample_no_issues.py");
    let outcome = refactorer().process(&source).unwrap();
    assert_eq!(outcome.output, source);
    assert!(outcome.candidate.is_none());
    assert!(outcome.log.records().is_empty());
}

#[test]
fn test_loop_fixture_rewrite() {
    let outcome = refactorer().process(&fixture("sample_loop.py")).unwrap();
    assert!(outcome
        .output
        .contains("    result = [v * 2 for v in values]\n"));
    assert!(outcome.output.contains("squares = [n ** 2 for n in range(10)]\n"));
    assert_eq!(outcome.log.applied(), 2);
}

#[test]
fn test_nested_if_fixture_rewrite() {
    let outcome = refactorer().process(&fixture("sample_nested_if.py")).unwrap();
    assert!(outcome.output.contains("if a > 0 and b > 0:\n"));
    assert!(outcome.output.contains("if user is not None and user.active:\n"));
}

#[test]
fn test_chain_fixture_rewrite() {
    let outcome = refactorer().process(&fixture("sample_if_chain.py")).unwrap();
    assert!(outcome.output.contains("actions = {"));
    assert!(outcome
        .output
        .contains("actions.get(command, lambda: unknown(command))()\n"));
}

#[test]
fn test_rewritten_output_has_no_remaining_issues() {
    for name in ["sample_loop.py", "sample_nested_if.py", "sample_if_chain.py"] {
        let outcome = refactorer().process(&fixture(name)).unwrap();
        assert!(!outcome.issues.is_empty(), "{}", name);
        let again = analyze_source(&outcome.output).unwrap();
        assert!(again.is_empty(), "{} still reports {:?}", name, again);
    }
}

#[test]
fn test_unsafe_chains_and_loops_left_untouched() {
    let sources = [
        // 1 and True are the same dictionary key
        "if x == 1:\n    a()\nelif x == True:\n    b()\nelif x == 2:\n    c()\n",
        "if x == 'a':\n    a()\nelif x == \"a\":\n    b()\nelif x == 'c':\n    c()\n",
        "async def run(x):\n    if x == 1:\n        await a()\n    elif x == 2:\n        await b()\n    elif x == 3:\n        await c()\n",
        "def gen(xs):\n    out = []\n    for x in xs:\n        out.append((yield x))\n    return out\n",
    ];
    for source in sources {
        let outcome = refactorer().process(source).unwrap();
        assert!(!outcome.issues.is_empty(), "{}", source);
        assert_eq!(outcome.output, source);
        assert!(!outcome.is_rewritten());
    }
}

#[test]
fn test_malformed_source_is_a_parse_error() {
    let source = "def faulty_function(:\n    pass\n";
    match analyze_source(source) {
        Err(RefactorError::Parse { line, .. }) => assert_eq!(line, 1),
        other => panic!("expected a parse error, got {:?}", other),
    }
    assert!(refactorer().process(source).is_err());
}

fn labelled_examples() -> Vec<TrainingExample> {
    let mut examples = Vec::new();
    for i in 0..8 {
        examples.push(TrainingExample {
            code_before: format!("out = []\nfor x in range({i}):\n    out.append(x)\n"),
            code_after: format!("out = []\nout = [x for x in range({i})]\n"),
            error_introduced: false,
        });
        examples.push(TrainingExample {
            code_before: "if a:\n    if b:\n        go()\n".to_string(),
            code_after: "x = 1\n".repeat(10 + i),
            error_introduced: true,
        });
    }
    examples
}

#[test]
fn test_gate_scores_candidates() {
    let dir = TempDir::new().unwrap();
    let model_path = dir.path().join("model.json");
    let (model, _) = train(&labelled_examples()).unwrap();
    model.save(&model_path).unwrap();

    let config = RunConfig {
        use_risk_filter: true,
        model_path: model_path.clone(),
        ..RunConfig::default()
    };
    let refactorer = Refactorer::new(config.clone()).unwrap();
    assert!(refactorer.gate_enabled());

    let source = fixture("sample_loop.py");
    let outcome = refactorer.process(&source).unwrap();
    let risk = outcome.risk.expect("gated run scores the candidate");
    assert!((0.0..=1.0).contains(&risk));
    let decision = outcome.decision.unwrap();
    assert_eq!(decision, config.gate().decide(risk));
    match decision {
        GateDecision::Accept => assert_eq!(Some(&outcome.output), outcome.candidate.as_ref()),
        GateDecision::Discard => assert_eq!(outcome.output, source),
    }

    // Same probability through a standalone classifier.
    let classifier = RiskClassifier::new(&model_path);
    let candidate = outcome.candidate.unwrap();
    assert_eq!(classifier.predict(&source, &candidate).unwrap(), risk);
}

#[test]
fn test_zero_threshold_gate_never_accepts_risky_rewrites() {
    let dir = TempDir::new().unwrap();
    let model_path = dir.path().join("model.json");
    let (model, _) = train(&labelled_examples()).unwrap();
    model.save(&model_path).unwrap();

    let strict = RunConfig {
        use_risk_filter: true,
        risk_threshold: 0.0,
        model_path,
        ..RunConfig::default()
    };
    let source = fixture("sample_nested_if.py");
    let outcome = Refactorer::new(strict).unwrap().process(&source).unwrap();
    if outcome.risk.unwrap() > 0.0 {
        assert_eq!(outcome.output, source);
        assert!(!outcome.is_rewritten());
    } else {
        assert!(outcome.is_rewritten());
    }
}
