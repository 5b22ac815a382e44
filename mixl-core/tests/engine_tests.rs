//! 端到端执行测试 - needs `node` and `python3`, skipped otherwise

mod common;

use mixl_core::{
    new_output_buffer, EngineError, OutputEntry, RuntimeError, UnitKind, UnitState,
};
use serde_json::json;

#[test]
fn test_variable_flows_from_python_to_javascript() {
    require_guests!();
    let tmp = tempfile::tempdir().unwrap();
    let report = common::run_in(tmp.path(), "[py]\nx = 1\n[js]\nconsole.log(x)").unwrap();
    assert_eq!(common::lines(&report), vec!["1"]);
    assert_eq!(report.execution_order.len(), 2);
}

#[test]
fn test_structured_values_cross_languages() {
    require_guests!();
    let tmp = tempfile::tempdir().unwrap();
    let source = "[py]\ncfg = {'name': 'mix', 'tags': [1, 2.5, None, True]}\n[js]\nconsole.log(cfg.name, cfg.tags.length, cfg.tags[2] === null, cfg.tags[3])\nlet back = cfg.tags.concat([false])\n[py]\nprint(back[-1], back[1])";
    let report = common::run_in(tmp.path(), source).unwrap();
    assert_eq!(common::lines(&report), vec!["mix 4 true true", "False 2.5"]);
    assert_eq!(
        report.globals.get("back").unwrap().value(),
        &json!([1, 2.5, null, true, false])
    );
}

#[test]
fn test_python_redefinition_later_value_wins() {
    require_guests!();
    let tmp = tempfile::tempdir().unwrap();
    let report = common::run_in(tmp.path(), "[py]\nx = 1\n[py]\nx = 2\n[js]\nconsole.log(x)").unwrap();
    assert_eq!(common::lines(&report), vec!["2"]);
}

#[test]
fn test_python_function_called_from_javascript() {
    require_guests!();
    let tmp = tempfile::tempdir().unwrap();
    let source = "[py]\ndef double(n):\n    return n * 2\n[js]\nlet a = 4\nlet b = double(a)\nconsole.log('b is', b)";
    let report = common::run_in(tmp.path(), source).unwrap();

    assert_eq!(common::lines(&report), vec!["b is 8"]);
    let kinds: Vec<UnitKind> = report.units.iter().map(|u| u.kind).collect();
    assert_eq!(
        kinds,
        vec![
            UnitKind::Segment,
            UnitKind::Segment,
            UnitKind::Invocation,
            UnitKind::Continuation,
            UnitKind::Segment,
        ]
    );
    assert!(report.units.iter().all(|u| u.state == UnitState::Completed));
}

#[test]
fn test_javascript_function_called_from_python() {
    require_guests!();
    let tmp = tempfile::tempdir().unwrap();
    let source = "[js]\nfunction greet(name, loud) {\n  const text = 'hi ' + name\n  return loud ? text.toUpperCase() : text\n}\n[py]\nmsg = greet('bob', True)\nprint(msg)";
    let report = common::run_in(tmp.path(), source).unwrap();
    assert_eq!(common::lines(&report), vec!["HI BOB"]);
}

#[test]
fn test_callee_helpers_travel_with_invocation() {
    require_guests!();
    let tmp = tempfile::tempdir().unwrap();
    let source = "[py]\ndef square(n):\n    return n * n\ndef sum_squares(a, b):\n    return square(a) + square(b)\n[js]\nconsole.log(sum_squares(3, 4))";
    let report = common::run_in(tmp.path(), source).unwrap();
    assert_eq!(common::lines(&report), vec!["25"]);
}

#[test]
fn test_split_segment_keeps_its_own_bindings_and_functions() {
    require_guests!();
    let tmp = tempfile::tempdir().unwrap();
    let source = "[py]\ndef inc(n):\n    return n + 1\n[js]\nfunction show(v) {\n  console.log('value', v)\n}\nlet a = 1\nlet b = inc(a)\nshow(a + b)";
    let report = common::run_in(tmp.path(), source).unwrap();
    assert_eq!(common::lines(&report), vec!["value 3"]);
    assert!(report.globals.get("b").is_some());
}

#[test]
fn test_missing_return_value_skips_continuation() {
    require_guests!();
    let tmp = tempfile::tempdir().unwrap();
    let output = new_output_buffer();
    let source = "[js]\nfunction log(x) {\n  console.log('got', x)\n}\n[py]\nlog(1)\nprint('after')";
    let report = common::run_with_output(tmp.path(), source, output.clone()).unwrap();

    assert_eq!(common::lines(&report), vec!["got 1", "after"]);
    assert!(report
        .units
        .iter()
        .all(|u| u.kind != UnitKind::Continuation));
    assert!(output
        .drain()
        .iter()
        .any(|e| matches!(e, OutputEntry::Warning(w) if w.contains("continuation skipped"))));
}

#[test]
fn test_stdout_is_streamed_in_execution_order() {
    require_guests!();
    let tmp = tempfile::tempdir().unwrap();
    let output = new_output_buffer();
    let report = common::run_with_output(
        tmp.path(),
        "[js]\nconsole.log('one')\n[py]\nprint('two')\n[js]\nconsole.log('three')",
        output.clone(),
    )
    .unwrap();

    let streamed: Vec<String> = output
        .drain()
        .into_iter()
        .filter_map(|e| match e {
            OutputEntry::Stdout { text, .. } => Some(text.trim().to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(streamed, vec!["one", "two", "three"]);
    assert_eq!(report.stdout, "one\ntwo\nthree\n");
}

#[test]
fn test_runtime_failure_keeps_scratch_files() {
    require_guests!();
    let tmp = tempfile::tempdir().unwrap();
    let err = common::run_in(tmp.path(), "[py]\nprint('before')\nraise ValueError('bad input')\n[js]\nconsole.log('never')")
        .unwrap_err();

    match err {
        EngineError::Runtime(RuntimeError::Exit { stderr, .. }) => {
            assert!(stderr.contains("ValueError: bad input"), "{}", stderr);
        }
        other => panic!("expected runtime error, got {:?}", other),
    }
    let generated = std::fs::read_dir(tmp.path()).unwrap().count();
    assert_eq!(generated, 1);
}

#[test]
fn test_identical_runs_have_identical_hashes() {
    require_guests!();
    let source = "[py]\ndef f(a):\n    return a * 10\n[js]\nlet a = 2\nlet b = f(a)\nconsole.log(b)";
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let a = common::run_in(first.path(), source).unwrap();
    let b = common::run_in(second.path(), source).unwrap();
    assert_eq!(a.execution_order, b.execution_order);
    assert_eq!(a.stdout, "20\n");
}

#[test]
fn test_function_values_survive_a_split() {
    require_guests!();
    let tmp = tempfile::tempdir().unwrap();
    let source = "[py]\ndef inc(n):\n    return n + 1\n[js]\nconst greet = (n) => 'hi ' + n\nlet r = inc(1)\nconsole.log(greet(r))";
    let report = common::run_in(tmp.path(), source).unwrap();
    assert_eq!(common::lines(&report), vec!["hi 2"]);
    assert!(report.globals.get("greet").is_none());
}

#[test]
fn test_imports_reach_every_sub_unit() {
    require_guests!();
    let tmp = tempfile::tempdir().unwrap();
    let source = "[js]\nfunction inc(n) {\n  return n + 1\n}\n[py]\nimport math\nx = inc(3)\nprint(math.sqrt(x))";
    let report = common::run_in(tmp.path(), source).unwrap();
    assert_eq!(common::lines(&report), vec!["2.0"]);
}

#[test]
fn test_big_integers_cross_units_exactly() {
    require_guests!();
    let tmp = tempfile::tempdir().unwrap();
    let report = common::run_in(tmp.path(), "[py]\nbig = 2 ** 70\n[py]\nprint(big)").unwrap();
    assert_eq!(common::lines(&report), vec!["1180591620717411303424"]);
}

#[test]
fn test_global_invalid_in_target_language_is_skipped_with_warning() {
    require_guests!();
    let tmp = tempfile::tempdir().unwrap();
    let output = new_output_buffer();
    let report = common::run_with_output(tmp.path(), "[js]\nlet $a = 1\n[py]\nprint(2)", output.clone()).unwrap();

    assert_eq!(common::lines(&report), vec!["2"]);
    assert!(report.globals.get("$a").is_some());
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("'$a'"));
    assert!(output
        .drain()
        .iter()
        .any(|e| matches!(e, OutputEntry::Warning(w) if w.contains("'$a'"))));
}
