mod common;

use std::path::Path;
use std::process::Output;

use common::lowerc;

const UNIT: &str = r#"{
    "expressions": [
        {"name": "answer", "expr": {"kind": {"Natural": "42"}, "ty": {"Class": {"decl": "Integer"}}}},
        {"name": "raw", "boxing": "Unboxed",
         "expr": {"kind": {"Natural": "7"}, "ty": {"Class": {"decl": "Integer"}}}}
    ]
}"#;

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ===== lower =====

#[test]
fn test_lower_prints_each_expression() {
    let dir = tempfile::tempdir().unwrap();
    let unit = write(dir.path(), "unit.json", UNIT);
    let output = lowerc().arg("lower").arg(&unit).output().unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("answer = ceylon.language.Integer.instance(42L)"), "{out}");
    assert!(out.contains("raw = 7L"), "{out}");
}

#[test]
fn test_lower_reports_diagnostics_and_fails() {
    let dir = tempfile::tempdir().unwrap();
    let json = r#"{"source": "99999999999999999999",
        "expressions": [{"name": "big",
            "expr": {"kind": {"Natural": "99999999999999999999"}, "ty": {"Class": {"decl": "Integer"}},
                     "span": {"start": 0, "end": 20, "file_id": 0}}}]}"#;
    let unit = write(dir.path(), "big.json", json);
    let output = lowerc().arg("lower").arg(&unit).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).starts_with("big = <error: "), "{}", stdout(&output));
    let err = stderr(&output);
    assert!(err.contains("literal outside representable range"), "{err}");
    assert!(err.contains("1 expression(s) could not be lowered"), "{err}");
}

#[test]
fn test_statement_expressions_end_with_semicolon() {
    let dir = tempfile::tempdir().unwrap();
    let json = r#"{"expressions": [{"name": "s", "statement": true, "expr": {
        "kind": {"Invocation": {
            "primary": {"kind": {"BaseMember": {"decl": "print"}}, "ty": {"Class": {"decl": "Anything"}}},
            "args": {"Positional": [{"Plain": {"kind": {"Str": "hi"}, "ty": {"Class": {"decl": "String"}}}}]}}},
        "ty": {"Class": {"decl": "Anything"}}}}]}"#;
    let unit = write(dir.path(), "stmt.json", json);
    let output = lowerc().arg("lower").arg(&unit).output().unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert_eq!(out.trim_end(), "s = ceylon.language.print_.print(ceylon.language.String.instance(\"hi\"));");
}

#[test]
fn test_malformed_unit_fails() {
    let dir = tempfile::tempdir().unwrap();
    let unit = write(dir.path(), "bad.json", "{\"expressions\": 3}");
    let output = lowerc().arg("lower").arg(&unit).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("invalid lowering unit"), "{}", stderr(&output));
}

#[test]
fn test_missing_unit_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = lowerc().arg("lower").arg(dir.path().join("nope.json")).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("could not read"), "{}", stderr(&output));
}

// ===== options =====

#[test]
fn test_options_prints_defaults() {
    let output = lowerc().arg("options").output().unwrap();
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("optimise_operators = true"), "{out}");
    assert!(out.contains("max_inline_power = 64"), "{out}");
}

#[test]
fn test_config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = write(dir.path(), "lower.toml", "optimise_operators = false\nmax_inline_power = 8\n");
    let output = lowerc().arg("--config").arg(&config).arg("options").output().unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("optimise_operators = false"), "{out}");
    assert!(out.contains("max_inline_power = 8"), "{out}");
}

#[test]
fn test_unknown_config_key_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = write(dir.path(), "lower.toml", "optimize_everything = true\n");
    let output = lowerc().arg("--config").arg(&config).arg("options").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("invalid lowering options"), "{}", stderr(&output));
}

#[test]
fn test_config_changes_lowering() {
    let dir = tempfile::tempdir().unwrap();
    let json = r#"{"expressions": [{"name": "sum", "expr": {"kind": {"Binary": {"op": "Add",
        "left": {"kind": {"Natural": "3"}, "ty": {"Class": {"decl": "Integer"}}},
        "right": {"kind": {"Natural": "4"}, "ty": {"Class": {"decl": "Integer"}}}}},
        "ty": {"Class": {"decl": "Integer"}}}}]}"#;
    let unit = write(dir.path(), "sum.json", json);
    let output = lowerc().arg("lower").arg(&unit).output().unwrap();
    assert!(stdout(&output).contains("sum = ceylon.language.Integer.instance(3L + 4L)"), "{}", stdout(&output));

    let config = write(dir.path(), "lower.toml", "optimise_operators = false\n");
    let output = lowerc().arg("--config").arg(&config).arg("lower").arg(&unit).output().unwrap();
    assert!(stdout(&output).contains(".plus("), "{}", stdout(&output));
}
