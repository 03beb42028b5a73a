use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar_with_env(
    vars: &[(&str, &str)],
) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_gradesd");
    let mut child = Command::new(exe)
        .envs(vars.iter().copied())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradesd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn send(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = send(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

#[test]
fn env_overrides_default_settings_and_stage_lists() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar_with_env(&[
        ("GRADESD_DECISION_POINTS", "10"),
        ("GRADESD_SUPPLEMENTARY_SUBJECTS", "0"),
        ("GRADESD_MINISTERIAL_STAGES", "Grade 9,Grade 12"),
    ]);

    let cfg = request_ok(&mut stdin, &mut reader, "1", "config.get", json!({}));
    assert_eq!(cfg["defaultSettings"]["decisionPoints"], json!(10));
    assert_eq!(cfg["defaultSettings"]["supplementarySubjectsCount"], json!(0));
    assert_eq!(
        cfg["stageRules"]["ministerialStages"],
        json!(["Grade 9", "Grade 12"])
    );

    let stage = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "stages.classify",
        json!({ "stage": "Grade 12" }),
    );
    assert_eq!(stage["category"], json!("ministerial"));

    // Shortfall of 10 fits the configured pool when no settings are sent.
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "grades.evaluate",
        json!({
            "student": { "grades": { "math": {
                "firstTerm": 60, "midYear": 80, "secondTerm": 70, "finalExam1st": 10
            }}},
            "subjects": ["math"],
            "classPolicy": { "stage": "Grade 7" }
        }),
    );
    assert_eq!(result["perSubject"]["math"]["decisionApplied"], json!(10));
    assert_eq!(result["perSubject"]["math"]["finalGradeWithDecision"], json!(50));
    assert_eq!(result["result"]["status"], json!("pass"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn invalid_env_value_stops_startup() {
    let exe = env!("CARGO_BIN_EXE_gradesd");
    let status = Command::new(exe)
        .env("GRADESD_DECISION_POINTS", "many")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("run gradesd");
    assert!(!status.success());
}
