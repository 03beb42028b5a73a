use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_gradesd");
    let mut child = Command::new(exe)
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
fn single_and_batched_conversion() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let single = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "words.toArabic",
        json!({ "value": 21 }),
    );
    assert_eq!(single["words"], json!("واحد و عشرون"));

    let batch = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "words.toArabic",
        json!({ "values": [0, 15, 47, 100, 101, -3, 12.5, null] }),
    );
    assert_eq!(
        batch["words"],
        json!(["صفر", "خمسة عشر", "سبعة و اربعون", "مئة", "", "", "", ""])
    );

    let missing = request_ok(&mut stdin, &mut reader, "3", "words.toArabic", json!({}));
    assert_eq!(missing["words"], json!(""));

    let bad = send(
        &mut stdin,
        &mut reader,
        "4",
        "words.toArabic",
        json!({ "values": 7 }),
    );
    assert_eq!(bad["ok"], json!(false));
    assert_eq!(bad["error"]["code"], json!("bad_params"));

    drop(stdin);
    let _ = child.wait();
}
