use std::fs;

mod common;

use common::{parse_json, stderr_of, Sandbox};

#[test]
fn put_then_get_streams_raw_bytes() {
    let sandbox = Sandbox::new();
    let source = sandbox.write_source("greeting.txt", b"hello");
    sandbox.put("a.txt", &source).success();

    sandbox
        .cmd()
        .args(["get", "a.txt"])
        .assert()
        .success()
        .stdout("hello");
}

#[test]
fn shared_content_reports_dedup_and_references() {
    let sandbox = Sandbox::new();
    let source = sandbox.write_source("greeting.txt", b"hello");
    sandbox.put("a.txt", &source).success();

    let assert = sandbox
        .cmd()
        .args(["--json", "put", "b.txt"])
        .arg(&source)
        .assert()
        .success();
    let payload = parse_json(&assert);
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["details"]["put"]["outcome"], "inserted");
    assert_eq!(payload["details"]["put"]["deduplicated"], true);
    let hash = payload["details"]["put"]["hash"]
        .as_str()
        .expect("hash")
        .to_string();

    let assert = sandbox
        .cmd()
        .args(["--json", "refs", hash.as_str()])
        .assert()
        .success();
    let payload = parse_json(&assert);
    assert_eq!(
        payload["details"]["names"],
        serde_json::json!(["a.txt", "b.txt"])
    );

    let assert = sandbox.cmd().args(["--json", "stats"]).assert().success();
    let stats = &parse_json(&assert)["details"]["stats"];
    assert_eq!(stats["names"], 2);
    assert_eq!(stats["blobs"], 1);
}

#[test]
fn delete_reclaims_content_with_last_name() {
    let sandbox = Sandbox::new();
    let source = sandbox.write_source("data.bin", b"\x00\x01\x02");
    sandbox.put("only", &source).success();

    let assert = sandbox
        .cmd()
        .args(["--json", "delete", "only"])
        .assert()
        .success();
    let payload = parse_json(&assert);
    assert_eq!(payload["details"]["removal"]["reclaimed"], true);

    sandbox.cmd().args(["get", "only"]).assert().code(1);
    let assert = sandbox
        .cmd()
        .args(["--json", "delete", "only"])
        .assert()
        .success();
    assert!(parse_json(&assert)["details"]["removal"].is_null());
}

#[test]
fn missing_source_is_a_user_error_with_code() {
    let sandbox = Sandbox::new();
    let missing = sandbox.temp.path().join("nope.txt");
    let assert = sandbox.put("ghost", &missing).code(1);
    assert!(stderr_of(&assert).contains("DL801"));
}

#[test]
fn info_reports_access_after_get() {
    let sandbox = Sandbox::new();
    let source = sandbox.write_source("notes.md", b"# notes");
    sandbox.put("notes.md", &source).success();

    let assert = sandbox
        .cmd()
        .args(["--json", "info", "notes.md"])
        .assert()
        .success();
    let before = parse_json(&assert);
    assert_eq!(before["details"]["size"], 7);
    assert!(before["details"]["accessed_at"].is_null());

    sandbox.cmd().args(["get", "notes.md"]).assert().success();
    let assert = sandbox
        .cmd()
        .args(["--json", "info", "notes.md"])
        .assert()
        .success();
    let after = parse_json(&assert);
    assert!(after["details"]["accessed_at"].is_string());
}

#[test]
fn get_can_write_to_a_file() {
    let sandbox = Sandbox::new();
    let source = sandbox.write_source("in.txt", b"copy me");
    sandbox.put("doc", &source).success();

    let out = sandbox.temp.path().join("out.txt");
    sandbox
        .cmd()
        .args(["get", "doc", "-o"])
        .arg(&out)
        .assert()
        .success();
    assert_eq!(fs::read(&out).expect("read output"), b"copy me");
}

#[test]
fn list_filters_by_prefix() {
    let sandbox = Sandbox::new();
    let source = sandbox.write_source("x", b"x");
    for name in ["logs/2", "logs/1", "data/1"] {
        sandbox.put(name, &source).success();
    }
    let assert = sandbox
        .cmd()
        .args(["--json", "list", "--prefix", "logs/"])
        .assert()
        .success();
    let names: Vec<String> = parse_json(&assert)["details"]["entries"]
        .as_array()
        .expect("entries")
        .iter()
        .map(|entry| entry["name"].as_str().expect("name").to_string())
        .collect();
    assert_eq!(names, ["logs/1", "logs/2"]);
}

#[test]
fn verify_flags_missing_content_and_doctor_repairs_it() {
    let sandbox = Sandbox::new();
    let source = sandbox.write_source("v.txt", b"hello");
    sandbox.put("v.txt", &source).success();
    sandbox.cmd().arg("verify").assert().success();

    let blob = sandbox
        .root
        .join("2")
        .join("c")
        .join("f")
        .join("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824.dat");
    fs::remove_file(&blob).expect("remove blob");

    sandbox.cmd().args(["get", "v.txt"]).assert().code(2);
    sandbox.cmd().arg("verify").assert().code(2);

    let assert = sandbox
        .cmd()
        .args(["--json", "doctor"])
        .assert()
        .success();
    let payload = parse_json(&assert);
    assert_eq!(
        payload["details"]["summary"]["names_pruned"],
        serde_json::json!(["v.txt"])
    );
    sandbox.cmd().arg("verify").assert().success();
}

#[test]
fn reject_policy_from_environment() {
    let sandbox = Sandbox::new();
    let first = sandbox.write_source("one", b"one");
    let second = sandbox.write_source("two", b"two");
    sandbox.put("cfg", &first).success();

    let assert = sandbox
        .cmd()
        .env("DATALIB_PUT_CONFLICT", "reject")
        .args(["put", "cfg"])
        .arg(&second)
        .assert()
        .code(1);
    assert!(stderr_of(&assert).contains("DL803"));

    let assert = sandbox
        .cmd()
        .args(["--json", "put", "cfg"])
        .arg(&second)
        .assert()
        .success();
    assert_eq!(
        parse_json(&assert)["details"]["put"]["outcome"],
        "kept-existing"
    );
}

