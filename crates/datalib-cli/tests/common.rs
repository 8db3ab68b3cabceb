#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::assert::Assert;
use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

pub struct Sandbox {
    pub temp: TempDir,
    pub root: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let temp = tempfile::Builder::new()
            .prefix("datalib-cli")
            .tempdir()
            .expect("tempdir");
        let root = temp.path().join("library");
        Self { temp, root }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("datalib");
        cmd.env_remove("DATALIB_STORE_PATH")
            .env_remove("DATALIB_PUT_CONFLICT")
            .env_remove("DATALIB_TIMINGS")
            .arg("--root")
            .arg(&self.root);
        cmd
    }

    pub fn write_source(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp.path().join(name);
        std::fs::write(&path, contents).expect("write source");
        path
    }

    pub fn put(&self, name: &str, source: &Path) -> Assert {
        self.cmd().arg("put").arg(name).arg(source).assert()
    }
}

pub fn parse_json(assert: &Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json")
}

pub fn stderr_of(assert: &Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stderr).into_owned()
}
