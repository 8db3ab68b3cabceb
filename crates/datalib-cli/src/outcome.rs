use serde_json::{json, Value};

use datalib_core::{code_for, FailureKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandStatus {
    Ok,
    UserError,
    Failure,
}

impl CommandStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::UserError => 1,
            Self::Failure => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::UserError => "user-error",
            Self::Failure => "failure",
        }
    }
}

/// What a subcommand produced, independent of how it is rendered.
#[derive(Debug)]
pub struct CommandOutcome {
    pub status: CommandStatus,
    pub message: String,
    pub details: Value,
    /// Extra human-readable lines printed after the message.
    pub lines: Vec<String>,
    /// Raw bytes for stdout; replaces the human message when present.
    pub passthrough: Option<Vec<u8>>,
}

impl CommandOutcome {
    pub fn success(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Ok,
            message: message.into(),
            details,
            lines: Vec::new(),
            passthrough: None,
        }
    }

    pub fn user_error(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::UserError,
            ..Self::success(message, details)
        }
    }

    pub fn failure(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Failure,
            ..Self::success(message, details)
        }
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::user_error(
            format!("no entry named '{what}'"),
            json!({ "reason": "not_found", "name": what.to_string() }),
        )
    }

    pub fn with_lines(mut self, lines: Vec<String>) -> Self {
        self.lines = lines;
        self
    }

    pub fn with_passthrough(mut self, bytes: Vec<u8>) -> Self {
        self.passthrough = Some(bytes);
        self
    }

    /// Map a library error onto a status using its failure kind.
    pub fn from_error(err: &anyhow::Error) -> Self {
        let kind = FailureKind::of(err);
        let issues: Vec<String> = err.chain().map(ToString::to_string).collect();
        let details = json!({
            "reason": kind.as_str(),
            "code": code_for(err),
            "issues": issues,
        });
        match kind {
            FailureKind::SourceNotFound | FailureKind::Usage | FailureKind::Conflict => {
                Self::user_error(err.to_string(), details)
            }
            FailureKind::Corruption | FailureKind::StorageIo => {
                Self::failure(err.to_string(), details)
            }
        }
    }
}
