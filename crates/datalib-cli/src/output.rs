use std::io::{self, Write};

use color_eyre::Result;
use serde_json::json;

use crate::outcome::{CommandOutcome, CommandStatus};

#[derive(Clone, Copy, Debug)]
pub struct OutputOptions {
    pub quiet: bool,
    pub json: bool,
}

/// Render `outcome` and return the process exit code.
pub fn emit_output(opts: &OutputOptions, command: &str, outcome: &CommandOutcome) -> Result<i32> {
    let code = outcome.status.exit_code();

    if opts.json {
        let payload = json!({
            "command": command,
            "status": outcome.status.as_str(),
            "message": outcome.message,
            "details": outcome.details,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(code);
    }

    if outcome.status == CommandStatus::Ok {
        if let Some(bytes) = &outcome.passthrough {
            let mut stdout = io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
        } else if !opts.quiet {
            println!("{}", outcome.message);
            for line in &outcome.lines {
                println!("  {line}");
            }
        }
    } else {
        let label = outcome
            .details
            .get("code")
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| "error".to_string(), |code| format!("error[{code}]"));
        eprintln!("{label}: {}", outcome.message);
        for line in &outcome.lines {
            eprintln!("  {line}");
        }
    }

    Ok(code)
}
