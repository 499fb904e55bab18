pub mod deadline;
pub mod seed;

use std::io::Read;

use anyhow::Context;
use chrono::{DateTime, Utc};
use drainhook_core::deadline::parse_deadline;

/// Read `path`, or stdin for `-`.
pub fn read_input(path: &str) -> anyhow::Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))
}

/// `--now` if given, else the system clock.
pub fn now(over: Option<&str>) -> anyhow::Result<DateTime<Utc>> {
    match over {
        Some(s) => Ok(parse_deadline(s).context("invalid --now")?),
        None => Ok(Utc::now()),
    }
}
