//! Invocation of the external dump utility.
//!
//! The binary wire format is decoded out of process by `ipfixDump`; this
//! module only runs it and hands its textual output to the scanner. A
//! missing binary or a non-zero exit is fatal and never retried here.
//! Retrying a capture belongs to whatever produced the capture.

use crate::error::{DecodeError, Result};
use std::path::Path;
use std::process::Command;

/// Name of the external dump utility, resolved through PATH.
pub(crate) const DUMP_TOOL: &str = "ipfixDump";

/// Run the dump tool over a binary capture and return its textual output.
pub(crate) fn run_dump_tool(input: &Path) -> Result<String> {
    tracing::debug!(tool = DUMP_TOOL, input = %input.display(), "running dump tool");

    let output = Command::new(DUMP_TOOL)
        .arg("--in")
        .arg(input)
        .output()
        .map_err(|err| DecodeError::ExternalTool {
            message: format!("cannot run {DUMP_TOOL}: {err}"),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DecodeError::ExternalTool {
            message: format!("{DUMP_TOOL} exited with {}: {}", output.status, stderr.trim()),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
