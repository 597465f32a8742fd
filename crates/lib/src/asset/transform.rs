//! External tool invocation.
//!
//! Format compilers are blocking subprocesses run from the config directory
//! with the config's environment overlay. There is no timeout.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum TransformError {
  #[error("couldn't run {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("{program} failed ({status})\n{stderr}")]
  Failed {
    program: String,
    status: String,
    stderr: String,
  },

  #[error("couldn't prepare input for {program}: {source}")]
  Scratch {
    program: String,
    #[source]
    source: io::Error,
  },
}

/// Captured output of a piped invocation.
#[derive(Debug, Default)]
pub struct ToolOutput {
  pub stdout: Vec<u8>,
  pub stderr: Vec<u8>,
}

/// Spawns external tools with a fixed working directory and env overlay.
#[derive(Debug, Clone)]
pub struct ToolRunner {
  env: BTreeMap<String, String>,
  cwd: PathBuf,
}

impl ToolRunner {
  pub fn new(env: BTreeMap<String, String>, cwd: PathBuf) -> Self {
    Self { env, cwd }
  }

  /// Runs `program` to completion and returns its stdout.
  pub fn run<I, S>(&self, program: &str, args: I) -> Result<Vec<u8>, TransformError>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
  {
    let mut command = self.command(program, args);
    command.stdin(Stdio::null());

    let output = command.output().map_err(|source| TransformError::Spawn {
      program: program.to_string(),
      source,
    })?;
    let output = check(program, output)?;

    if !output.stderr.is_empty() {
      warn!(program, stderr = %String::from_utf8_lossy(&output.stderr).trim_end(), "tool wrote to stderr");
    }
    Ok(output.stdout)
  }

  /// Runs `program` with `input` on stdin, capturing both output streams.
  ///
  /// Input is staged through an anonymous temp file so large payloads can't
  /// deadlock against a full stdout pipe.
  pub fn pipe<I, S>(&self, program: &str, args: I, input: &[u8]) -> Result<ToolOutput, TransformError>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
  {
    let scratch = |source| TransformError::Scratch {
      program: program.to_string(),
      source,
    };

    let mut stdin = tempfile::tempfile().map_err(scratch)?;
    stdin.write_all(input).map_err(scratch)?;
    stdin.seek(SeekFrom::Start(0)).map_err(scratch)?;

    let mut command = self.command(program, args);
    command.stdin(Stdio::from(stdin));

    let output = command.output().map_err(|source| TransformError::Spawn {
      program: program.to_string(),
      source,
    })?;
    let output = check(program, output)?;

    Ok(ToolOutput {
      stdout: output.stdout,
      stderr: output.stderr,
    })
  }

  fn command<I, S>(&self, program: &str, args: I) -> Command
  where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
  {
    let mut command = Command::new(program);
    command.args(args).current_dir(&self.cwd).envs(&self.env);
    debug!(program, cwd = %self.cwd.display(), "spawning tool");
    command
  }
}

fn check(program: &str, output: Output) -> Result<Output, TransformError> {
  if output.status.success() {
    return Ok(output);
  }
  Err(TransformError::Failed {
    program: program.to_string(),
    status: output.status.to_string(),
    stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
  })
}
