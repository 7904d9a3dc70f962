use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use super::error::AdminError;
use crate::config::Config;

/// Maintenance scripts that may be triggered remotely.
pub const SCRIPT_WHITELIST: [&str; 15] = [
    "sitemap:test",
    "sitemap:monitor",
    "sitemap:stop",
    "sitemap:status",
    "sitemap:clear",
    "db:init",
    "db:connect",
    "db:backup",
    "db:backup:core",
    "db:restore",
    "db:list",
    "db:clean",
    "health:check",
    "format:check",
    "lint",
];

const OUTPUT_BUFFER: usize = 64;
const READ_CHUNK: usize = 8 * 1024;

/// Runs allow-listed scripts as child processes.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    command: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl ScriptRunner {
    /// `command` is the program plus leading args; the script name is appended.
    pub fn new(command: Vec<String>, working_dir: Option<PathBuf>) -> Self {
        Self {
            command,
            working_dir,
        }
    }

    /// Uses the configured script command and directory.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.admin_script_command.clone(),
            config.admin_script_dir.clone(),
        )
    }

    /// Returns `true` if `script` is on the allow-list.
    pub fn is_allowed(script: &str) -> bool {
        SCRIPT_WHITELIST.contains(&script)
    }

    /// Spawns `script` and returns its combined output.
    ///
    /// The output ends with `--- Process finished with exit code <code> ---`. Dropping
    /// the returned [`ScriptOutput`] kills the child.
    pub fn run(&self, script: &str) -> Result<ScriptOutput, AdminError> {
        if !Self::is_allowed(script) {
            return Err(AdminError::UnknownScript {
                script: script.to_string(),
            });
        }

        let (program, args) = self.command.split_first().ok_or(AdminError::EmptyCommand)?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .arg(script)
            .env("FORCE_COLOR", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| AdminError::Spawn {
            program: program.clone(),
            source: e,
        })?;
        info!(script, pid = ?child.id(), "Admin script started");

        let (tx, rx) = mpsc::channel(OUTPUT_BUFFER);
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        tokio::spawn(supervise(script.to_string(), child, stdout, stderr, tx));

        Ok(ScriptOutput { rx })
    }
}

/// Streamed output of a running script.
#[derive(Debug)]
pub struct ScriptOutput {
    rx: mpsc::Receiver<String>,
}

impl ScriptOutput {
    /// Next chunk, or `None` once the trailer has been delivered.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Converts into a `Stream` of chunks.
    pub fn into_stream(self) -> ReceiverStream<String> {
        ReceiverStream::new(self.rx)
    }

    /// Waits for the process and returns everything it printed.
    pub async fn collect(mut self) -> String {
        let mut all = String::new();
        while let Some(chunk) = self.rx.recv().await {
            all.push_str(&chunk);
        }
        all
    }
}

/// Trailer appended after the process exits.
pub fn exit_trailer(status: Option<ExitStatus>) -> String {
    let code = status
        .and_then(|s| s.code())
        .map(|c| c.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!("\n--- Process finished with exit code {} ---\n", code)
}

async fn supervise<O, E>(
    script: String,
    mut child: Child,
    stdout: Option<O>,
    stderr: Option<E>,
    tx: mpsc::Sender<String>,
) where
    O: AsyncRead + Unpin + Send,
    E: AsyncRead + Unpin + Send,
{
    let pumps = async { tokio::join!(pump(stdout, tx.clone()), pump(stderr, tx.clone())) };

    let delivered = tokio::select! {
        (out_ok, err_ok) = pumps => out_ok && err_ok,
        _ = tx.closed() => false,
    };

    if !delivered {
        warn!(script = %script, "Output receiver dropped; killing admin script");
        if let Err(e) = child.kill().await {
            warn!(script = %script, error = %e, "Failed to kill admin script");
        }
        return;
    }

    let status = match child.wait().await {
        Ok(status) => Some(status),
        Err(e) => {
            warn!(script = %script, error = %e, "Failed waiting for admin script");
            None
        }
    };
    info!(script = %script, code = ?status.and_then(|s| s.code()), "Admin script finished");

    let _ = tx.send(exit_trailer(status)).await;
}

// Returns false once the receiver is gone.
async fn pump<R>(reader: Option<R>, tx: mpsc::Sender<String>) -> bool
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return true;
    };

    let mut buf = vec![0u8; READ_CHUNK];
    let mut pending = Vec::new();
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "Failed reading admin script output");
                0
            }
        };

        if n == 0 {
            if pending.is_empty() {
                return true;
            }
            let rest = String::from_utf8_lossy(&pending).into_owned();
            return tx.send(rest).await.is_ok();
        }

        pending.extend_from_slice(&buf[..n]);
        let chunk = take_utf8(&mut pending);
        if !chunk.is_empty() && tx.send(chunk).await.is_err() {
            return false;
        }
    }
}

/// Drains `pending` into a string, keeping back a trailing incomplete UTF-8 sequence.
pub(crate) fn take_utf8(pending: &mut Vec<u8>) -> String {
    let complete = match std::str::from_utf8(pending) {
        Ok(_) => pending.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(_) => pending.len(),
    };
    let rest = pending.split_off(complete);
    let chunk = String::from_utf8_lossy(pending).into_owned();
    *pending = rest;
    chunk
}
