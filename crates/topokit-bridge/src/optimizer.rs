//! External optimizer process runner.
//!
//! The optimizer is an opaque program started as
//! `program args... <input path> <output path>`. Its output is accumulated
//! verbatim and forwarded to the log and the event bus chunk by chunk; the
//! run succeeds only when the process exits with status 0.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use topokit_core::{
    AppEvent, BridgeError, EventBus, OptimizationEvent, OptimizationOutput, OptimizationRequest,
    OutputStream,
};
use topokit_settings::OptimizerSettings;
use tracing::{debug, error, info, warn};

const LOG_TARGET: &str = "topokit::optimizer";

/// How to start the optimizer
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerCommand {
    pub program: String,
    /// Leading arguments; the input and output paths are appended after them
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Kill the process when it runs longer than this
    pub timeout: Option<Duration>,
}

impl OptimizerCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            timeout: None,
        }
    }

    pub fn from_settings(settings: &OptimizerSettings) -> Self {
        Self {
            program: settings.program.clone(),
            args: settings.args.clone(),
            working_dir: settings.working_dir.clone(),
            timeout: settings.timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Run one optimization
    ///
    /// Blank paths fail with [`BridgeError::InvalidArguments`] before any
    /// process is started.
    pub async fn run(
        &self,
        request: &OptimizationRequest,
        bus: &EventBus,
    ) -> Result<OptimizationOutput, BridgeError> {
        if !request.is_valid() {
            warn!(
                "Rejected optimization request (input: {:?}, output: {:?})",
                request.input_path, request.output_path
            );
            return Err(BridgeError::InvalidArguments);
        }

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(&request.input_path)
            .arg(&request.output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| {
            error!(target: LOG_TARGET, "Failed to start {}: {}", self.program, e);
            BridgeError::SpawnFailed {
                reason: e.to_string(),
            }
        })?;
        info!(
            target: LOG_TARGET,
            "Started {} for {} -> {}", self.program, request.input_path, request.output_path
        );
        bus.publish(AppEvent::Optimization(OptimizationEvent::Started {
            input_path: request.input_path.clone(),
            output_path: request.output_path.clone(),
        }))
        .ok();

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let gathered = async {
            tokio::join!(
                pump(stdout, OutputStream::Stdout, bus),
                pump(stderr, OutputStream::Stderr, bus),
                child.wait()
            )
        };

        let (stdout, stderr, status) = match self.timeout {
            Some(limit) => {
                let outcome = tokio::time::timeout(limit, gathered).await;
                match outcome {
                    Ok(finished) => finished,
                    Err(_) => {
                        if let Err(e) = child.kill().await {
                            warn!(target: LOG_TARGET, "Failed to kill optimizer: {}", e);
                        }
                        error!(target: LOG_TARGET, "Optimizer timed out after {:?}", limit);
                        publish_finished(bus, false, None);
                        return Err(BridgeError::Timeout {
                            timeout_secs: limit.as_secs(),
                        });
                    }
                }
            }
            None => gathered.await,
        };

        let stdout = String::from_utf8_lossy(&stdout).into_owned();
        let stderr = String::from_utf8_lossy(&stderr).into_owned();

        let status = match status {
            Ok(status) => status,
            Err(e) => {
                error!(target: LOG_TARGET, "Lost track of optimizer process: {}", e);
                publish_finished(bus, false, None);
                return Err(BridgeError::ProcessFailed {
                    code: None,
                    stderr: format!("{}{}", stderr, e),
                });
            }
        };

        let code = status.code();
        let success = code == Some(0);
        publish_finished(bus, success, code);

        if success {
            info!(target: LOG_TARGET, "Optimizer finished successfully");
            Ok(OptimizationOutput { stdout })
        } else {
            error!(target: LOG_TARGET, "Optimizer exited with {:?}", code);
            Err(BridgeError::ProcessFailed { code, stderr })
        }
    }
}

fn publish_finished(bus: &EventBus, success: bool, exit_code: Option<i32>) {
    bus.publish(AppEvent::Optimization(OptimizationEvent::Finished {
        success,
        exit_code,
    }))
    .ok();
}

async fn pump<R>(reader: Option<R>, stream: OutputStream, bus: &EventBus) -> Vec<u8>
where
    R: AsyncRead + Unpin,
{
    let mut collected = Vec::new();
    let Some(mut reader) = reader else {
        return collected;
    };

    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let chunk = &buf[..n];
                collected.extend_from_slice(chunk);

                let text = String::from_utf8_lossy(chunk).into_owned();
                match stream {
                    OutputStream::Stdout => {
                        info!(target: LOG_TARGET, "Optimizer output: {}", text.trim_end())
                    }
                    OutputStream::Stderr => {
                        error!(target: LOG_TARGET, "Optimizer error: {}", text.trim_end())
                    }
                }
                bus.publish(AppEvent::Optimization(OptimizationEvent::Output { stream, text }))
                    .ok();
            }
            Err(e) => {
                debug!(target: LOG_TARGET, "Optimizer {} closed: {}", stream, e);
                break;
            }
        }
    }
    collected
}
