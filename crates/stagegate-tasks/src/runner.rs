use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, trace};

use stagegate_core::TaskError;
use stagegate_logging::StreamType;

use crate::ProgramOutput;

/// Receives each output line as soon as the program writes it
pub type OutputCallback = Arc<dyn Fn(StreamType, &str) + Send + Sync>;

/// Spawns external tools for tasks and captures their output
#[derive(Clone, Default)]
pub struct ProgramRunner {
    timeout: Option<Duration>,
    on_line: Option<OutputCallback>,
}

impl fmt::Debug for ProgramRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramRunner")
            .field("timeout", &self.timeout)
            .field("on_line", &self.on_line.is_some())
            .finish()
    }
}

impl ProgramRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_output_callback(mut self, on_line: OutputCallback) -> Self {
        self.on_line = Some(on_line);
        self
    }

    /// Run `program` to completion in `working_dir`.
    ///
    /// A non-zero exit is not an error; callers decide what it means.
    pub async fn run(
        &self,
        program: &str,
        args: &[OsString],
        working_dir: &Path,
    ) -> Result<ProgramOutput, TaskError> {
        self.run_with_input(program, args, working_dir, None).await
    }

    /// Like [`run`](Self::run), feeding `input` to the program's stdin.
    pub async fn run_with_input(
        &self,
        program: &str,
        args: &[OsString],
        working_dir: &Path,
        input: Option<Vec<u8>>,
    ) -> Result<ProgramOutput, TaskError> {
        let spawned = self.spawn(program, args, working_dir, input);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, spawned)
                .await
                .map_err(|_| TaskError::Timeout(limit))?,
            None => spawned.await,
        }
    }

    async fn spawn(
        &self,
        program: &str,
        args: &[OsString],
        working_dir: &Path,
        input: Option<Vec<u8>>,
    ) -> Result<ProgramOutput, TaskError> {
        let start = Instant::now();

        debug!(
            program,
            args = ?args,
            working_dir = %working_dir.display(),
            "Spawning program"
        );

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| TaskError::SpawnFailed {
            program: program.to_string(),
            source,
        })?;

        let (Some(stdout_handle), Some(stderr_handle)) = (child.stdout.take(), child.stderr.take())
        else {
            return Err(TaskError::InvalidOutput(format!(
                "{} output was not captured",
                program
            )));
        };

        // Written from its own task so a program filling its output pipes
        // before draining stdin cannot deadlock us.
        if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
            let program = program.to_string();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&input).await {
                    debug!(program, error = %e, "Program closed stdin before reading all input");
                }
            });
        }

        let mut stdout_reader = BufReader::new(stdout_handle);
        let mut stderr_reader = BufReader::new(stderr_handle);
        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut stderr_open = true;

        loop {
            tokio::select! {
                biased;

                line = next_line(&mut stdout_reader, &mut stdout_buf) => {
                    match line? {
                        Some(line) => self.push_line(StreamType::Stdout, &mut stdout, line),
                        None => {
                            // stdout closed, drain stderr
                            while stderr_open {
                                match next_line(&mut stderr_reader, &mut stderr_buf).await? {
                                    Some(line) => self.push_line(StreamType::Stderr, &mut stderr, line),
                                    None => stderr_open = false,
                                }
                            }
                            break;
                        }
                    }
                }
                line = next_line(&mut stderr_reader, &mut stderr_buf), if stderr_open => {
                    match line? {
                        Some(line) => self.push_line(StreamType::Stderr, &mut stderr, line),
                        None => stderr_open = false,
                    }
                }
            }
        }

        let status = child.wait().await?;
        let duration = start.elapsed();
        let exit_code = status.code().unwrap_or(-1);

        debug!(
            program,
            exit_code,
            duration_ms = duration.as_millis(),
            "Program completed"
        );

        Ok(ProgramOutput::new(stdout, stderr, exit_code, duration))
    }

    /// Append `raw` verbatim and report it without its line terminator.
    fn push_line(&self, stream: StreamType, buffer: &mut String, raw: String) {
        let line = raw.trim_end_matches(['\n', '\r']);
        trace!(line = %line, ?stream, "output");
        if let Some(on_line) = &self.on_line {
            on_line(stream, line);
        }
        buffer.push_str(&raw);
    }
}

/// Next line including its terminator, decoded lossily.
///
/// Bytes from a read cancelled by `select!` stay in `buf` and are picked up
/// by the following call.
async fn next_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    reader.read_until(b'\n', buf).await?;
    if buf.is_empty() {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf).into_owned();
    buf.clear();
    Ok(Some(line))
}
