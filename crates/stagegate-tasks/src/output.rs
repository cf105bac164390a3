use std::time::Duration;

/// Output captured from a finished program
#[derive(Debug, Clone)]
pub struct ProgramOutput {
    /// Everything written to stdout, line terminators included
    pub stdout: String,
    /// Everything written to stderr, line terminators included
    pub stderr: String,
    /// Exit code, -1 when killed by a signal
    pub exit_code: i32,
    pub duration: Duration,
}

impl ProgramOutput {
    pub fn new(stdout: String, stderr: String, exit_code: i32, duration: Duration) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
            duration,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Every captured line, stdout first
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines().chain(self.stderr.lines())
    }
}
