use anyhow::{bail, Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Stdio};

/// Invocation of the slave R session the importer drives.
pub const R_SLAVE: &[&str] = &["R", "--slave", "--quiet", "--vanilla", "--no-readline"];

/// Line-oriented bidirectional channel to the statistics engine.
///
/// Strictly one request/reply sequence, no multiplexing and no
/// cancellation: every write that expects a reply must be drained before
/// the next write, or the two sides desynchronize for the rest of the
/// session.
pub trait Transport {
    fn send_line(&mut self, line: &str) -> Result<()>;

    /// Block until one reply line arrives; the trailing newline is
    /// stripped.
    fn recv_line(&mut self) -> Result<String>;
}

/// A spawned R child process addressed through its stdin/stdout pipes.
pub struct RProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl RProcess {
    pub fn spawn() -> Result<Self> {
        let mut child = std::process::Command::new(R_SLAVE[0])
            .args(&R_SLAVE[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawning statistics engine `{}`", R_SLAVE.join(" ")))?;
        let stdin = child
            .stdin
            .take()
            .context("engine child has no stdin pipe")?;
        let stdout = child
            .stdout
            .take()
            .map(BufReader::new)
            .context("engine child has no stdout pipe")?;
        Ok(RProcess {
            child,
            stdin,
            stdout,
        })
    }

    /// Wait for the engine to exit after a `Quit` has been sent.
    pub fn wait(self) -> Result<()> {
        let RProcess {
            mut child,
            stdin,
            stdout,
        } = self;
        drop(stdin);
        drop(stdout);
        let status = child.wait().context("waiting for engine to exit")?;
        if !status.success() {
            bail!("engine exited with {}", status);
        }
        Ok(())
    }
}

impl Transport for RProcess {
    fn send_line(&mut self, line: &str) -> Result<()> {
        self.stdin
            .write_all(line.as_bytes())
            .and_then(|_| self.stdin.write_all(b"\n"))
            .and_then(|_| self.stdin.flush())
            .context("writing to engine pipe")?;
        Ok(())
    }

    fn recv_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let n = self
            .stdout
            .read_line(&mut line)
            .context("reading from engine pipe")?;
        if n == 0 {
            bail!("engine closed the pipe");
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::VecDeque;

    /// Transport that records every sent line and plays back scripted
    /// replies. Sentinel syncs are answered automatically with an empty
    /// line; replies to name listings and sanitizations come from the
    /// scripted queue.
    pub struct ScriptedTransport {
        pub sent: Vec<String>,
        replies: VecDeque<String>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            ScriptedTransport {
                sent: Vec::new(),
                replies: VecDeque::new(),
            }
        }

        pub fn with_replies(replies: &[&str]) -> Self {
            let mut t = Self::new();
            for r in replies {
                t.push_reply(r);
            }
            t
        }

        pub fn push_reply(&mut self, reply: &str) {
            self.replies.push_back(reply.to_string());
        }

        /// All sent lines joined for substring assertions.
        pub fn transcript(&self) -> String {
            self.sent.join("\n")
        }
    }

    impl Transport for ScriptedTransport {
        fn send_line(&mut self, line: &str) -> Result<()> {
            self.sent.push(line.to_string());
            Ok(())
        }

        fn recv_line(&mut self) -> Result<String> {
            match self.sent.last().map(String::as_str) {
                Some("cat(\"\\n\")") => Ok(String::new()),
                Some(_) => self
                    .replies
                    .pop_front()
                    .context("scripted transport ran out of replies"),
                None => bail!("reply requested before any send"),
            }
        }
    }
}
