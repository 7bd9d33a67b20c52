use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use tracing::debug;

use super::command::Command;
use super::ring::RecentCommands;
use super::transport::Transport;

/// How many outbound lines are retained for failure diagnostics.
const RECENT_CAP: usize = 32;

/// Blocking round-trip session with the statistics engine.
///
/// Single foreground thread of control, one pipe. `exec` sends an
/// operation's command batch and drains a sentinel reply before
/// returning; `query` sends one reply-bearing command and blocks on its
/// answer. Once a request is sent the session must wait: there is no
/// resynchronization procedure, so a broken or desynchronized pipe is
/// fatal and surfaced to the caller.
pub struct Session<T: Transport> {
    transport: T,
    recent: RecentCommands,
    echo: bool,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, echo: bool) -> Self {
        Session {
            transport,
            recent: RecentCommands::new(RECENT_CAP),
            echo,
        }
    }

    /// Every outbound line funnels through here: recorded in the recent
    /// ring, optionally echoed, then written to the pipe.
    fn send(&mut self, line: &str) -> Result<()> {
        self.recent.push(line);
        if self.echo {
            debug!("R> {}", line);
        }
        self.transport.send_line(line)
    }

    /// Send one operation's commands, then a sentinel sync so the engine
    /// has finished the batch before the caller proceeds.
    pub fn exec(&mut self, cmds: &[Command]) -> Result<()> {
        for cmd in cmds {
            debug_assert!(!cmd.expects_reply(), "reply-bearing command in exec batch");
            for line in cmd.render() {
                self.send(&line)?;
            }
        }
        self.sync()
    }

    /// Send one reply-bearing command and block on its single-line answer.
    pub fn query(&mut self, cmd: &Command) -> Result<String> {
        debug_assert!(cmd.expects_reply(), "query requires a reply-bearing command");
        for line in cmd.render() {
            self.send(&line)?;
        }
        self.transport.recv_line().context("draining engine reply")
    }

    /// Sentinel write/read pair keeping both sides of the pipe in step.
    pub fn sync(&mut self) -> Result<()> {
        let reply = self.query(&Command::Sync)?;
        if !reply.trim().is_empty() {
            bail!(
                "engine out of sync: sentinel answered with {:?}; the session cannot recover",
                reply
            );
        }
        Ok(())
    }

    /// Legalize the labels of an index → label map through the engine's
    /// own name sanitizer, re-associating sanitized names with the
    /// original indices by position.
    pub fn sanitize_names(
        &mut self,
        labels: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>> {
        if labels.is_empty() {
            return Ok(BTreeMap::new());
        }
        let batch: Vec<String> = labels.values().cloned().collect();
        let reply = self.query(&Command::SanitizeNames { labels: batch })?;
        let names: Vec<&str> = reply.split_whitespace().collect();
        if names.len() != labels.len() {
            bail!(
                "differing sized containers when assigning safe column names: \
                 {} labels in, {} names out",
                labels.len(),
                names.len()
            );
        }
        Ok(labels
            .keys()
            .cloned()
            .zip(names.into_iter().map(str::to_string))
            .collect())
    }

    /// Workspace object names matching an R regex.
    pub fn list_matching_names(&mut self, pattern: &str) -> Result<Vec<String>> {
        let reply = self.query(&Command::ListMatchingNames {
            pattern: pattern.to_string(),
        })?;
        Ok(reply.split_whitespace().map(str::to_string).collect())
    }

    /// Terminate the engine. No sentinel follows: there is nothing left
    /// to synchronize with.
    pub fn quit(&mut self) -> Result<()> {
        for line in Command::Quit.render() {
            self.send(&line)?;
        }
        Ok(())
    }

    /// Recently sent lines, for diagnostics after a pipe failure.
    pub fn recent(&self) -> &RecentCommands {
        &self.recent
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}
