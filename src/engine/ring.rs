use std::collections::VecDeque;

/// Bounded record of the most recent lines sent to the engine.
///
/// Inspected only on failure: when the pipe breaks there is no reply to
/// correlate an error with, so the tail of outbound traffic is the one
/// diagnostic available.
#[derive(Debug)]
pub struct RecentCommands {
    cap: usize,
    lines: VecDeque<String>,
}

impl RecentCommands {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        RecentCommands {
            cap,
            lines: VecDeque::with_capacity(cap),
        }
    }

    pub fn push(&mut self, line: &str) {
        if self.lines.len() == self.cap {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_string());
    }

    /// Most recently sent line, if any.
    pub fn last(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }

    /// Retained lines, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retains_only_the_newest_lines() {
        let mut ring = RecentCommands::new(3);
        for i in 0..5 {
            ring.push(&format!("cmd {}", i));
        }
        assert_eq!(ring.len(), 3);
        let kept: Vec<&str> = ring.iter().collect();
        assert_eq!(kept, vec!["cmd 2", "cmd 3", "cmd 4"]);
        assert_eq!(ring.last(), Some("cmd 4"));
    }

    #[test]
    fn zero_capacity_still_keeps_the_last_line() {
        let mut ring = RecentCommands::new(0);
        ring.push("only");
        assert_eq!(ring.last(), Some("only"));
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn starts_empty() {
        let ring = RecentCommands::new(8);
        assert!(ring.is_empty());
        assert_eq!(ring.last(), None);
    }
}
