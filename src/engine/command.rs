/// One request to the statistics engine.
///
/// Every byte of R source sent over the pipe is rendered here, so the
/// command surface stays narrow and the transport detail swappable. Frame
/// and column names must already be identifier-safe (see
/// `Session::sanitize_names`); file paths, patterns, and configuration
/// labels are quoted and escaped at render time.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Scan the data rows of one vector out of a `.vec` file into the
    /// temporary `tempscan` list. `limit == 0` reads every matching row.
    ExtractRows {
        index: String,
        file: String,
        column: String,
        limit: usize,
    },
    /// Build one labeled data frame from the last extraction: a constant
    /// `run` tag, the time column, and the value column.
    BindTable {
        frame: String,
        run: String,
        column: String,
    },
    /// `dest <- src`. Starts a cumulative frame or promotes a combined one.
    Assign { dest: String, src: String },
    /// Row-append `src` onto `dest`. Union, not merge: row order follows
    /// append order, row content does not.
    RowUnion { dest: String, src: String },
    /// Add a constant `scheme` column naming the configuration variant.
    TagConfig { frame: String, config: String },
    /// Drop the named workspace objects.
    Remove { names: Vec<String> },
    /// Clear the whole workspace.
    RemoveAll,
    /// Save the workspace image to `file`.
    PersistSnapshot { file: String },
    /// Load a workspace image from `file`.
    LoadSnapshot { file: String },
    /// Reply with workspace object names matching an R regex, one line,
    /// whitespace-separated.
    ListMatchingNames { pattern: String },
    /// Reply with `make.names(...)` over the label batch, order preserved,
    /// space-separated.
    SanitizeNames { labels: Vec<String> },
    /// Sentinel round trip; the reply is an empty line.
    Sync,
    /// Terminate the engine without saving.
    Quit,
}

impl Command {
    /// R source lines for this command, in send order.
    pub fn render(&self) -> Vec<String> {
        match self {
            Command::ExtractRows {
                index,
                file,
                column,
                limit,
            } => {
                // Anchor on "index followed by a space" so vector 1 never
                // picks up rows of vector 12.
                let grep = format!("grep '^{} ' '{}'", index, file);
                vec![
                    format!(
                        "tempscan <- scan(p <- pipe({}), list(index = 0, time = 0, {} = 0), nlines = {})",
                        quote(&grep),
                        column,
                        limit
                    ),
                    "close(p)".to_string(),
                ]
            }
            Command::BindTable { frame, run, column } => vec![format!(
                "{} <- data.frame(run = {}, time = tempscan$time, {} = tempscan${})",
                frame, run, column, column
            )],
            Command::Assign { dest, src } => vec![format!("{} <- {}", dest, src)],
            Command::RowUnion { dest, src } => {
                vec![format!("{} <- rbind({}, {})", dest, dest, src)]
            }
            Command::TagConfig { frame, config } => vec![format!(
                "{} <- transform({}, scheme = {})",
                frame,
                frame,
                quote(config)
            )],
            Command::Remove { names } => vec![format!("rm({})", names.join(", "))],
            Command::RemoveAll => vec!["rm(list = ls())".to_string()],
            Command::PersistSnapshot { file } => vec![format!("save.image({})", quote(file))],
            Command::LoadSnapshot { file } => vec![format!("load({})", quote(file))],
            Command::ListMatchingNames { pattern } => {
                vec![format!("cat(ls(pat = {}), \"\\n\")", quote(pattern))]
            }
            Command::SanitizeNames { labels } => {
                let joined = labels
                    .iter()
                    .map(|l| quote(l))
                    .collect::<Vec<_>>()
                    .join(", ");
                vec![format!(
                    "cat(make.names(c({})), sep = \" \", \"\\n\")",
                    joined
                )]
            }
            Command::Sync => vec!["cat(\"\\n\")".to_string()],
            Command::Quit => vec!["q(\"no\")".to_string()],
        }
    }

    /// True when the engine answers this command with a reply line that
    /// must be drained before the next send.
    pub fn expects_reply(&self) -> bool {
        matches!(
            self,
            Command::ListMatchingNames { .. } | Command::SanitizeNames { .. } | Command::Sync
        )
    }
}

/// Render a value as a double-quoted R string literal.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}
