//! Interactive session over an injected line reader and writer.
//!
//! The binary wires this to stdin/stdout; tests drive it with in-memory
//! buffers.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::batch::{SearchReport, Searcher};
use crate::error::{ConfigError, SearchError};
use crate::executor::ConnectionSource;

/// Typing this ends the session.
pub const EXIT_SENTINEL: &str = "!exit";
/// Matches printed per search before the rest are summarised.
pub const DEFAULT_DISPLAY_LIMIT: usize = 50;

/// Totals for a finished session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub searches: usize,
    pub matches: usize,
}

pub struct Console<R, W> {
    reader: R,
    writer: W,
    display_limit: usize,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            display_limit: DEFAULT_DISPLAY_LIMIT,
        }
    }

    #[must_use]
    pub fn with_display_limit(mut self, display_limit: usize) -> Self {
        self.display_limit = display_limit;
        self
    }

    /// Next input line without its line terminator; `None` at end of input.
    ///
    /// # Errors
    /// Propagates read failures.
    pub async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let trimmed_len = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed_len);
        Ok(Some(line))
    }

    /// # Errors
    /// Propagates write failures.
    pub async fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    /// Ask for the database password. It is held only in memory.
    ///
    /// # Errors
    /// An empty answer or end of input is `ConfigError::Missing`.
    pub async fn prompt_password(&mut self) -> Result<String, SearchError> {
        self.write_line("Please enter the database password:").await?;
        match self.read_line().await? {
            Some(password) if !password.is_empty() => Ok(password),
            _ => Err(ConfigError::missing("password").into()),
        }
    }

    /// Print one search's outcome.
    ///
    /// # Errors
    /// Propagates write failures.
    pub async fn print_report(
        &mut self,
        raw_value: &str,
        report: &SearchReport,
    ) -> std::io::Result<()> {
        for line in render_report(raw_value, report, self.display_limit) {
            self.write_line(&line).await?;
        }
        Ok(())
    }

    /// Search each entered value until `!exit`, an empty line, or end of
    /// input.
    ///
    /// # Errors
    /// Only console I/O failures end the session early; search failures are
    /// part of each report.
    pub async fn run<S: ConnectionSource>(
        &mut self,
        searcher: &Searcher<S>,
    ) -> Result<SessionSummary, SearchError> {
        let mut summary = SessionSummary::default();
        loop {
            self.write_line(&format!(
                "Enter a value to search for ({EXIT_SENTINEL} or empty line to quit):"
            ))
            .await?;
            let Some(line) = self.read_line().await? else {
                break;
            };
            let raw_value = line.trim();
            if raw_value.is_empty() || raw_value == EXIT_SENTINEL {
                break;
            }

            let report = searcher.search(raw_value).await;
            self.print_report(raw_value, &report).await?;
            summary.searches += 1;
            summary.matches += report.matches.len();
        }
        tracing::debug!(searches = summary.searches, matches = summary.matches, "session ended");
        Ok(summary)
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

/// Lines describing `report`: at most `display_limit` matches as
/// `table:column = value`, an overflow notice, then a summary.
#[must_use]
pub fn render_report(raw_value: &str, report: &SearchReport, display_limit: usize) -> Vec<String> {
    let mut lines: Vec<String> = report
        .matches
        .iter()
        .take(display_limit)
        .map(ToString::to_string)
        .collect();

    let hidden = report.matches.len().saturating_sub(display_limit);
    if hidden > 0 {
        lines.push(format!("...and {hidden} more"));
    }

    if report.matches.is_empty() {
        lines.push(format!(
            "No matches for \"{raw_value}\" in {} table(s).",
            report.tables_searched
        ));
    } else {
        lines.push(format!(
            "Found {} match(es) for \"{raw_value}\" in {} table(s).",
            report.matches.len(),
            report.tables_searched
        ));
    }

    if !report.failures.is_empty() {
        let names: Vec<&str> = report
            .failures
            .iter()
            .map(|f| f.table_name.as_str())
            .collect();
        lines.push(format!(
            "{} table(s) could not be searched: {}",
            names.len(),
            names.join(", ")
        ));
    }
    lines
}
