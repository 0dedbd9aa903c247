//! Roster CSV parsing.
//!
//! Strict column arity with per-row error capture: a row that fails to
//! parse is recorded as a [`RowIssue`] with its line number and the
//! remaining rows still parse. Only an unreadable header aborts the
//! whole file.

use std::io::Read;

use crate::{DirectoryError, ProfessionalRow};

/// One row the CSV reader could not turn into a [`ProfessionalRow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIssue {
    /// 1-based line in the source file, 0 when unknown.
    pub line: u64,
    /// What went wrong with the row.
    pub message: String,
}

/// Outcome of parsing a roster file: the rows that parsed and the
/// issues for those that did not.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RosterParse {
    /// Rows that parsed cleanly, in file order.
    pub rows: Vec<ProfessionalRow>,
    /// Per-row parse failures, in file order.
    pub issues: Vec<RowIssue>,
}

/// Parses a roster CSV from any reader.
///
/// Fields are trimmed; quoted fields (names with commas, multi-line
/// addresses) follow standard CSV quoting. Optional columns may be
/// empty.
///
/// # Errors
///
/// Returns [`DirectoryError::Csv`] only when the header row itself
/// cannot be read; row-level failures land in
/// [`RosterParse::issues`].
pub fn parse_roster<R: Read>(input: R) -> Result<RosterParse, DirectoryError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);
    reader.headers()?;

    let mut parsed = RosterParse::default();
    for result in reader.deserialize::<ProfessionalRow>() {
        match result {
            Ok(row) => parsed.rows.push(row),
            Err(error) => {
                let line = error.position().map_or(0, csv::Position::line);
                log::debug!("Roster line {line} rejected: {error}");
                parsed.issues.push(RowIssue {
                    line,
                    message: error.to_string(),
                });
            }
        }
    }

    log::info!(
        "Parsed roster: {} rows, {} rejected",
        parsed.rows.len(),
        parsed.issues.len()
    );
    Ok(parsed)
}
