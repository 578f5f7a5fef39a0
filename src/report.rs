// src/report.rs
//! Report rows and CSV output for batch runs.
//!
//! Each row is one service. Three outcomes stay visibly distinct in the
//! `actual` column: a grade letter, `ERROR` (fetch failed), or `TIMEOUT`
//! (scoring deadline exceeded). Non-graded rows leave `score` empty so they
//! can never be read as a low score.

use crate::deadline::ScoringTimeout;
use crate::grade::Grade;
use crate::scorer::ScoreResult;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;

pub const REPORT_HEADER: &str = "name,expected,actual,score,match,word_count,positives,negatives,error";
pub const LABEL_SEPARATOR: &str = "; ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Graded(ScoreResult),
    FetchFailed(String),
    TimedOut(ScoringTimeout),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub name: String,
    pub expected: Option<Grade>,
    pub word_count: usize,
    pub outcome: Outcome,
}

impl ReportRow {
    pub fn new(
        name: impl Into<String>,
        expected: Option<Grade>,
        word_count: usize,
        outcome: Outcome,
    ) -> Self {
        Self {
            name: name.into(),
            expected,
            word_count,
            outcome,
        }
    }

    pub fn result(&self) -> Option<&ScoreResult> {
        match &self.outcome {
            Outcome::Graded(r) => Some(r),
            _ => None,
        }
    }

    pub fn actual(&self) -> &str {
        match &self.outcome {
            Outcome::Graded(r) => r.grade.as_str(),
            Outcome::FetchFailed(_) => "ERROR",
            Outcome::TimedOut(_) => "TIMEOUT",
        }
    }

    pub fn is_match(&self) -> bool {
        matches!((self.expected, self.result()), (Some(e), Some(r)) if e == r.grade)
    }

    pub fn error(&self) -> String {
        match &self.outcome {
            Outcome::Graded(_) => String::new(),
            Outcome::FetchFailed(msg) => msg.clone(),
            Outcome::TimedOut(t) => t.to_string(),
        }
    }

    fn record(&self) -> CsvRecord {
        let (score, positives, negatives) = match self.result() {
            Some(r) => (
                Some(r.score),
                r.positive_labels.join(LABEL_SEPARATOR),
                r.negative_labels.join(LABEL_SEPARATOR),
            ),
            None => (None, String::new(), String::new()),
        };
        CsvRecord {
            name: quoted(&self.name),
            expected: quoted(self.expected.map(Grade::as_str).unwrap_or_default()),
            actual: quoted(self.actual()),
            score,
            matched: quoted(if self.is_match() { "YES" } else { "NO" }),
            word_count: self.word_count,
            positives: quoted(&positives),
            negatives: quoted(&negatives),
            error: quoted(&self.error()),
        }
    }
}

/// Text columns arrive pre-quoted so a name like `1337` stays a string field.
#[derive(Serialize)]
struct CsvRecord {
    name: String,
    expected: String,
    actual: String,
    score: Option<u8>,
    #[serde(rename = "match")]
    matched: String,
    word_count: usize,
    positives: String,
    negatives: String,
    error: String,
}

fn quoted(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Write the header and one line per row. Strings are always quoted, numbers bare.
pub fn write_csv<W: Write>(rows: &[ReportRow], mut out: W) -> Result<(), csv::Error> {
    out.write_all(REPORT_HEADER.as_bytes())?;
    out.write_all(b"\n")?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out);
    for row in rows {
        wtr.serialize(row.record())?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn to_csv_string(rows: &[ReportRow]) -> Result<String, csv::Error> {
    let mut buf = Vec::new();
    write_csv(rows, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GradeAccuracy {
    pub graded: usize,
    pub matched: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub graded: usize,
    pub matched: usize,
    pub fetch_failures: usize,
    pub timeouts: usize,
    /// Keyed by expected grade; only graded rows count.
    pub by_expected: BTreeMap<Grade, GradeAccuracy>,
}

impl BatchSummary {
    pub fn from_rows(rows: &[ReportRow]) -> Self {
        let mut s = Self {
            total: rows.len(),
            ..Self::default()
        };
        for row in rows {
            match &row.outcome {
                Outcome::FetchFailed(_) => s.fetch_failures += 1,
                Outcome::TimedOut(_) => s.timeouts += 1,
                Outcome::Graded(_) => {
                    s.graded += 1;
                    let hit = row.is_match();
                    if hit {
                        s.matched += 1;
                    }
                    if let Some(expected) = row.expected {
                        let acc = s.by_expected.entry(expected).or_default();
                        acc.graded += 1;
                        acc.matched += usize::from(hit);
                    }
                }
            }
        }
        s
    }

    /// Share of graded rows whose grade matched, `None` when nothing was graded.
    pub fn match_rate(&self) -> Option<f64> {
        (self.graded > 0).then(|| self.matched as f64 / self.graded as f64)
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total: {}", self.total)?;
        writeln!(f, "Graded: {}", self.graded)?;
        writeln!(f, "Fetch failures: {}", self.fetch_failures)?;
        writeln!(f, "Scoring timeouts: {}", self.timeouts)?;
        match self.match_rate() {
            Some(rate) => writeln!(
                f,
                "Matches: {}/{} ({:.1}%)",
                self.matched,
                self.graded,
                rate * 100.0
            )?,
            None => writeln!(f, "Matches: 0/0 (n/a)")?,
        }
        writeln!(f, "Accuracy by grade:")?;
        for grade in Grade::ALL {
            let acc = self.by_expected.get(&grade).copied().unwrap_or_default();
            let pct = if acc.graded > 0 {
                acc.matched * 100 / acc.graded
            } else {
                0
            };
            writeln!(f, "  Grade {grade}: {}/{} ({pct}%)", acc.matched, acc.graded)?;
        }
        Ok(())
    }
}
