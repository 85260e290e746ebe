use colored::Colorize;
use core::fmt;
use std::path::PathBuf;
use tabled::{Table, Tabled, settings::Style};

use crate::media::Candidate;

/// What happened to a single source file.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Renamed(PathBuf),
    /// Dry run: the file would have been renamed to this path.
    Planned(PathBuf),
    /// Already at its destination.
    Unchanged,
    Skipped,
    Deleted,
    Failed(String),
    /// The user stopped the run while handling this file.
    Aborted,
}

impl Outcome {
    pub fn destination(&self) -> Option<&PathBuf> {
        match self {
            Outcome::Renamed(path) | Outcome::Planned(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Renamed(_) => write!(f, "renamed"),
            Outcome::Planned(_) => write!(f, "planned"),
            Outcome::Unchanged => write!(f, "unchanged"),
            Outcome::Skipped => write!(f, "skipped"),
            Outcome::Deleted => write!(f, "deleted"),
            Outcome::Failed(reason) => write!(f, "failed: {}", reason),
            Outcome::Aborted => write!(f, "aborted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub source: PathBuf,
    pub outcome: Outcome,
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Destination")]
    destination: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Report {
    entries: Vec<Entry>,
}

impl Report {
    pub fn push(&mut self, source: PathBuf, outcome: Outcome) {
        self.entries.push(Entry { source, outcome });
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn failures(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.outcome.is_failure())
            .count()
    }

    pub fn table(&self) -> String {
        self.table_with_width(textwrap::termwidth().saturating_sub(30).clamp(30, 80) / 2)
    }

    fn table_with_width(&self, width: usize) -> String {
        let rows = self.entries.iter().map(|entry| EntryRow {
            file: textwrap::fill(&entry.source.display().to_string(), width),
            result: textwrap::fill(&entry.outcome.to_string(), width),
            destination: entry
                .outcome
                .destination()
                .map(|path| textwrap::fill(&path.display().to_string(), width))
                .unwrap_or_default(),
        });
        Table::new(rows).with(Style::rounded()).to_string()
    }

    pub fn print(&self) {
        if self.entries.is_empty() {
            println!("{}", "No video files to process".yellow());
            return;
        }
        println!();
        println!("{}", self.table());
        let failures = self.failures();
        if failures > 0 {
            println!("{}", format!("{} file(s) failed", failures).red().bold());
        }
    }
}

#[derive(Tabled)]
struct CandidateRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Year")]
    year: String,
    #[tabled(rename = "TMDB")]
    id: i32,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Overview")]
    overview: String,
}

/// Renders candidates with wrapped overviews, numbered from 1.
pub fn candidate_table(candidates: &[Candidate]) -> String {
    let width = textwrap::termwidth().saturating_sub(60).max(30);
    let rows = candidates
        .iter()
        .enumerate()
        .map(|(i, candidate)| CandidateRow {
            index: i + 1,
            title: candidate.title.clone(),
            year: candidate.year.map(|y| y.to_string()).unwrap_or_default(),
            id: candidate.id,
            score: candidate
                .confidence
                .map(|c| format!("{:.2}", c))
                .unwrap_or_default(),
            overview: textwrap::fill(&candidate.overview, width),
        });
    Table::new(rows).with(Style::rounded()).to_string()
}
