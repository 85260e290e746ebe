use anyhow::Result;
use core::fmt;
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::video::{ContentType, parse_content_type, parse_extension, parse_title, parse_year};

/// Search criteria sent to the metadata service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Query {
    pub text: String,
    pub year: Option<i32>,
}

impl Query {
    pub fn new(text: impl Into<String>, year: Option<i32>) -> Self {
        Self {
            text: text.into(),
            year,
        }
    }

    /// Parses free text typed by the user. A trailing four digit year becomes
    /// the year filter; everything else is kept verbatim as the search text.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if let Some((text, last)) = input.rsplit_once(char::is_whitespace) {
            let text = text.trim();
            let is_year = last.len() == 4 && last.chars().all(|c| c.is_ascii_digit());
            if is_year && !text.is_empty() {
                if let Ok(year) = last.parse() {
                    return Self::new(text, Some(year));
                }
            }
        }
        Self::new(input, None)
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.year {
            Some(year) => write!(f, "{} {}", self.text, year),
            None => write!(f, "{}", self.text),
        }
    }
}

/// One match returned by the metadata service.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: i32,
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<i32>,
    pub overview: String,
    /// Match score in `[0, 1]` when the service provides one.
    pub confidence: Option<f64>,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.year {
            Some(year) => write!(f, "{} ({})", self.title, year),
            None => write!(f, "{}", self.title),
        }
    }
}

impl Candidate {
    /// The service-provided confidence, or one computed against `query`.
    pub fn confidence_for(&self, query: &Query) -> f64 {
        self.confidence.unwrap_or_else(|| score(query, self))
    }
}

fn normalize(title: &str) -> Vec<String> {
    let words = title
        .to_lowercase()
        .replace('&', " and ")
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    match words.first().map(String::as_str) {
        Some("the") if words.len() > 1 => words[1..].to_vec(),
        _ => words,
    }
}

fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    let a = a.into_iter().collect::<HashSet<_>>();
    let b = b.into_iter().collect::<HashSet<_>>();
    let shared = a.intersection(&b).count() as f64;
    let total = a.union(&b).count() as f64;
    shared / total
}

/// Scores how well `candidate` matches `query`, from title agreement
/// (exact after normalization, otherwise word overlap) scaled by year agreement.
pub fn score(query: &Query, candidate: &Candidate) -> f64 {
    let title = [Some(&candidate.title), candidate.original_title.as_ref()]
        .into_iter()
        .flatten()
        .map(|title| similarity(&query.text, title))
        .fold(0.0, f64::max);

    let year = match (query.year, candidate.year) {
        (None, _) => 1.0,
        (Some(_), None) => 0.8,
        (Some(wanted), Some(year)) if wanted == year => 1.0,
        (Some(wanted), Some(year)) if (wanted - year).abs() == 1 => 0.9,
        (Some(_), Some(_)) => 0.5,
    };

    title * year
}

/// A ripped video file waiting to be renamed.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub query: Query,
    pub ext: String,
    pub kind: ContentType,
}

impl SourceFile {
    /// Returns `None` when `path` is not a recognised video file.
    pub fn new(path: &Path, kind: Option<ContentType>) -> Option<Self> {
        let ext = parse_extension(path)?;
        let text = parse_title(path).unwrap_or_default();
        Some(Self {
            path: path.to_path_buf(),
            query: Query::new(text, parse_year(path)),
            ext,
            kind: kind.unwrap_or_else(|| parse_content_type(path)),
        })
    }
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// Expands the input paths into video files. Directories are walked
/// recursively in file name order; duplicates are dropped.
pub fn collect_sources(inputs: &[PathBuf], kind: Option<ContentType>) -> Result<Vec<SourceFile>> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for input in inputs {
        if !input.exists() {
            warn!(path = %input.display(), "input does not exist");
            continue;
        }

        let paths = if input.is_dir() {
            let mut paths = Vec::new();
            let walker = WalkDir::new(input)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));
            for entry in walker {
                let entry = entry?;
                if entry.file_type().is_file() {
                    paths.push(entry.into_path());
                }
            }
            paths
        } else {
            vec![input.clone()]
        };

        for path in paths {
            let key = path.canonicalize().unwrap_or_else(|_| path.clone());
            if !seen.insert(key) {
                debug!(path = %path.display(), "skipping duplicate input");
                continue;
            }
            match SourceFile::new(&path, kind) {
                Some(source) => sources.push(source),
                None if input.is_dir() => debug!(path = %path.display(), "not a video file"),
                None => warn!(path = %path.display(), "not a video file"),
            }
        }
    }

    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn candidate(title: &str, year: Option<i32>) -> Candidate {
        Candidate {
            id: 1,
            title: title.to_string(),
            original_title: None,
            year,
            overview: String::new(),
            confidence: None,
        }
    }

    #[test]
    fn test_query_parse_trailing_year() {
        assert_eq!(
            Query::parse("Actual Title 1999"),
            Query::new("Actual Title", Some(1999))
        );
    }

    #[test]
    fn test_query_parse_keeps_text() {
        assert_eq!(Query::parse("  Heat  "), Query::new("Heat", None));
        assert_eq!(Query::parse("1917"), Query::new("1917", None));
        assert_eq!(
            Query::parse("Ocean's 11"),
            Query::new("Ocean's 11", None)
        );
    }

    #[test]
    fn test_query_display() {
        assert_eq!(Query::new("Heat", Some(1995)).to_string(), "Heat 1995");
        assert_eq!(Query::new("Heat", None).to_string(), "Heat");
    }

    #[test]
    fn test_score_exact_match() {
        let query = Query::new("Movie Title", Some(2010));
        assert_eq!(score(&query, &candidate("Movie Title", Some(2010))), 1.0);
    }

    #[test]
    fn test_score_ignores_case_punctuation_and_article() {
        let query = Query::new("the matrix", None);
        assert_eq!(score(&query, &candidate("The Matrix", Some(1999))), 1.0);

        let query = Query::new("Fast and Furious", None);
        assert_eq!(score(&query, &candidate("Fast & Furious", Some(2009))), 1.0);
    }

    #[test]
    fn test_score_year_mismatch() {
        let query = Query::new("Dune", Some(2021));
        assert_eq!(score(&query, &candidate("Dune", Some(2020))), 0.9);
        assert_eq!(score(&query, &candidate("Dune", Some(1984))), 0.5);
        assert_eq!(score(&query, &candidate("Dune", None)), 0.8);
    }

    #[test]
    fn test_score_partial_title() {
        let query = Query::new("Alien", None);
        let partial = score(&query, &candidate("Alien Resurrection", Some(1997)));
        assert!(partial > 0.0 && partial < 1.0);
        assert_eq!(score(&query, &candidate("Heat", None)), 0.0);
    }

    #[test]
    fn test_score_uses_original_title() {
        let query = Query::new("Amelie", None);
        let mut amelie = candidate("Le Fabuleux Destin d'Amélie Poulain", Some(2001));
        amelie.original_title = Some("Amelie".to_string());
        assert_eq!(score(&query, &amelie), 1.0);
    }

    #[test]
    fn test_confidence_prefers_service_score() {
        let query = Query::new("Heat", None);
        let mut heat = candidate("Something Else", None);
        heat.confidence = Some(0.95);
        assert_eq!(heat.confidence_for(&query), 0.95);
    }

    #[test]
    fn test_source_file_new() {
        let source = SourceFile::new(Path::new("Movie.Title.2010.mkv"), None).unwrap();
        assert_eq!(source.query, Query::new("Movie Title", Some(2010)));
        assert_eq!(source.ext, "mkv");
        assert_eq!(source.kind, ContentType::Movie);

        let source = SourceFile::new(Path::new("Show.S01E02.mp4"), None).unwrap();
        assert_eq!(source.kind, ContentType::Show);

        let source =
            SourceFile::new(Path::new("Show.S01E02.mp4"), Some(ContentType::Movie)).unwrap();
        assert_eq!(source.kind, ContentType::Movie);

        assert!(SourceFile::new(Path::new("notes.txt"), None).is_none());
    }

    #[test]
    fn test_collect_sources() {
        let temp_dir = TempDir::new().unwrap();
        let rips = temp_dir.path().join("rips");
        fs::create_dir_all(rips.join("nested")).unwrap();
        for name in ["b.mkv", "a.mp4", "readme.txt", "nested/c.avi", ".hidden.mkv"] {
            fs::File::create(rips.join(name)).unwrap();
        }

        let inputs = vec![rips.clone(), rips.join("a.mp4"), temp_dir.path().join("missing.mkv")];
        let sources = collect_sources(&inputs, None).unwrap();
        let names = sources
            .iter()
            .map(|source| source.path.strip_prefix(&rips).unwrap().to_path_buf())
            .collect::<Vec<_>>();

        assert_eq!(
            names,
            vec![
                PathBuf::from("a.mp4"),
                PathBuf::from("b.mkv"),
                Path::new("nested").join("c.avi"),
            ]
        );
    }
}
