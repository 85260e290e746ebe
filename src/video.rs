use anyhow::{Context, Result};
use clap::ValueEnum;
use core::fmt;
use regex::{Captures, Regex};
use std::{collections::HashSet, path::Path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum ContentType {
    Show,
    Movie,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Show => "TV Show",
            ContentType::Movie => "Movie",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const VIDEO_EXTENSIONS: [&str; 9] = [
    "mp4", "mkv", "avi", "mov", "flv", "wmv", "webm", "m4v", "ts",
];

// Release tags that mark the end of the title portion of a name.
const RELEASE_TAGS: [&str; 27] = [
    "bluray", "brrip", "bdrip", "webrip", "webdl", "hdtv", "dvdrip", "dvd", "xvid", "x264",
    "x265", "h264", "h265", "hevc", "remux", "proper", "repack", "internal", "limited",
    "unrated", "extended", "hdr", "10bit", "aac", "ac3", "dts", "multi",
];

pub fn episode_id(season: i32, episode: i32) -> String {
    format!("S{:02}E{:02}", season, episode)
}

/// Splits a file stem into its title and release year.
///
/// The title ends at the first release-metadata token (episode markers,
/// resolutions, codecs, bracketed groups). The last four digit year before
/// that point is taken as the release year, unless it is the first word, so
/// names like `2001.A.Space.Odyssey.1968` keep their leading number.
fn split_title(stem: &str) -> Result<(String, Option<i32>)> {
    let leading_groups = Regex::new(r"^\s*(?:\[[^\]]*\]\s*)+")?;
    let separators = Regex::new(r"[\s._\-]+")?;
    let episode = Regex::new(r"(?i)^s\d{1,2}(?:e\d{1,3})?$|^e\d{1,3}$")?;
    let resolution = Regex::new(r"(?i)^\d{3,4}[pi]$")?;
    let year = Regex::new(r"^(?:19|20)\d{2}$")?;

    let stem = leading_groups.replace(stem, "");
    let tokens = separators
        .split(&stem)
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>();

    let mut end = tokens.len();
    let mut found_year = None;
    for (i, token) in tokens.iter().enumerate() {
        if token.starts_with('[') {
            end = i;
            break;
        }
        let bare = token.trim_matches(|c| matches!(c, '(' | ')' | '[' | ']'));
        let lower = bare.to_lowercase();
        if episode.is_match(bare) || resolution.is_match(bare) || RELEASE_TAGS.contains(&lower.as_str())
        {
            end = i;
            break;
        }
        if i > 0 && year.is_match(bare) {
            found_year = Some((i, bare.parse::<i32>()?));
        }
    }

    if let Some((i, _)) = found_year {
        end = end.min(i);
    }

    let title = tokens[..end]
        .iter()
        .map(|token| token.trim_matches(|c| matches!(c, '(' | ')')))
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    Ok((fix_title(&title), found_year.map(|(_, year)| year)))
}

/// Moves a trailing article to the front: `Matrix, The` becomes `The Matrix`.
pub fn fix_title(title: &str) -> String {
    let trimmed = title.trim();
    match trimmed.len().checked_sub(5) {
        Some(cut)
            if trimmed.is_char_boundary(cut) && trimmed[cut..].eq_ignore_ascii_case(", the") =>
        {
            format!("The {}", trimmed[..cut].trim())
        }
        _ => trimmed.to_string(),
    }
}

/// Extract the title from a filename by removing metadata patterns
/// Returns the cleaned title as a string
pub fn parse_title(path: &Path) -> Option<String> {
    let file_name = path.file_stem().and_then(|name| name.to_str())?;
    let (title, _) = split_title(file_name).ok()?;

    if title.is_empty() { None } else { Some(title) }
}

/// Extract the release year from a filename, if it carries one after the title.
pub fn parse_year(path: &Path) -> Option<i32> {
    let file_name = path.file_stem().and_then(|name| name.to_str())?;
    split_title(file_name).ok()?.1
}

pub fn parse_content_type(path: &Path) -> ContentType {
    if parse_episode_id(path).is_ok() {
        ContentType::Show
    } else {
        ContentType::Movie
    }
}

pub fn parse_extension(path: &Path) -> Option<String> {
    if path.is_dir() {
        return None;
    }

    let ext = path.extension()?.to_str()?.to_lowercase();

    let allowed_formats = VIDEO_EXTENSIONS
        .into_iter()
        .map(|ext| ext.to_string())
        .collect::<HashSet<_>>();
    if !allowed_formats.contains(&ext) {
        return None;
    }

    Some(ext)
}

/// Parses an explicit episode marker from the file name (`S01E02`,
/// `s01 e02`, `Season 1 Episode 2`), falling back to a season folder
/// (`Season 01/01 Pilot.mkv`). A bare number after a word ending in `s`, as
/// in `Cars.2.Disc.1`, is not a marker.
pub fn parse_episode_id(path: &Path) -> Result<String> {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .context("Failed to read file name")?;

    let marker = Regex::new(
        r"(?i)(?:^|[^a-z0-9])(?:s|season[._\-\s]*)(\d{1,2})[._\-\s]*(?:e|episode[._\-\s]*)(\d{1,3})(?:[^0-9]|$)",
    )?;
    if let Some(captures) = marker.captures(stem) {
        return Ok(episode_id(
            capture_number(&captures, 1)?,
            capture_number(&captures, 2)?,
        ));
    }

    let folder = path
        .parent()
        .and_then(Path::file_name)
        .and_then(|name| name.to_str())
        .context("Failed to extract season number")?;
    let season_folder = Regex::new(r"(?i)(?:^|[^a-z])season[._\-\s]*(\d{1,2})(?:[^0-9]|$)")?;
    let season = season_folder
        .captures(folder)
        .context("Failed to extract season number")?;

    let episode_number = Regex::new(r"(?i)(?:^|[^a-z0-9])(?:ep|episode|e)?[._\-\s]*(\d{1,3})(?:[^0-9]|$)")?;
    let episode = episode_number
        .captures(stem)
        .context("Failed to extract episode number")?;

    Ok(episode_id(
        capture_number(&season, 1)?,
        capture_number(&episode, 1)?,
    ))
}

fn capture_number(captures: &Captures<'_>, group: usize) -> Result<i32> {
    Ok(captures
        .get(group)
        .context("Failed to extract episode number")?
        .as_str()
        .parse()?)
}

/// Counts the video files directly inside `dir`. A missing directory has none.
pub fn count_videos(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| parse_extension(&entry.path()).is_some())
                .count()
        })
        .unwrap_or(0)
}
