//! Naming templates for destination paths.
//!
//! A template is a `/` separated relative path with `{field}` placeholders.
//! Numeric fields take an optional zero-pad width, as in `{season:02}`.
//!
//! | Field             | Value                                   |
//! |-------------------|-----------------------------------------|
//! | `title`           | movie title or show name                |
//! | `year`            | release year / first air year           |
//! | `tmdb_id`         | TMDB id of the movie or show            |
//! | `tag`             | ` - <tag>` when a tag was given         |
//! | `ext`             | lowercase file extension                |
//! | `season`          | season number (shows)                   |
//! | `episode`         | episode number (shows)                  |
//! | `episode_title`   | episode name (shows)                    |
//!
//! Templates are parsed eagerly, so unknown fields fail before any file is
//! touched. Rendered values are sanitized for the filesystem; empty `()` and
//! `[]` groups left behind by missing values are dropped.

use anyhow::{Context, Result, bail};
use regex::Regex;
use sanitize_filename::sanitize;
use std::{path::PathBuf, str::FromStr};

use crate::{
    media::Candidate,
    tmdb::{Episode, Show},
};

pub const DEFAULT_MOVIE_TEMPLATE: &str = "{title} ({year})/{title} ({year}){tag}.{ext}";
pub const DEFAULT_SHOW_TEMPLATE: &str =
    "{title} ({year})/Season {season:02}/{title} - S{season:02}E{episode:02} - {episode_title}{tag}.{ext}";

const FIELD_NAMES: &str = "title, year, tmdb_id, tag, ext, season, episode, episode_title";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Year,
    TmdbId,
    Tag,
    Ext,
    Season,
    Episode,
    EpisodeTitle,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "title" => Field::Title,
            "year" => Field::Year,
            "tmdb_id" => Field::TmdbId,
            "tag" => Field::Tag,
            "ext" => Field::Ext,
            "season" => Field::Season,
            "episode" => Field::Episode,
            "episode_title" => Field::EpisodeTitle,
            _ => return None,
        })
    }

    fn is_numeric(&self) -> bool {
        matches!(
            self,
            Field::Year | Field::TmdbId | Field::Season | Field::Episode
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Field { field: Field, width: usize },
}

/// Values substituted into a [`NamingTemplate`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    pub title: String,
    pub year: Option<i32>,
    pub tmdb_id: Option<i32>,
    pub tag: Option<String>,
    pub ext: String,
    pub season: Option<i32>,
    pub episode: Option<i32>,
    pub episode_title: Option<String>,
}

impl Fields {
    pub fn movie(candidate: &Candidate, ext: &str) -> Self {
        Self {
            title: candidate.title.clone(),
            year: candidate.year,
            tmdb_id: Some(candidate.id),
            ext: ext.to_string(),
            ..Default::default()
        }
    }

    pub fn episode(show: &Show, episode: &Episode, ext: &str) -> Self {
        Self {
            title: show.name.clone(),
            year: show.year,
            tmdb_id: Some(show.id),
            ext: ext.to_string(),
            season: Some(episode.season_number),
            episode: Some(episode.episode_number),
            episode_title: Some(episode.name.clone()),
            ..Default::default()
        }
    }

    fn value(&self, field: Field, width: usize) -> String {
        let number = |n: Option<i32>| {
            n.map(|n| format!("{:0width$}", n, width = width))
                .unwrap_or_default()
        };
        match field {
            Field::Title => sanitize(&self.title),
            Field::Year => number(self.year),
            Field::TmdbId => number(self.tmdb_id),
            Field::Tag => self
                .tag
                .as_deref()
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(|tag| format!(" - {}", sanitize(tag)))
                .unwrap_or_default(),
            Field::Ext => sanitize(&self.ext),
            Field::Season => number(self.season),
            Field::Episode => number(self.episode),
            Field::EpisodeTitle => self.episode_title.as_deref().map(sanitize).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NamingTemplate {
    source: String,
    parts: Vec<Part>,
}

impl FromStr for NamingTemplate {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            bail!("Template is empty");
        }
        if s.starts_with('/') {
            bail!("Template \"{}\" must be relative to the output directory", s);
        }

        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = s.char_indices();

        while let Some((start, c)) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        match c {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => bail!("Nested '{{' at position {} in template \"{}\"", start, s),
                            c => name.push(c),
                        }
                    }
                    if !closed {
                        bail!("Unclosed '{{' at position {} in template \"{}\"", start, s);
                    }
                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(parse_placeholder(&name)?);
                }
                '}' => bail!("Unmatched '}}' at position {} in template \"{}\"", start, s),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        Ok(Self {
            source: s.to_string(),
            parts,
        })
    }
}

fn parse_placeholder(placeholder: &str) -> Result<Part> {
    let (name, width) = match placeholder.split_once(':') {
        Some((name, width)) => (name.trim(), Some(width.trim())),
        None => (placeholder.trim(), None),
    };
    let field = Field::parse(name).with_context(|| {
        format!(
            "Unknown template field \"{{{}}}\", expected one of: {}",
            name, FIELD_NAMES
        )
    })?;
    let width = match width {
        None => 0,
        Some(_) if !field.is_numeric() => {
            bail!("Template field \"{}\" does not take a width", name)
        }
        Some(width) => width
            .parse()
            .with_context(|| format!("Invalid width \"{}\" for field \"{}\"", width, name))?,
    };
    Ok(Part::Field { field, width })
}

impl NamingTemplate {
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Renders the template into a path relative to the output directory.
    pub fn render(&self, fields: &Fields) -> Result<PathBuf> {
        let rendered = self
            .parts
            .iter()
            .map(|part| match part {
                Part::Literal(text) => text.clone(),
                Part::Field { field, width } => fields.value(*field, *width),
            })
            .collect::<String>();

        let empty_group = Regex::new(r"\(\s*\)|\[\s*\]")?;
        let spaces = Regex::new(r"\s{2,}")?;
        let before_ext = Regex::new(r"\s*(?:-\s*)?(\.[A-Za-z0-9]+)$")?;
        let trailing_dash = Regex::new(r"\s*-\s*$")?;

        let mut path = PathBuf::new();
        for segment in rendered.split('/') {
            let segment = empty_group.replace_all(segment, "");
            let segment = spaces.replace_all(segment.trim(), " ");
            let segment = before_ext.replace(&segment, "$1");
            let segment = trailing_dash.replace(&segment, "");
            let segment = segment.trim();

            if segment.is_empty() || segment == "." || segment == ".." {
                bail!(
                    "Template \"{}\" rendered an invalid path \"{}\"",
                    self.source,
                    rendered
                );
            }
            path.push(segment);
        }
        Ok(path)
    }
}
