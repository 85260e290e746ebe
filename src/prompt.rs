use anyhow::Result;
use colored::Colorize;
use inquire::{Confirm, InquireError, Select, Text};
use std::path::Path;

use crate::{
    media::{Candidate, Query, SourceFile},
    report::candidate_table,
    tmdb::Show,
    video::episode_id,
};

/// The user's answer when a file could not be matched automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    /// Index into the candidate list.
    Pick(usize),
    /// Search again with new criteria.
    Search(String),
    Skip,
    Abort,
}

/// An answer to a follow-up prompt, which may also skip the file or stop the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    Answer(T),
    Skip,
    Abort,
}

/// The user's answer when confirming a planned operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    Skip,
    DeleteSource,
    Abort,
}

pub trait Prompter {
    fn choose(
        &mut self,
        file: &SourceFile,
        query: &Query,
        candidates: &[Candidate],
    ) -> Result<Choice>;

    /// Returns the chosen episode id (`S01E02`).
    fn choose_episode(&mut self, file: &SourceFile, show: &Show) -> Result<Reply<String>>;

    /// Returns the tag to append, `None` for no tag.
    fn tag(&mut self, file: &SourceFile, default: Option<&str>) -> Result<Reply<Option<String>>>;

    fn confirm(&mut self, source: &Path, destination: &Path, exists: bool) -> Result<Decision>;

    fn confirm_delete(&mut self, source: &Path) -> Result<Reply<bool>>;
}

const SEARCH_AGAIN: &str = "Search again";
const SKIP: &str = "Skip this file";

/// Terminal prompts. Esc skips the current file, Ctrl-C aborts the run.
#[derive(Debug, Default)]
pub struct InquirePrompter;

impl InquirePrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for InquirePrompter {
    fn choose(
        &mut self,
        file: &SourceFile,
        query: &Query,
        candidates: &[Candidate],
    ) -> Result<Choice> {
        println!();
        println!("{} {}", "File:".bold(), file.path.display());
        if candidates.is_empty() {
            println!("{} \"{}\"", "No matches for".yellow(), query);
        } else {
            println!("{}", candidate_table(candidates));
        }

        loop {
            let mut options = candidates
                .iter()
                .enumerate()
                .map(|(i, candidate)| format!("{}. {}", i + 1, candidate))
                .collect::<Vec<_>>();
            options.push(SEARCH_AGAIN.to_string());
            options.push(SKIP.to_string());

            let selected = match Select::new("Best match?", options)
                .with_page_size(12)
                .raw_prompt_skippable()
            {
                Ok(Some(selected)) => selected,
                Ok(None) => return Ok(Choice::Skip),
                Err(InquireError::OperationInterrupted) => return Ok(Choice::Abort),
                Err(e) => return Err(e.into()),
            };

            if selected.index < candidates.len() {
                return Ok(Choice::Pick(selected.index));
            }
            if selected.value == SKIP {
                return Ok(Choice::Skip);
            }

            let default = query.to_string();
            match Text::new("Search criteria:")
                .with_default(&default)
                .with_help_message("Title, optionally followed by a year")
                .prompt_skippable()
            {
                Ok(Some(text)) if !text.trim().is_empty() => return Ok(Choice::Search(text)),
                Ok(_) => continue,
                Err(InquireError::OperationInterrupted) => return Ok(Choice::Abort),
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn choose_episode(&mut self, file: &SourceFile, show: &Show) -> Result<Reply<String>> {
        let mut episodes = show
            .seasons
            .iter()
            .flat_map(|season| season.episodes.iter())
            .collect::<Vec<_>>();
        episodes.sort_by_key(|episode| (episode.season_number, episode.episode_number));

        let options = episodes
            .iter()
            .map(|episode| {
                format!(
                    "{} - {}",
                    episode_id(episode.season_number, episode.episode_number),
                    episode.name
                )
            })
            .collect::<Vec<_>>();

        println!();
        println!("{} {}", "File:".bold(), file.path.display());
        match Select::new(&format!("Which episode of {}?", show.name), options)
            .with_page_size(15)
            .raw_prompt_skippable()
        {
            Ok(Some(selected)) => Ok(episodes
                .get(selected.index)
                .map(|episode| {
                    Reply::Answer(episode_id(episode.season_number, episode.episode_number))
                })
                .unwrap_or(Reply::Skip)),
            Ok(None) => Ok(Reply::Skip),
            Err(InquireError::OperationInterrupted) => Ok(Reply::Abort),
            Err(e) => Err(e.into()),
        }
    }

    fn tag(&mut self, file: &SourceFile, default: Option<&str>) -> Result<Reply<Option<String>>> {
        let help = format!("Appended to the name of {}", file.path.display());
        let mut prompt = Text::new("Tag (optional):").with_help_message(&help);
        if let Some(default) = default {
            prompt = prompt.with_default(default);
        }
        match prompt.prompt_skippable() {
            Ok(tag) => Ok(Reply::Answer(
                tag.map(|tag| tag.trim().to_string())
                    .filter(|tag| !tag.is_empty()),
            )),
            Err(InquireError::OperationInterrupted) => Ok(Reply::Abort),
            Err(e) => Err(e.into()),
        }
    }

    fn confirm(&mut self, source: &Path, destination: &Path, exists: bool) -> Result<Decision> {
        println!("{} {}", "src:".bold(), source.display());
        if exists {
            println!(
                "{} {} {}",
                "dst:".bold(),
                destination.display(),
                "(exists)".red()
            );
        } else {
            println!("{} {}", "dst:".bold(), destination.display());
        }

        let options = vec!["Yes", "Skip", "Delete source"];
        match Select::new("Look correct?", options).prompt_skippable() {
            Ok(Some("Yes")) => Ok(Decision::Proceed),
            Ok(Some("Delete source")) => Ok(Decision::DeleteSource),
            Ok(_) => Ok(Decision::Skip),
            Err(InquireError::OperationInterrupted) => Ok(Decision::Abort),
            Err(e) => Err(e.into()),
        }
    }

    fn confirm_delete(&mut self, source: &Path) -> Result<Reply<bool>> {
        match Confirm::new(&format!("Sure you want to delete {}?", source.display()))
            .with_default(false)
            .prompt_skippable()
        {
            Ok(answer) => Ok(Reply::Answer(answer.unwrap_or(false))),
            Err(InquireError::OperationInterrupted) => Ok(Reply::Abort),
            Err(e) => Err(e.into()),
        }
    }
}
