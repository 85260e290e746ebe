use anyhow::{Context, Result, bail};
use colored::Colorize;
use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use crate::{
    config::Config,
    fsops::{commit, prune_empty_dirs},
    media::{Candidate, Query, SourceFile},
    prompt::{Decision, Prompter, Reply},
    report::{Outcome, Report},
    resolve::{MetadataSource, Resolution, resolve},
    template::Fields,
    tmdb::Show,
    video::{ContentType, count_videos, parse_episode_id},
};

enum Identified {
    Found(Fields),
    Skipped,
    Aborted,
}

/// Drives the run: resolves each file, plans its destination and commits it.
pub struct Renamer<'a, M, P> {
    config: &'a Config,
    metadata: &'a M,
    prompter: &'a mut P,
    /// Destinations already claimed by earlier files in this run.
    planned: HashSet<PathBuf>,
    /// Series resolutions keyed by the derived query, case-folded.
    series: HashMap<Query, Candidate>,
    shows: HashMap<i32, Show>,
}

impl<'a, M: MetadataSource, P: Prompter> Renamer<'a, M, P> {
    pub fn new(config: &'a Config, metadata: &'a M, prompter: &'a mut P) -> Self {
        Self {
            config,
            metadata,
            prompter,
            planned: HashSet::new(),
            series: HashMap::new(),
            shows: HashMap::new(),
        }
    }

    /// Processes `sources` in order. A failure is recorded against its file
    /// and the run moves on; only an abort stops early.
    pub async fn run(&mut self, sources: Vec<SourceFile>) -> Result<Report> {
        let mut report = Report::default();

        for source in sources {
            let outcome = match self.process(&source).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    eprintln!("{} {}: {:#}", "Failed".red().bold(), source.path.display(), e);
                    Outcome::Failed(format!("{:#}", e))
                }
            };
            let aborted = outcome == Outcome::Aborted;
            report.push(source.path, outcome);
            if aborted {
                warn!("run aborted by user");
                break;
            }
        }

        if !self.config.dry_run {
            for folder in prune_empty_dirs(&self.config.output) {
                println!("Removed empty folder {}", folder.display());
            }
        }

        Ok(report)
    }

    async fn process(&mut self, file: &SourceFile) -> Result<Outcome> {
        info!(file = %file, kind = %file.kind, query = %file.query, "processing");

        let mut fields = match self.identify(file).await? {
            Identified::Found(fields) => fields,
            Identified::Skipped => {
                println!("{} {}", "Skip".yellow(), file.path.display());
                return Ok(Outcome::Skipped);
            }
            Identified::Aborted => return Ok(Outcome::Aborted),
        };

        let template = self.config.template(file.kind);
        if self.config.ask_tag {
            let untagged = self.config.output.join(template.render(&fields)?);
            let default = match untagged.parent() {
                Some(dir) if untagged.exists() => Some(format!("CD{}", count_videos(dir))),
                _ => None,
            };
            match self.prompter.tag(file, default.as_deref())? {
                Reply::Answer(tag) => fields.tag = tag,
                Reply::Skip => return Ok(Outcome::Skipped),
                Reply::Abort => return Ok(Outcome::Aborted),
            }
        }

        let destination = self.config.output.join(template.render(&fields)?);
        if same_file(&destination, &file.path) {
            println!("{} {}", "Unchanged".dimmed(), file.path.display());
            return Ok(Outcome::Unchanged);
        }
        if self.planned.contains(&destination) {
            bail!(
                "{} is already the destination of another file in this run",
                destination.display()
            );
        }

        let exists = destination.exists();
        if self.config.confirm {
            match self.prompter.confirm(&file.path, &destination, exists)? {
                Decision::Proceed => {}
                Decision::Skip => return Ok(Outcome::Skipped),
                Decision::Abort => return Ok(Outcome::Aborted),
                Decision::DeleteSource => return self.delete(file),
            }
        }
        if exists {
            bail!("Destination already exists: {}", destination.display());
        }

        self.planned.insert(destination.clone());

        if self.config.dry_run {
            println!(
                "{} {} {}",
                self.config.mode.verb(),
                file.path.display(),
                destination.display()
            );
            return Ok(Outcome::Planned(destination));
        }

        commit(self.config.mode, &file.path, &destination)?;
        println!(
            "{} {} -> {}",
            self.config.mode.verb().green(),
            file.path.display(),
            destination.display()
        );
        Ok(Outcome::Renamed(destination))
    }

    async fn identify(&mut self, file: &SourceFile) -> Result<Identified> {
        match file.kind {
            ContentType::Movie => {
                let resolution = resolve(
                    self.metadata,
                    &mut *self.prompter,
                    file,
                    ContentType::Movie,
                    self.config.threshold,
                )
                .await?;
                Ok(match resolution {
                    Resolution::Resolved(movie) => {
                        Identified::Found(Fields::movie(&movie, &file.ext))
                    }
                    Resolution::Skipped => Identified::Skipped,
                    Resolution::Aborted => Identified::Aborted,
                })
            }
            ContentType::Show => self.identify_episode(file).await,
        }
    }

    async fn identify_episode(&mut self, file: &SourceFile) -> Result<Identified> {
        let key = Query::new(file.query.text.to_lowercase(), file.query.year);
        let cached = if key.is_empty() {
            None
        } else {
            self.series.get(&key).cloned()
        };
        let series = match cached {
            Some(series) => series,
            None => {
                let resolution = resolve(
                    self.metadata,
                    &mut *self.prompter,
                    file,
                    ContentType::Show,
                    self.config.threshold,
                )
                .await?;
                match resolution {
                    Resolution::Resolved(series) => {
                        if !key.is_empty() {
                            self.series.insert(key, series.clone());
                        }
                        series
                    }
                    Resolution::Skipped => return Ok(Identified::Skipped),
                    Resolution::Aborted => return Ok(Identified::Aborted),
                }
            }
        };

        if !self.shows.contains_key(&series.id) {
            let show = self
                .metadata
                .show(series.id)
                .await
                .with_context(|| format!("Failed to fetch episodes of {}", series))?;
            self.shows.insert(series.id, show);
        }
        let show = self
            .shows
            .get(&series.id)
            .context("Show missing from cache")?;
        let episodes = show.episodes();

        let episode_id = match parse_episode_id(&file.path) {
            Ok(id) if episodes.contains_key(&id) => id,
            parsed => {
                if let Ok(id) = parsed {
                    warn!(file = %file, episode = %id, show = %show.name, "episode not found");
                }
                match self.prompter.choose_episode(file, show)? {
                    Reply::Answer(id) => id,
                    Reply::Skip => return Ok(Identified::Skipped),
                    Reply::Abort => return Ok(Identified::Aborted),
                }
            }
        };

        let episode = episodes
            .get(&episode_id)
            .with_context(|| format!("Unable to get metadata for {}", episode_id))?;

        Ok(Identified::Found(Fields::episode(show, episode, &file.ext)))
    }

    fn delete(&mut self, file: &SourceFile) -> Result<Outcome> {
        match self.prompter.confirm_delete(&file.path)? {
            Reply::Answer(true) => {}
            Reply::Answer(false) | Reply::Skip => return Ok(Outcome::Skipped),
            Reply::Abort => return Ok(Outcome::Aborted),
        }
        if self.config.dry_run {
            println!("rm {}", file.path.display());
        } else {
            fs::remove_file(&file.path)
                .with_context(|| format!("Failed to delete {}", file.path.display()))?;
            println!("{} {}", "Deleted".red(), file.path.display());
        }
        Ok(Outcome::Deleted)
    }
}

/// True when both paths name the same existing file, however they are spelled.
fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
