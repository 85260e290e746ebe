use anyhow::{Result, anyhow};
use std::{
    collections::{HashMap, HashSet, VecDeque},
    path::Path,
    sync::Mutex,
};

use crate::{
    media::{Candidate, Query, SourceFile},
    prompt::{Choice, Decision, Prompter, Reply},
    resolve::MetadataSource,
    tmdb::{Episode, Season, Show},
    video::ContentType,
};

pub fn candidate(id: i32, title: &str, year: Option<i32>) -> Candidate {
    Candidate {
        id,
        title: title.to_string(),
        original_title: None,
        year,
        overview: String::new(),
        confidence: None,
    }
}

pub fn test_show() -> Show {
    let episode = |season_number, episode_number, name: &str| Episode {
        id: season_number * 100 + episode_number,
        season_number,
        episode_number,
        name: name.to_string(),
        overview: String::new(),
        air_date: None,
    };
    let season = |season_number, episodes| Season {
        id: season_number,
        season_number,
        name: format!("Season {}", season_number),
        overview: String::new(),
        air_date: None,
        episodes,
    };

    Show {
        id: 42,
        name: "Show Name".to_string(),
        overview: "Test show".to_string(),
        year: Some(2008),
        first_air_date: Some("2008-01-20".to_string()),
        number_of_episodes: 4,
        number_of_seasons: 2,
        seasons: vec![
            season(1, vec![episode(1, 1, "One"), episode(1, 2, "Two")]),
            season(2, vec![episode(2, 1, "Three"), episode(2, 2, "Four")]),
        ],
    }
}

/// Canned search results keyed by kind and query. Unknown queries return nothing.
#[derive(Default)]
pub struct FakeSource {
    results: HashMap<(ContentType, Query), Vec<Candidate>>,
    shows: HashMap<i32, Show>,
    failing: bool,
    failing_queries: HashSet<(ContentType, Query)>,
    queries: Mutex<Vec<Query>>,
    show_fetches: Mutex<usize>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: ContentType, query: Query, candidates: Vec<Candidate>) -> Self {
        self.results.insert((kind, query), candidates);
        self
    }

    pub fn with_show(mut self, show: Show) -> Self {
        self.shows.insert(show.id, show);
        self
    }

    /// Every request fails, as if the service were unreachable.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Only searches for `query` fail.
    pub fn failing_on(mut self, kind: ContentType, query: Query) -> Self {
        self.failing_queries.insert((kind, query));
        self
    }

    pub fn queries(&self) -> Vec<Query> {
        self.queries.lock().unwrap().clone()
    }

    pub fn show_fetches(&self) -> usize {
        *self.show_fetches.lock().unwrap()
    }
}

impl MetadataSource for FakeSource {
    async fn search(&self, kind: ContentType, query: &Query) -> Result<Vec<Candidate>> {
        self.queries.lock().unwrap().push(query.clone());
        if self.failing || self.failing_queries.contains(&(kind, query.clone())) {
            return Err(anyhow!("connection refused"));
        }
        Ok(self
            .results
            .get(&(kind, query.clone()))
            .cloned()
            .unwrap_or_default())
    }

    async fn show(&self, id: i32) -> Result<Show> {
        *self.show_fetches.lock().unwrap() += 1;
        if self.failing {
            return Err(anyhow!("connection refused"));
        }
        self.shows
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow!("404 Not Found"))
    }
}

/// Answers prompts from queues. Running out of answers fails the test.
#[derive(Default)]
pub struct ScriptedPrompter {
    choices: VecDeque<Choice>,
    episodes: VecDeque<Reply<String>>,
    tags: VecDeque<Reply<Option<String>>>,
    decisions: VecDeque<Decision>,
    deletes: VecDeque<Reply<bool>>,
    accept_default_tags: bool,
    seen: Vec<(Query, Vec<Candidate>)>,
    tag_defaults: Vec<Option<String>>,
}

impl ScriptedPrompter {
    pub fn new(choices: Vec<Choice>) -> Self {
        Self {
            choices: choices.into(),
            ..Default::default()
        }
    }

    pub fn with_episodes(mut self, episodes: Vec<Reply<String>>) -> Self {
        self.episodes = episodes.into();
        self
    }

    pub fn with_decisions(mut self, decisions: Vec<Decision>) -> Self {
        self.decisions = decisions.into();
        self
    }

    pub fn with_delete_answers(mut self, answers: Vec<Reply<bool>>) -> Self {
        self.deletes = answers.into();
        self
    }

    /// Answers for the tag prompt, used before falling back to the default.
    pub fn with_tags(mut self, tags: Vec<Reply<Option<String>>>) -> Self {
        self.tags = tags.into();
        self
    }

    pub fn accepting_default_tags(mut self) -> Self {
        self.accept_default_tags = true;
        self
    }

    /// Query and candidate list shown at each selection prompt.
    pub fn choices_seen(&self) -> &[(Query, Vec<Candidate>)] {
        &self.seen
    }

    pub fn tag_defaults(&self) -> Vec<Option<String>> {
        self.tag_defaults.clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn choose(
        &mut self,
        file: &SourceFile,
        query: &Query,
        candidates: &[Candidate],
    ) -> Result<Choice> {
        self.seen.push((query.clone(), candidates.to_vec()));
        match self.choices.pop_front() {
            Some(choice) => Ok(choice),
            None => panic!("unexpected selection prompt for {}", file),
        }
    }

    fn choose_episode(&mut self, file: &SourceFile, _show: &Show) -> Result<Reply<String>> {
        match self.episodes.pop_front() {
            Some(episode) => Ok(episode),
            None => panic!("unexpected episode prompt for {}", file),
        }
    }

    fn tag(&mut self, _file: &SourceFile, default: Option<&str>) -> Result<Reply<Option<String>>> {
        self.tag_defaults.push(default.map(str::to_string));
        if let Some(reply) = self.tags.pop_front() {
            return Ok(reply);
        }
        Ok(Reply::Answer(if self.accept_default_tags {
            default.map(str::to_string)
        } else {
            None
        }))
    }

    fn confirm(&mut self, source: &Path, _destination: &Path, _exists: bool) -> Result<Decision> {
        match self.decisions.pop_front() {
            Some(decision) => Ok(decision),
            None => panic!("unexpected confirmation for {}", source.display()),
        }
    }

    fn confirm_delete(&mut self, source: &Path) -> Result<Reply<bool>> {
        match self.deletes.pop_front() {
            Some(answer) => Ok(answer),
            None => panic!("unexpected delete confirmation for {}", source.display()),
        }
    }
}
