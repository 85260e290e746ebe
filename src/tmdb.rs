use anyhow::{Context, Result};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use tracing::debug;

use crate::{
    media::{Candidate, Query},
    resolve::MetadataSource,
    video::{ContentType, episode_id},
};

const BASE_URL: &str = "https://api.themoviedb.org/3";

#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct Series {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub overview: String,
    pub first_air_date: Option<String>,
    pub number_of_episodes: i32,
    pub number_of_seasons: i32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Season {
    pub id: i32,
    pub season_number: i32,
    pub name: String,
    #[serde(default)]
    pub overview: String,
    pub air_date: Option<String>,
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Episode {
    pub id: i32,
    pub season_number: i32,
    pub episode_number: i32,
    pub name: String,
    #[serde(default)]
    pub overview: String,
    pub air_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Show {
    pub id: i32,
    pub name: String,
    pub overview: String,
    pub year: Option<i32>,
    pub first_air_date: Option<String>,
    pub number_of_episodes: i32,
    pub number_of_seasons: i32,
    pub seasons: Vec<Season>,
}

impl Show {
    pub fn episodes(&self) -> HashMap<String, &Episode> {
        self.seasons
            .iter()
            .flat_map(|season| {
                season.episodes.iter().map(move |episode| {
                    (
                        episode_id(season.season_number, episode.episode_number),
                        episode,
                    )
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct SearchPage<T> {
    results: Vec<T>,
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct MovieResult {
    pub id: i32,
    pub title: String,
    pub original_title: Option<String>,
    pub release_date: Option<String>,
    pub overview: Option<String>,
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct TvResult {
    pub id: i32,
    pub name: String,
    pub original_name: Option<String>,
    pub first_air_date: Option<String>,
    pub overview: Option<String>,
}

impl From<MovieResult> for Candidate {
    fn from(movie: MovieResult) -> Self {
        Candidate {
            id: movie.id,
            year: movie.release_date.as_deref().and_then(parse_year),
            original_title: movie.original_title.filter(|title| *title != movie.title),
            title: movie.title,
            overview: movie.overview.unwrap_or_default(),
            confidence: None,
        }
    }
}

impl From<TvResult> for Candidate {
    fn from(show: TvResult) -> Self {
        Candidate {
            id: show.id,
            year: show.first_air_date.as_deref().and_then(parse_year),
            original_title: show.original_name.filter(|name| *name != show.name),
            title: show.name,
            overview: show.overview.unwrap_or_default(),
            confidence: None,
        }
    }
}

/// Reads the year out of a TMDB `YYYY-MM-DD` date. TMDB sends `""` for unknown dates.
pub fn parse_year(date: &str) -> Option<i32> {
    date.split('-').next().and_then(|y| y.parse().ok())
}

/// Read access tokens are JWTs; anything else is a v3 API key.
fn is_access_token(credential: &str) -> bool {
    credential.starts_with("eyJ")
}

pub struct TmdbClient {
    client: reqwest::Client,
    credential: String,
    language: String,
}

impl TmdbClient {
    pub fn new(credential: impl Into<String>, language: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
                .build()?,
            credential: credential.into(),
            language: language.into(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        debug!(path, ?params, "tmdb request");
        let mut request = self
            .client
            .get(format!("{}{}", BASE_URL, path))
            .query(&[("language", self.language.as_str())])
            .query(params);
        request = if is_access_token(&self.credential) {
            request.bearer_auth(&self.credential)
        } else {
            request.query(&[("api_key", self.credential.as_str())])
        };

        Ok(request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    pub async fn search_movies(&self, query: &Query) -> Result<Vec<MovieResult>> {
        let mut params = vec![("query", query.text.clone())];
        if let Some(year) = query.year {
            params.push(("year", year.to_string()));
        }
        let page: SearchPage<MovieResult> = self.get("/search/movie", &params).await?;
        Ok(page.results)
    }

    pub async fn search_shows(&self, query: &Query) -> Result<Vec<TvResult>> {
        let mut params = vec![("query", query.text.clone())];
        if let Some(year) = query.year {
            params.push(("first_air_date_year", year.to_string()));
        }
        let page: SearchPage<TvResult> = self.get("/search/tv", &params).await?;
        Ok(page.results)
    }

    pub async fn show(&self, id: i32) -> Result<Show> {
        let series = self.series(id).await?;
        let seasons = try_join_all(
            (1..=series.number_of_seasons)
                .map(|season_number| self.season(id, season_number))
                .collect::<Vec<_>>(),
        )
        .await?;
        let year = series.first_air_date.as_deref().and_then(parse_year);

        Ok(Show {
            id: series.id,
            name: series.name,
            overview: series.overview,
            year,
            first_air_date: series.first_air_date,
            number_of_episodes: series.number_of_episodes,
            number_of_seasons: series.number_of_seasons,
            seasons,
        })
    }

    pub async fn series(&self, id: i32) -> Result<Series> {
        self.get(&format!("/tv/{}", id), &[]).await
    }

    pub async fn season(&self, id: i32, season: i32) -> Result<Season> {
        self.get(&format!("/tv/{}/season/{}", id, season), &[])
            .await
            .with_context(|| format!("Failed to fetch season {} of show {}", season, id))
    }
}

impl MetadataSource for TmdbClient {
    async fn search(&self, kind: ContentType, query: &Query) -> Result<Vec<Candidate>> {
        Ok(match kind {
            ContentType::Movie => self
                .search_movies(query)
                .await?
                .into_iter()
                .map(Candidate::from)
                .collect(),
            ContentType::Show => self
                .search_shows(query)
                .await?
                .into_iter()
                .map(Candidate::from)
                .collect(),
        })
    }

    async fn show(&self, id: i32) -> Result<Show> {
        TmdbClient::show(self, id).await
    }
}
