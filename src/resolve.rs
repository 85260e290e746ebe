use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::{
    media::{Candidate, Query, SourceFile},
    prompt::{Choice, Prompter},
    tmdb::Show,
    video::ContentType,
};

/// Where metadata comes from: TMDB in production, canned results in tests.
#[allow(async_fn_in_trait)]
pub trait MetadataSource {
    /// Searches for `query`, returning candidates in relevance order.
    async fn search(&self, kind: ContentType, query: &Query) -> Result<Vec<Candidate>>;

    /// Fetches a show with all of its seasons and episodes.
    async fn show(&self, id: i32) -> Result<Show>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(Candidate),
    Skipped,
    /// The user asked to stop processing the remaining files too.
    Aborted,
}

/// Matches `file` to a single candidate, asking the user only when the
/// search does not return exactly one candidate at or above `threshold`.
pub async fn resolve<M: MetadataSource, P: Prompter>(
    metadata: &M,
    prompter: &mut P,
    file: &SourceFile,
    kind: ContentType,
    threshold: f64,
) -> Result<Resolution> {
    let mut query = file.query.clone();

    loop {
        let mut candidates = if query.is_empty() {
            debug!(file = %file, "no search text, asking for criteria");
            Vec::new()
        } else {
            metadata
                .search(kind, &query)
                .await
                .with_context(|| format!("Failed to search TMDB for \"{}\"", query))?
        };

        for candidate in &mut candidates {
            candidate.confidence = Some(candidate.confidence_for(&query));
        }

        if let [only] = candidates.as_slice() {
            let confidence = only.confidence.unwrap_or_default();
            if confidence >= threshold {
                info!(file = %file, candidate = %only, confidence, "auto-accepted match");
                return Ok(Resolution::Resolved(only.clone()));
            }
        }

        debug!(file = %file, query = %query, count = candidates.len(), "asking user to choose");
        match prompter.choose(file, &query, &candidates)? {
            Choice::Pick(index) => {
                let candidate = candidates
                    .into_iter()
                    .nth(index)
                    .with_context(|| format!("No candidate at position {}", index + 1))?;
                return Ok(Resolution::Resolved(candidate));
            }
            Choice::Search(text) => {
                query = Query::parse(&text);
                debug!(query = %query, "searching with user criteria");
            }
            Choice::Skip => return Ok(Resolution::Skipped),
            Choice::Abort => return Ok(Resolution::Aborted),
        }
    }
}
