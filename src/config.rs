use anyhow::{Result, bail};
use std::path::PathBuf;

use crate::{
    fsops::Mode,
    template::{DEFAULT_MOVIE_TEMPLATE, DEFAULT_SHOW_TEMPLATE, NamingTemplate},
    video::ContentType,
};

pub const DEFAULT_THRESHOLD: f64 = 0.85;
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Everything a run needs, resolved from the command line and environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub language: String,
    pub output: PathBuf,
    pub movie_template: NamingTemplate,
    pub show_template: NamingTemplate,
    /// Forces every file to this kind instead of guessing from its name.
    pub kind: Option<ContentType>,
    pub mode: Mode,
    pub dry_run: bool,
    /// Minimum confidence for accepting a lone candidate without asking.
    pub threshold: f64,
    pub ask_tag: bool,
    pub confirm: bool,
}

impl Config {
    /// A config with default templates and behavior, writing into `output`.
    pub fn new(api_key: impl Into<String>, output: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            language: DEFAULT_LANGUAGE.to_string(),
            output: output.into(),
            movie_template: DEFAULT_MOVIE_TEMPLATE.parse()?,
            show_template: DEFAULT_SHOW_TEMPLATE.parse()?,
            kind: None,
            mode: Mode::default(),
            dry_run: false,
            threshold: DEFAULT_THRESHOLD,
            ask_tag: false,
            confirm: false,
        })
    }

    pub fn with_threshold(mut self, threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            bail!("Threshold must be between 0 and 1, got {}", threshold);
        }
        self.threshold = threshold;
        Ok(self)
    }

    pub fn template(&self, kind: ContentType) -> &NamingTemplate {
        match kind {
            ContentType::Movie => &self.movie_template,
            ContentType::Show => &self.show_template,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new("key", "/library").unwrap();
        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
        assert_eq!(config.mode, Mode::Move);
        assert_eq!(
            config.template(ContentType::Movie).as_str(),
            DEFAULT_MOVIE_TEMPLATE
        );
        assert_eq!(
            config.template(ContentType::Show).as_str(),
            DEFAULT_SHOW_TEMPLATE
        );
    }

    #[test]
    fn test_threshold_bounds() {
        let config = Config::new("key", "/library").unwrap();
        assert!(config.clone().with_threshold(1.5).is_err());
        assert!(config.clone().with_threshold(-0.1).is_err());
        assert_eq!(config.with_threshold(0.5).unwrap().threshold, 0.5);
    }
}
