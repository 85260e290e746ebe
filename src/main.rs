use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use reelname::{
    config::{Config, DEFAULT_LANGUAGE, DEFAULT_THRESHOLD},
    fsops::Mode,
    media::collect_sources,
    prompt::InquirePrompter,
    rename::Renamer,
    template::{DEFAULT_MOVIE_TEMPLATE, DEFAULT_SHOW_TEMPLATE},
    tmdb::TmdbClient,
    video::ContentType,
};
use std::path::PathBuf;
use tracing::{debug, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

/// Rename ripped video files using metadata from TMDB
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// TMDB API key or read access token
    #[arg(short = 'k', long, env = "TMDB_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Library root the renamed files are placed under
    #[arg(short, long)]
    output: PathBuf,

    /// Naming template for movies
    #[arg(short, long, default_value = DEFAULT_MOVIE_TEMPLATE)]
    format: String,

    /// Naming template for show episodes
    #[arg(long, default_value = DEFAULT_SHOW_TEMPLATE)]
    show_format: String,

    /// Treat every file as this kind instead of guessing from its name
    #[arg(long, value_enum)]
    kind: Option<ContentType>,

    /// How files are placed at their destination
    #[arg(short, long, value_enum, default_value_t = Mode::Move)]
    mode: Mode,

    /// Print what would happen without touching any file
    #[arg(short, long)]
    dry_run: bool,

    /// Minimum confidence for accepting a single match without asking
    #[arg(short, long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f64,

    /// Ask for a tag such as CD1 or Extended for each file
    #[arg(long)]
    tag: bool,

    /// Ask before each file is placed
    #[arg(long)]
    confirm: bool,

    /// Language for titles returned by TMDB
    #[arg(long, default_value = DEFAULT_LANGUAGE)]
    language: String,

    /// Increase log verbosity
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Video files or directories to process
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<Config> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("TMDB_API_TOKEN").ok())
            .filter(|key| !key.trim().is_empty())
            .context("No API key provided, pass --api-key or set TMDB_API_KEY")?;

        let mut config = Config::new(api_key, self.output)?.with_threshold(self.threshold)?;
        config.language = self.language;
        config.movie_template = self
            .format
            .parse()
            .with_context(|| format!("Invalid movie format {:?}", self.format))?;
        config.show_template = self
            .show_format
            .parse()
            .with_context(|| format!("Invalid show format {:?}", self.show_format))?;
        config.kind = self.kind;
        config.mode = self.mode;
        config.dry_run = self.dry_run;
        config.ask_tag = self.tag;
        config.confirm = self.confirm;
        Ok(config)
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> Result<()> {
    let files = args.files.clone();
    let config = args.into_config()?;
    debug!(output = ?config.output, mode = ?config.mode, dry_run = config.dry_run, "Starting run");

    let sources = collect_sources(&files, config.kind)?;
    let client = TmdbClient::new(config.api_key.clone(), config.language.clone())?;
    let mut prompter = InquirePrompter::new();

    let report = Renamer::new(&config, &client, &mut prompter)
        .run(sources)
        .await?;
    report.print();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    init_tracing(args.verbose);
    run(args).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_args_defaults() {
        let args =
            Args::try_parse_from(["reelname", "-k", "key", "-o", "/library", "rips/"]).unwrap();
        assert_eq!(args.files, vec![PathBuf::from("rips/")]);
        assert_eq!(args.mode, Mode::Move);
        assert_eq!(args.threshold, DEFAULT_THRESHOLD);
        assert_eq!(args.kind, None);
        assert!(!args.dry_run);

        let config = args.into_config().unwrap();
        assert_eq!(config.api_key, "key");
        assert_eq!(config.output, PathBuf::from("/library"));
        assert_eq!(config.movie_template.as_str(), DEFAULT_MOVIE_TEMPLATE);
        assert_eq!(config.language, DEFAULT_LANGUAGE);
    }

    #[test]
    fn test_args_options() {
        let args = Args::try_parse_from([
            "reelname",
            "-k",
            "key",
            "-o",
            "/library",
            "--mode",
            "copy",
            "--kind",
            "show",
            "-d",
            "-t",
            "0.5",
            "--format",
            "{title} [tmdbid-{tmdb_id}].{ext}",
            "--tag",
            "--confirm",
            "a.mkv",
            "b.mkv",
        ])
        .unwrap();

        let config = args.into_config().unwrap();
        assert_eq!(config.mode, Mode::Copy);
        assert_eq!(config.kind, Some(ContentType::Show));
        assert!(config.dry_run);
        assert!(config.ask_tag);
        assert!(config.confirm);
        assert_eq!(config.threshold, 0.5);
        assert_eq!(
            config.movie_template.as_str(),
            "{title} [tmdbid-{tmdb_id}].{ext}"
        );
    }

    #[test]
    fn test_args_require_files() {
        assert!(Args::try_parse_from(["reelname", "-k", "key", "-o", "/library"]).is_err());
    }

    #[test]
    fn test_invalid_config() {
        let args = Args::try_parse_from([
            "reelname", "-k", "key", "-o", "/library", "-t", "2", "a.mkv",
        ])
        .unwrap();
        assert!(args.into_config().is_err());

        let args = Args::try_parse_from([
            "reelname", "-k", "key", "-o", "/library", "-f", "{nope}.{ext}", "a.mkv",
        ])
        .unwrap();
        assert!(args.into_config().is_err());
    }
}
