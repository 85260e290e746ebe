pub mod config;
pub mod fsops;
pub mod media;
pub mod prompt;
pub mod rename;
pub mod report;
pub mod resolve;
pub mod template;
pub mod tmdb;
pub mod video;

#[cfg(test)]
mod testing;
