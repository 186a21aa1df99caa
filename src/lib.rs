pub mod catalog;
pub mod cli;
pub mod common;
pub mod config;
pub mod downloader;
#[cfg(feature = "http")]
pub mod server;
pub mod tagger;
pub mod task;
