pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod form;
pub mod logging;
pub mod markdown;
pub mod output;
pub mod prompt;
pub mod session;
