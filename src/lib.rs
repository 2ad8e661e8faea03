pub mod cli;
pub mod event;
pub mod load_config;
pub mod logging;
pub mod s3;

pub use cli::{run, Cli, Commands};
