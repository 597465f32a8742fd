mod build;
mod clean;
mod configs;
mod watch;

pub use build::cmd_build;
pub use clean::cmd_clean;
pub use watch::cmd_watch;
