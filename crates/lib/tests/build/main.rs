//! End-to-end tests of the build engine against scratch projects.

mod common;
mod run_tests;
mod watch_tests;
