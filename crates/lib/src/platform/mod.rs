//! Filesystem locations.

pub mod paths;
