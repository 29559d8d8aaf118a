//! packup: keep a game data directory in sync with the latest published
//! release archive.
//!
//! - [`release`] queries the release feed
//! - [`pipeline`] runs one download/extract/overlay attempt in the background
//! - [`session`] guards against more than one attempt at a time
//! - [`version`] reads and writes the installed version marker

pub mod cli;
pub mod config;
pub mod download;
pub mod overlay;
pub mod pipeline;
pub mod platform;
pub mod release;
pub mod session;
pub mod source;
pub mod types;
pub mod version;
