//! SpytoRec - record the currently playing Spotify track
//!
//! This crate polls the Spotify Web API for the current track, captures the
//! system audio device with FFmpeg for the length of the track, and finalizes
//! each capture in the background: header rewrite, tags and cover art, and an
//! entry in a JSON-lines ledger so a track is never recorded twice.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Track snapshots, filename rules, recording state, config values
//! - **Application**: Poll loop, capture sessions, finalization queue and ports
//! - **Infrastructure**: Adapters (Spotify, FFmpeg, lofty, reqwest, JSONL ledger)
//! - **CLI**: Argument parsing, presenter, signal handling and the record runner

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
