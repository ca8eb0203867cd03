//! tuner-dvr
//!
//! A DVR service for network TV tuners: schedules unattended captures
//! against the tuner's channel lineup and serves the resulting files to
//! media players, including partial-content delivery for seeking.
//!
//! The moving parts share only the [`database::Database`]: the
//! [`scheduler`] polls it once a minute and claims due recordings with a
//! compare-and-set status update, each claim spawns a detached
//! [`capture`] worker, and the [`web`] layer reads it to answer API and
//! playback requests.

pub mod capture;
pub mod config;
pub mod database;
pub mod errors;
pub mod lineup;
pub mod models;
pub mod scheduler;
pub mod web;
