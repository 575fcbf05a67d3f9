// src/lib.rs

//! # Funscript Sync
//!
//! Drives a motion device in step with video playback from a funscript.
//!
//! - Funscript parsing and validation
//! - A latency-compensated sync engine with drift correction
//! - Device control through an Intiface (buttplug) server
//! - A small HTTP/WebSocket host for the video player
//!
//! ## Architecture
//!
//! - `funscript`: script loading and validation
//! - `sync`: the sync engine, speed model and drift corrector
//! - `device`: the device command interface and its Intiface implementation
//! - `routes`, `handlers`, `sync_socket`: the web host
//! - `config`, `error`: settings and error types

pub mod config;
pub mod error;
pub mod funscript;
pub mod sync;
pub mod device;

pub mod routes;
pub mod handlers {
    pub mod playback;
    pub mod types;
}

pub mod sync_socket;
