//! # SocialGraph Application Library
//!
//! Everything around the store: the HTTP API, the CLI, layered
//! configuration, credential hashing and the bulk loaders. The binary in
//! `main.rs` is a thin wrapper over [`cli::execute`].

pub mod api;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod loaders;
