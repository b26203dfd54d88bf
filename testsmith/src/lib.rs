#![doc = "testsmith: CLI and HTTP surface over testsmith-core."]

//! All pipeline logic lives in [`testsmith_core`]; this crate only parses
//! arguments, loads the environment, and exposes the HTTP endpoints.

pub mod cli;
pub mod server;
