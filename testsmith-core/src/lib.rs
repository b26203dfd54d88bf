#![doc = "testsmith-core: pipeline library for testsmith."]

//! This crate contains the whole test-generation pipeline: resolving a
//! repository identifier from its URL, cloning the repository, cataloguing
//! every Python function with tree-sitter, synthesizing a unit test per
//! function through a chat-completions endpoint, and zipping the results.
//!
//! The HTTP and CLI surfaces live in the `testsmith` binary crate; nothing
//! in here knows about requests or argument parsing.

pub mod archive;
pub mod cleanup;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod repo;
pub mod synthesize;
