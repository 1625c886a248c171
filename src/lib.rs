//! rtsync - ticket mirror and link synchronizer library
//!
//! This library provides the core functionality for the rtsync CLI tool,
//! which talks to the line-oriented REST 1.0 interface of a Request
//! Tracker style ticketing service.
//!
//! # Core Concepts
//!
//! - **Protocol**: responses are plain text records with indented
//!   continuation lines and `--` record breaks, decoded per endpoint shape
//! - **Snapshots**: a ticket's fields, links and description fetched
//!   concurrently and joined into one view
//! - **Link sync**: attach/detach a relation on both tickets, then mirror
//!   the change locally
//! - **Mirror**: a local property store with a process-wide name table
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.rtsync.toml`
//! - `error`: Error types and result aliases
//! - `gateway`: Requests, transports and batched calls
//! - `links`: Relation tables, link planning and the synchronizer
//! - `lock`: File locking and atomic writes
//! - `mirror`: Local mirror and name cache
//! - `output`: Human and JSON output
//! - `profile`: Server and user resolution
//! - `protocol`: Line tokenizer and response decoders
//! - `snapshot`: Ticket snapshot assembly
//! - `storage`: Locked JSON documents on disk

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod links;
pub mod lock;
pub mod mirror;
pub mod output;
pub mod profile;
pub mod protocol;
pub mod snapshot;
pub mod storage;

pub use error::{Error, Result};
