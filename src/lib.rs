//! AnoBBS API client core.
//!
//! Request orchestration for an anonymous-forum web API: per-request
//! login decisions (including the server's "gatekeeper page" quirk),
//! bounded retries with cumulative bandwidth accounting, and typed
//! interpretation of both the structured read payloads and the
//! unstructured write confirmations.

// Allow raw string hashes for safety - they're harmless and prevent issues if content changes
#![allow(clippy::needless_raw_string_hashes)]

pub mod bandwidth;
pub mod client;
pub mod confirmation;
pub mod error;
pub mod executor;
pub mod gatekeeper;
pub mod models;
pub mod options;

pub use bandwidth::BandwidthUsage;
pub use client::{Client, ClientConfig, ReplyRequest};
pub use error::ClientError;
pub use models::{Board, Post, RawRecord, RepliesState, Thread};
pub use options::{LoginPolicy, RequestOptions, UserCookie};
