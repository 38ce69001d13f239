//! Test harness for xtouch
//!
//! Drives the touch pump against the scripted headless backend, so session
//! and pump behavior can be tested without an X server.
//!
//! # Modules
//!
//! - `headless`: Bridge wrapper with a recording handler
//! - `assertions`: Common test assertions
//! - `fixtures`: Device lists and event builders

pub mod assertions;
pub mod fixtures;
pub mod headless;

pub use headless::{Recording, TestBridge};
