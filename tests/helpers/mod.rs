//! Shared fixtures and assertions for integration tests.

#![allow(dead_code)]

pub mod assertions;
pub mod grammars;
pub mod source_fixtures;
