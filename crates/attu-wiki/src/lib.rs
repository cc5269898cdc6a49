//! `MediaWiki` client for the Attu year keeper.
//!
//! Implements [`attu_core::platform::WikiClient`] against the `MediaWiki`
//! Action API (`api.php`). The session lives in the HTTP client's cookie
//! jar, so a single [`MediaWikiClient`] stays logged in across calls.
//!
//! # Modules
//!
//! - [`client`] -- [`MediaWikiClient`] and response decoding.
//!
//! [`MediaWikiClient`]: client::MediaWikiClient

pub mod client;

pub use client::{DEFAULT_API_ENDPOINT, MediaWikiClient};
