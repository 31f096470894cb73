//! `pricewatch` library crate.
//!
//! Pulls food inflation rates and product prices from a warehouse (or falls
//! back to seeded sample data), scores their quality, filters them, and
//! aligns price movements with inflation per country, category and month.
//!
//! The binary (`pricewatch`) is a thin wrapper around this library so the
//! pipeline is testable without spawning processes.

pub mod aggregate;
pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod filter;
pub mod io;
pub mod quality;
pub mod report;
