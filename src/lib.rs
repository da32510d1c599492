//! Crawls Teamtailor career pages into a local SQLite store and reports the
//! offers that match a keyword and location filter.

pub mod companies;
pub mod config;
pub mod crawler;
pub mod dashboard;
pub mod filter;
pub mod locations;
pub mod pipeline;
pub mod report;
pub mod store;
