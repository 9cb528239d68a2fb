pub mod club_resolver;
pub mod config;
pub mod error;
pub mod features;
pub mod ingest;
pub mod keys;
pub mod lineup_resolver;
pub mod queries;
pub mod raw_reader;
pub mod schema;
pub mod season;
