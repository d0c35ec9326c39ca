pub mod config;
pub mod coordinator;
pub mod export;
pub mod report;
pub mod stats;
