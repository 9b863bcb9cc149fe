pub mod config;
pub mod engine;
pub mod outcome;
pub mod report;
pub mod session;
pub mod state;
pub mod strategy;
