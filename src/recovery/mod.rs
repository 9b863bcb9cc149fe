pub mod ladder;
pub mod stuck;
