pub mod cli;
pub mod coverage;
pub mod device;
pub mod frontier;
pub mod graph;
pub mod lifecycle;
pub mod model;
pub mod orchestrator;
pub mod policy;
pub mod recovery;
pub mod trace;
