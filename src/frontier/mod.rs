pub mod priority;
pub mod queue;
