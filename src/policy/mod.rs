pub mod action_key;
pub mod qtable;
pub mod reward;
pub mod store;
