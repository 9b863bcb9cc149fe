pub mod blocker;
pub mod nav_graph;
