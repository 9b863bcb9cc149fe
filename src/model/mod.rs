pub mod identity;
pub mod screen_model;
