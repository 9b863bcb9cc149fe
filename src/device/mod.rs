pub mod actuator;
pub mod clock;
pub mod error;
pub mod provider;
pub mod sim;
pub mod status;
