//! CLI command implementations.

mod doctor;
mod qa;
mod stop;

pub use doctor::execute_doctor_command;
pub use qa::execute_run_command;
pub use stop::execute_stop_command;
#[cfg(test)]
pub use stop::stop_port;
