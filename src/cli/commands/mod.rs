//! CLI command implementations.

mod ask;
mod config;
mod doctor;
mod prompt;
mod questions;
mod random;
mod tools;

pub use ask::run_ask;
pub use config::run_config;
pub use doctor::run_doctor;
pub use prompt::run_prompt;
pub use questions::run_questions;
pub use random::run_random;
pub use tools::run_tools;
