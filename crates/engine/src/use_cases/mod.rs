//! Use cases - User story orchestration.
//!
//! Command intake feeds the work queue; economy use cases talk to storage
//! directly and never touch the queue.

pub mod commands;
pub mod economy;

pub use commands::SubmitCommand;
pub use economy::{ClaimDaily, DailyClaim, EconomyError, EconomyUseCases, GetBalance};
