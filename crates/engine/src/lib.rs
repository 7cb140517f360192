//! gachadiff engine library.
//!
//! Accepts image-generation commands from a Discord bot, admits them into a
//! bounded per-guild queue and runs them one at a time against a Stable
//! Diffusion backend, posting each result back as a follow-up message.
//!
//! ## Structure
//!
//! - `jobs/` - Job variants, their factory and result rendering
//! - `queue/` - Admission control, the serial worker and result dispatch
//! - `use_cases/` - Command intake and the credit economy
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `api/` - HTTP entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod jobs;
pub mod queue;
pub mod use_cases;

pub use app::App;
