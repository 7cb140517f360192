//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Profile and wallet storage (SQLite today)
//! - Image generation (any AUTOMATIC1111-compatible backend)
//! - Result delivery (Discord follow-up webhooks)
//! - Clock/Random (for testing)

mod error;
mod external;
mod repos;
mod testing;

// =============================================================================
// Repository Ports
// =============================================================================
pub use repos::ProfileRepo;

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{Attachment, BackendResponse, ImageGenPort, RenderedMessage, ResultPoster};

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use external::{MockImageGenPort, MockResultPoster};
#[cfg(test)]
pub use repos::MockProfileRepo;
#[cfg(test)]
pub use testing::MockClockPort;

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::{ClockPort, RandomPort};

// =============================================================================
// Error Types
// =============================================================================
pub use error::{ImageGenError, PostError, RepoError, WalletUpdateError};
