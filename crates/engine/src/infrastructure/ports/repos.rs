//! Repository port traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gachadiff_domain::{CharacterProfile, GuildId, UserId, Wallet};

use super::error::{RepoError, WalletUpdateError};

/// Storage for rolled characters and wallets.
///
/// Wallet changes go through operations that read, check and write the
/// balance in one storage transaction; there is no blind wallet overwrite.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepo: Send + Sync {
    async fn get_profile(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<Option<CharacterProfile>, RepoError>;

    /// Returns an empty wallet when the member has none yet.
    async fn get_wallet(&self, guild_id: GuildId, user_id: UserId) -> Result<Wallet, RepoError>;

    /// Grant the daily reward if it is still available at `now`.
    async fn claim_daily(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Wallet, WalletUpdateError>;

    /// Charge `cost` and replace the member's character together.
    ///
    /// Nothing is written when the wallet cannot cover the cost.
    async fn save_rolled_profile(
        &self,
        profile: &CharacterProfile,
        cost: i64,
    ) -> Result<Wallet, WalletUpdateError>;
}
