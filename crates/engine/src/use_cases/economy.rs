//! Economy use cases: daily reward and balance.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gachadiff_domain::{DomainError, GuildId, UserId, Wallet, DAILY_CREDITS};
use serde::Serialize;

use crate::infrastructure::ports::{ClockPort, ProfileRepo, RepoError, WalletUpdateError};

#[derive(Debug, thiserror::Error)]
pub enum EconomyError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<WalletUpdateError> for EconomyError {
    fn from(e: WalletUpdateError) -> Self {
        match e {
            WalletUpdateError::Rejected(e) => Self::Domain(e),
            WalletUpdateError::Repo(e) => Self::Repo(e),
        }
    }
}

/// Result of a successful daily claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyClaim {
    pub granted: i64,
    pub balance: i64,
    pub next_reset: DateTime<Utc>,
}

/// Grant the once-per-UTC-day reward.
pub struct ClaimDaily {
    repo: Arc<dyn ProfileRepo>,
    clock: Arc<dyn ClockPort>,
}

impl ClaimDaily {
    pub fn new(repo: Arc<dyn ProfileRepo>, clock: Arc<dyn ClockPort>) -> Self {
        Self { repo, clock }
    }

    pub async fn execute(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<DailyClaim, EconomyError> {
        let now = self.clock.now();
        let wallet = self.repo.claim_daily(guild_id, user_id, now).await?;

        tracing::info!(
            guild_id = %guild_id,
            user_id = %user_id,
            balance = wallet.credits,
            "Daily reward claimed"
        );

        Ok(DailyClaim {
            granted: DAILY_CREDITS,
            balance: wallet.credits,
            next_reset: Wallet::next_reset(now),
        })
    }
}

pub struct GetBalance {
    repo: Arc<dyn ProfileRepo>,
}

impl GetBalance {
    pub fn new(repo: Arc<dyn ProfileRepo>) -> Self {
        Self { repo }
    }

    pub async fn execute(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<Wallet, EconomyError> {
        Ok(self.repo.get_wallet(guild_id, user_id).await?)
    }
}

/// Container for economy use cases.
pub struct EconomyUseCases {
    pub claim_daily: ClaimDaily,
    pub balance: GetBalance,
}

impl EconomyUseCases {
    pub fn new(repo: Arc<dyn ProfileRepo>, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            claim_daily: ClaimDaily::new(repo.clone(), clock),
            balance: GetBalance::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{MockClockPort, MockProfileRepo};
    use chrono::TimeZone;

    fn clock_at(now: DateTime<Utc>) -> Arc<MockClockPort> {
        let mut clock = MockClockPort::new();
        clock.expect_now().returning(move || now);
        Arc::new(clock)
    }

    #[tokio::test]
    async fn first_claim_grants_credits() {
        let now = Utc.with_ymd_and_hms(2025, 5, 5, 15, 0, 0).unwrap();

        let mut repo = MockProfileRepo::new();
        repo.expect_claim_daily()
            .withf(move |_, _, at| *at == now)
            .times(1)
            .returning(|guild, user, at| {
                let mut wallet = Wallet::empty(guild, user);
                wallet.claim_daily(at)?;
                Ok(wallet)
            });

        let use_case = ClaimDaily::new(Arc::new(repo), clock_at(now));
        let claim = use_case
            .execute(GuildId::new(1), UserId::new(2))
            .await
            .unwrap();

        assert_eq!(claim.granted, DAILY_CREDITS);
        assert_eq!(claim.balance, DAILY_CREDITS);
        assert_eq!(
            claim.next_reset,
            Utc.with_ymd_and_hms(2025, 5, 6, 0, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn refused_claim_is_a_domain_error() {
        let now = Utc.with_ymd_and_hms(2025, 5, 5, 23, 0, 0).unwrap();

        let mut repo = MockProfileRepo::new();
        repo.expect_claim_daily().returning(|_, _, at| {
            Err(DomainError::DailyAlreadyClaimed {
                next_reset: Wallet::next_reset(at),
            }
            .into())
        });

        let use_case = ClaimDaily::new(Arc::new(repo), clock_at(now));
        let err = use_case
            .execute(GuildId::new(1), UserId::new(2))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EconomyError::Domain(DomainError::DailyAlreadyClaimed { .. })
        ));
    }

    #[tokio::test]
    async fn storage_failure_is_a_repo_error() {
        let mut repo = MockProfileRepo::new();
        repo.expect_claim_daily().returning(|_, _, _| {
            Err(RepoError::database("claim_daily", "database is locked").into())
        });

        let use_case = ClaimDaily::new(Arc::new(repo), clock_at(Utc::now()));
        let err = use_case
            .execute(GuildId::new(1), UserId::new(2))
            .await
            .unwrap_err();

        assert!(matches!(err, EconomyError::Repo(_)));
    }

    #[tokio::test]
    async fn balance_reads_wallet() {
        let mut repo = MockProfileRepo::new();
        repo.expect_get_wallet().returning(|guild, user| {
            let mut wallet = Wallet::empty(guild, user);
            wallet.credits = 75;
            Ok(wallet)
        });

        let wallet = GetBalance::new(Arc::new(repo))
            .execute(GuildId::new(1), UserId::new(2))
            .await
            .unwrap();
        assert_eq!(wallet.credits, 75);
    }
}
