//! SQLite-backed character and wallet storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gachadiff_domain::{CharacterProfile, GuildId, UserId, Wallet};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::sync::Arc;

use crate::infrastructure::ports::{ClockPort, ProfileRepo, RepoError, WalletUpdateError};

pub struct SqliteProfileRepo {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
}

impl SqliteProfileRepo {
    pub async fn new(db_path: &str, clock: Arc<dyn ClockPort>) -> Result<Self, RepoError> {
        let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", db_path))
            .await
            .map_err(|e| RepoError::database("open", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                guild_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                profile_json TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (guild_id, user_id)
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| RepoError::database("create_profiles", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS wallets (
                guild_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                credits INTEGER NOT NULL,
                last_daily TEXT,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (guild_id, user_id)
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| RepoError::database("create_wallets", e))?;

        Ok(Self { pool, clock })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepoError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| RepoError::serialization(format!("bad timestamp '{raw}': {e}")))
}

fn wallet_from_row(
    guild_id: GuildId,
    user_id: UserId,
    row: &SqliteRow,
) -> Result<Wallet, RepoError> {
    let last_daily: Option<String> = row.get("last_daily");
    Ok(Wallet {
        guild_id,
        user_id,
        credits: row.get("credits"),
        last_daily: last_daily.as_deref().map(parse_timestamp).transpose()?,
    })
}

impl SqliteProfileRepo {
    /// Open a transaction holding the write lock and load the member's wallet.
    ///
    /// The first statement is a write, so SQLite takes the write lock before
    /// the balance is read and concurrent wallet updates queue behind it.
    async fn begin_wallet_update(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<(Transaction<'static, Sqlite>, Wallet), RepoError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::database("begin", e))?;

        sqlx::query(
            r#"
            INSERT INTO wallets (guild_id, user_id, credits, last_daily, updated_at)
            VALUES (?, ?, 0, NULL, ?)
            ON CONFLICT(guild_id, user_id) DO NOTHING
            "#,
        )
        .bind(guild_id.to_string())
        .bind(user_id.to_string())
        .bind(self.clock.now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::database("lock_wallet", e))?;

        let row = sqlx::query(
            "SELECT credits, last_daily FROM wallets WHERE guild_id = ? AND user_id = ?",
        )
        .bind(guild_id.to_string())
        .bind(user_id.to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepoError::database("read_wallet", e))?;

        let wallet = wallet_from_row(guild_id, user_id, &row)?;
        Ok((tx, wallet))
    }

    async fn write_wallet(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        wallet: &Wallet,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            UPDATE wallets SET credits = ?, last_daily = ?, updated_at = ?
            WHERE guild_id = ? AND user_id = ?
            "#,
        )
        .bind(wallet.credits)
        .bind(wallet.last_daily.map(|t| t.to_rfc3339()))
        .bind(self.clock.now().to_rfc3339())
        .bind(wallet.guild_id.to_string())
        .bind(wallet.user_id.to_string())
        .execute(&mut **tx)
        .await
        .map_err(|e| RepoError::database("write_wallet", e))?;
        Ok(())
    }
}

#[async_trait]
impl ProfileRepo for SqliteProfileRepo {
    async fn get_profile(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<Option<CharacterProfile>, RepoError> {
        let row = sqlx::query(
            "SELECT profile_json FROM profiles WHERE guild_id = ? AND user_id = ?",
        )
        .bind(guild_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("get_profile", e))?;

        match row {
            Some(row) => {
                let json: String = row.get("profile_json");
                let profile = serde_json::from_str(&json).map_err(RepoError::serialization)?;
                Ok(Some(profile))
            }
            None => Ok(None),
        }
    }

    async fn get_wallet(&self, guild_id: GuildId, user_id: UserId) -> Result<Wallet, RepoError> {
        let row = sqlx::query(
            "SELECT credits, last_daily FROM wallets WHERE guild_id = ? AND user_id = ?",
        )
        .bind(guild_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("get_wallet", e))?;

        match row {
            Some(row) => wallet_from_row(guild_id, user_id, &row),
            None => Ok(Wallet::empty(guild_id, user_id)),
        }
    }

    async fn claim_daily(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Wallet, WalletUpdateError> {
        let (mut tx, mut wallet) = self.begin_wallet_update(guild_id, user_id).await?;
        // Dropping the transaction rolls it back
        wallet.claim_daily(now)?;
        self.write_wallet(&mut tx, &wallet).await?;

        tx.commit()
            .await
            .map_err(|e| RepoError::database("claim_daily", e))?;
        Ok(wallet)
    }

    async fn save_rolled_profile(
        &self,
        profile: &CharacterProfile,
        cost: i64,
    ) -> Result<Wallet, WalletUpdateError> {
        let json = serde_json::to_string(profile).map_err(RepoError::serialization)?;

        let (mut tx, mut wallet) = self
            .begin_wallet_update(profile.guild_id, profile.user_id)
            .await?;
        wallet.spend(cost)?;
        self.write_wallet(&mut tx, &wallet).await?;

        sqlx::query(
            r#"
            INSERT INTO profiles (guild_id, user_id, profile_json, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(guild_id, user_id) DO UPDATE SET
                profile_json = excluded.profile_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(profile.guild_id.to_string())
        .bind(profile.user_id.to_string())
        .bind(json)
        .bind(self.clock.now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::database("save_profile", e))?;

        tx.commit()
            .await
            .map_err(|e| RepoError::database("save_rolled_profile", e))?;
        Ok(wallet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use chrono::{Duration, TimeZone};
    use futures_util::future::join_all;
    use gachadiff_domain::{DomainError, DAILY_CREDITS, ROLL_COST};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 5, 6, 7, 8).unwrap()
    }

    fn yesterday() -> DateTime<Utc> {
        now() - Duration::days(1)
    }

    async fn repo(dir: &tempfile::TempDir) -> SqliteProfileRepo {
        let path = dir.path().join("gacha.db");
        SqliteProfileRepo::new(path.to_str().unwrap(), Arc::new(FixedClock(now())))
            .await
            .unwrap()
    }

    fn rolled(guild: u64, user: u64, pick_max: bool) -> CharacterProfile {
        CharacterProfile::roll(GuildId::new(guild), UserId::new(user), now(), move |min, max| {
            if pick_max {
                max
            } else {
                min
            }
        })
    }

    #[tokio::test]
    async fn missing_wallet_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir).await;

        let wallet = repo.get_wallet(GuildId::new(1), UserId::new(2)).await.unwrap();
        assert_eq!(wallet, Wallet::empty(GuildId::new(1), UserId::new(2)));
    }

    #[tokio::test]
    async fn daily_claim_is_stored_once_per_day() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir).await;
        let (guild, user) = (GuildId::new(1), UserId::new(2));

        let wallet = repo.claim_daily(guild, user, now()).await.unwrap();
        assert_eq!(wallet.credits, DAILY_CREDITS);

        let err = repo.claim_daily(guild, user, now()).await.unwrap_err();
        assert!(matches!(
            err,
            WalletUpdateError::Rejected(DomainError::DailyAlreadyClaimed { .. })
        ));

        let stored = repo.get_wallet(guild, user).await.unwrap();
        assert_eq!(stored.credits, DAILY_CREDITS);
        assert_eq!(stored.last_daily, Some(now()));
    }

    #[tokio::test]
    async fn roll_charges_and_replaces_previous_profile() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir).await;
        let (guild, user) = (GuildId::new(7), UserId::new(8));
        repo.claim_daily(guild, user, now()).await.unwrap();

        assert!(repo.get_profile(guild, user).await.unwrap().is_none());

        let wallet = repo
            .save_rolled_profile(&rolled(7, 8, false), ROLL_COST)
            .await
            .unwrap();
        assert_eq!(wallet.credits, DAILY_CREDITS - ROLL_COST);

        let second = rolled(7, 8, true);
        repo.save_rolled_profile(&second, ROLL_COST).await.unwrap();

        assert_eq!(repo.get_profile(guild, user).await.unwrap(), Some(second));
        assert_eq!(
            repo.get_wallet(guild, user).await.unwrap().credits,
            DAILY_CREDITS - 2 * ROLL_COST
        );
    }

    #[tokio::test]
    async fn unaffordable_roll_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir).await;
        let (guild, user) = (GuildId::new(7), UserId::new(8));

        let err = repo
            .save_rolled_profile(&rolled(7, 8, false), ROLL_COST)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WalletUpdateError::Rejected(DomainError::InsufficientCredits { have: 0, .. })
        ));

        assert!(repo.get_profile(guild, user).await.unwrap().is_none());
        assert_eq!(repo.get_wallet(guild, user).await.unwrap().credits, 0);
    }

    #[tokio::test]
    async fn concurrent_roll_and_daily_claim_both_apply() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(repo(&dir).await);
        let members: Vec<u64> = (1..=8).collect();

        // Each wallet holds exactly one roll's worth, daily taken yesterday
        for &user in &members {
            let user_id = UserId::new(user);
            repo.claim_daily(GuildId::new(1), user_id, yesterday()).await.unwrap();
            repo.save_rolled_profile(&rolled(1, user, false), DAILY_CREDITS - ROLL_COST)
                .await
                .unwrap();
            let wallet = repo.get_wallet(GuildId::new(1), user_id).await.unwrap();
            assert_eq!(wallet.credits, ROLL_COST);
        }

        let races = members.iter().map(|&user| {
            let repo = repo.clone();
            async move {
                let roll = rolled(1, user, true);
                let (rolled, claimed) = tokio::join!(
                    repo.save_rolled_profile(&roll, ROLL_COST),
                    repo.claim_daily(GuildId::new(1), UserId::new(user), now()),
                );
                rolled.unwrap();
                claimed.unwrap();
            }
        });
        join_all(races).await;

        for &user in &members {
            let wallet = repo.get_wallet(GuildId::new(1), UserId::new(user)).await.unwrap();
            assert_eq!(wallet.credits, DAILY_CREDITS, "member {user}");
            assert_eq!(wallet.last_daily, Some(now()));
        }
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let (guild, user) = (GuildId::new(3), UserId::new(4));
        let profile = rolled(3, 4, false);

        {
            let repo = repo(&dir).await;
            repo.claim_daily(guild, user, now()).await.unwrap();
            repo.save_rolled_profile(&profile, ROLL_COST).await.unwrap();
        }

        let reopened = repo(&dir).await;
        assert_eq!(reopened.get_profile(guild, user).await.unwrap(), Some(profile));
        assert_eq!(
            reopened.get_wallet(guild, user).await.unwrap().credits,
            DAILY_CREDITS - ROLL_COST
        );
    }

    #[tokio::test]
    async fn profiles_are_scoped_per_guild() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir).await;
        let user = UserId::new(4);

        repo.claim_daily(GuildId::new(1), user, now()).await.unwrap();
        repo.save_rolled_profile(&rolled(1, 4, false), ROLL_COST)
            .await
            .unwrap();

        assert!(repo.get_profile(GuildId::new(2), user).await.unwrap().is_none());
        assert_eq!(repo.get_wallet(GuildId::new(2), user).await.unwrap().credits, 0);
    }
}
