//! Per-guild credit balance and daily reward tracking.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::{GuildId, UserId};

/// Credits granted by the daily reward.
pub const DAILY_CREDITS: i64 = 100;

/// Cost of rolling a new character.
pub const ROLL_COST: i64 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub credits: i64,
    pub last_daily: Option<DateTime<Utc>>,
}

impl Wallet {
    /// A wallet that has never been touched.
    pub fn empty(guild_id: GuildId, user_id: UserId) -> Self {
        Self {
            guild_id,
            user_id,
            credits: 0,
            last_daily: None,
        }
    }

    /// Start of the reset window after `now` (next 00:00 UTC).
    pub fn next_reset(now: DateTime<Utc>) -> DateTime<Utc> {
        let tomorrow = now.date_naive() + Duration::days(1);
        tomorrow.and_time(NaiveTime::MIN).and_utc()
    }

    pub fn can_claim_daily(&self, now: DateTime<Utc>) -> bool {
        match self.last_daily {
            None => true,
            Some(last) => last.date_naive() < now.date_naive(),
        }
    }

    /// Grant the daily reward once per UTC day. Returns the new balance.
    pub fn claim_daily(&mut self, now: DateTime<Utc>) -> Result<i64, DomainError> {
        if !self.can_claim_daily(now) {
            return Err(DomainError::DailyAlreadyClaimed {
                next_reset: Self::next_reset(now),
            });
        }
        self.credits += DAILY_CREDITS;
        self.last_daily = Some(now);
        Ok(self.credits)
    }

    pub fn can_afford(&self, cost: i64) -> bool {
        self.credits >= cost
    }

    /// Deduct `cost`, refusing to go negative. Returns the new balance.
    pub fn spend(&mut self, cost: i64) -> Result<i64, DomainError> {
        if cost < 0 {
            return Err(DomainError::validation("cost cannot be negative"));
        }
        if !self.can_afford(cost) {
            return Err(DomainError::insufficient_credits(self.credits, cost));
        }
        self.credits -= cost;
        Ok(self.credits)
    }
}
