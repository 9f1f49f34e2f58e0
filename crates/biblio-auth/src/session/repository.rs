//! Session record persistence over the key-value store.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Timelike, Utc};
use uuid::Uuid;

use biblio_cache::{StoreManager, keys};
use biblio_core::AppResult;
use biblio_core::config::session::SessionConfig;
use biblio_core::traits::kv::KvStore;
use biblio_entity::session::SessionRecord;

/// Thin CRUD over session records and the per-user session index.
///
/// No policy lives here; the Issuer, Verifier, and Revocation Manager own
/// all decisions.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    /// Key-value store handle.
    store: Arc<StoreManager>,
    /// Session configuration.
    config: SessionConfig,
}

impl SessionRepository {
    /// Creates a new session repository.
    pub fn new(store: Arc<StoreManager>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    /// The next occurrence of the configured daily cutoff.
    pub fn next_cutoff(&self) -> DateTime<Utc> {
        next_daily_cutoff(self.config.daily_cutoff_hour, Utc::now())
    }

    /// Writes a session record with its physical TTL matched to the
    /// record's logical expiry, so the store drops it no later than
    /// `expires_at` even without the sweep.
    pub async fn put(&self, record: &SessionRecord) -> AppResult<()> {
        let key = keys::session_by_id(record.id);
        self.store
            .set_json(&key, record, ttl_until(record.expires_at))
            .await
    }

    /// Finds a session record by ID.
    pub async fn get(&self, session_id: Uuid) -> AppResult<Option<SessionRecord>> {
        self.store.get_json(&keys::session_by_id(session_id)).await
    }

    /// Deletes a session record.
    pub async fn delete(&self, session_id: Uuid) -> AppResult<()> {
        self.store.delete(&keys::session_by_id(session_id)).await
    }

    /// Adds a session id to the owning user's index set.
    pub async fn add_to_user_index(&self, user_id: Uuid, session_id: Uuid) -> AppResult<()> {
        self.store
            .set_add(&keys::user_sessions(user_id), &session_id.to_string())
            .await?;
        Ok(())
    }

    /// Removes a session id from the owning user's index set.
    pub async fn remove_from_user_index(&self, user_id: Uuid, session_id: Uuid) -> AppResult<()> {
        self.store
            .set_remove(&keys::user_sessions(user_id), &session_id.to_string())
            .await?;
        Ok(())
    }

    /// Lists every session id currently indexed for a user.
    pub async fn list_ids_for_user(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let members = self.store.set_members(&keys::user_sessions(user_id)).await?;
        Ok(members.iter().filter_map(|m| m.parse().ok()).collect())
    }

    /// Deletes a user's entire session index key.
    pub async fn delete_user_index(&self, user_id: Uuid) -> AppResult<()> {
        self.store.delete(&keys::user_sessions(user_id)).await
    }

    /// Bumps `last_used_at` on a session record, leaving everything else
    /// untouched. A missing record is not an error; the session already
    /// expired or was deleted.
    pub async fn touch(&self, session_id: Uuid) -> AppResult<()> {
        if let Some(mut record) = self.get(session_id).await? {
            record.last_used_at = Utc::now();
            self.put(&record).await?;
        }
        Ok(())
    }
}

/// The next occurrence of the daily cutoff hour (UTC) strictly after `now`.
///
/// Every session is designed to expire at this wall-clock hour; TTLs for
/// session records and revocation markers are the seconds until it.
pub fn next_daily_cutoff(hour: u32, now: DateTime<Utc>) -> DateTime<Utc> {
    let candidate = now
        .with_hour(hour)
        .and_then(|t| t.with_minute(0))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);

    if candidate > now {
        candidate
    } else {
        candidate + Duration::days(1)
    }
}

/// Seconds until an instant, floored at one second so writes carry a
/// strictly positive TTL.
pub fn ttl_until(instant: DateTime<Utc>) -> StdDuration {
    let secs = (instant - Utc::now()).num_seconds().max(1);
    StdDuration::from_secs(secs as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cutoff_later_today() {
        let now = Utc.with_ymd_and_hms(2026, 8, 23, 1, 30, 0).unwrap();
        let cutoff = next_daily_cutoff(3, now);
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2026, 8, 23, 3, 0, 0).unwrap());
    }

    #[test]
    fn test_cutoff_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2026, 8, 23, 15, 0, 0).unwrap();
        let cutoff = next_daily_cutoff(3, now);
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2026, 8, 24, 3, 0, 0).unwrap());
    }

    #[test]
    fn test_cutoff_exact_hour_rolls_forward() {
        let now = Utc.with_ymd_and_hms(2026, 8, 23, 3, 0, 0).unwrap();
        let cutoff = next_daily_cutoff(3, now);
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2026, 8, 24, 3, 0, 0).unwrap());
    }

    #[test]
    fn test_ttl_floor() {
        let past = Utc::now() - Duration::hours(1);
        assert_eq!(ttl_until(past), StdDuration::from_secs(1));
    }
}
