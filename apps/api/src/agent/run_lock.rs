//! Per-thread run lock in Redis: at most one agent run per thread at a time.
//!
//! The lock is a `SET NX PX` key holding a random token; release deletes the
//! key only if it still holds our token, so an expired-then-reacquired lock
//! is never released by the wrong run.

use std::time::Duration;

use redis::{Client, RedisError, Script};
use tracing::{debug, warn};
use uuid::Uuid;

/// Upper bound on a run; the lock expires on its own if a run dies.
pub const RUN_LOCK_TTL: Duration = Duration::from_secs(600);

const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

pub fn lock_key(thread_id: Uuid) -> String {
    format!("agent:thread:{thread_id}:run")
}

#[derive(Debug)]
pub struct RunLock {
    key: String,
    token: String,
}

impl RunLock {
    /// Tries to take the lock. `Ok(None)` means another run holds it.
    pub async fn acquire(redis: &Client, thread_id: Uuid) -> Result<Option<Self>, RedisError> {
        let key = lock_key(thread_id);
        let token = Uuid::new_v4().to_string();
        let mut conn = redis.get_multiplexed_async_connection().await?;

        let reply: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(&token)
            .arg("NX")
            .arg("PX")
            .arg(RUN_LOCK_TTL.as_millis() as u64)
            .query_async(&mut conn)
            .await?;

        if reply.is_none() {
            debug!("Run lock {key} is held by another run");
            return Ok(None);
        }

        debug!("Acquired run lock {key}");
        Ok(Some(Self { key, token }))
    }

    /// Releases the lock. Returns false if it had already expired or changed hands.
    pub async fn release(self, redis: &Client) -> Result<bool, RedisError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;

        let deleted: i32 = Script::new(RELEASE_SCRIPT)
            .key(&self.key)
            .arg(&self.token)
            .invoke_async(&mut conn)
            .await?;

        if deleted == 0 {
            warn!("Run lock {} expired before release", self.key);
        }
        Ok(deleted == 1)
    }
}
