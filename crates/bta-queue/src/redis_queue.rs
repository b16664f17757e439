//! Redis queue backend.
//!
//! Key layout:
//! - `bta:queue`     list of JSON jobs (LPUSH on enqueue, BRPOP on dequeue)
//! - `bta:job:{id}`  JSON [`JobState`] with a TTL

use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, warn};

use crate::client::{init_pool, QueueResult, RedisPool};
use crate::job::{Job, JobState};
use crate::queue::JobQueue;

const QUEUE_KEY: &str = "bta:queue";

fn job_key(id: &str) -> String {
    format!("bta:job:{}", id)
}

pub struct RedisQueue {
    pool: RedisPool,
    /// BRPOP blocks its connection, so pops get their own.
    blocking: RedisPool,
    ttl_secs: u64,
}

impl RedisQueue {
    /// Connect to Redis. Job states expire `ttl` after their last update.
    pub async fn connect(redis_url: &str, ttl: Duration) -> QueueResult<Self> {
        let pool = init_pool(redis_url).await?;
        let blocking = init_pool(redis_url).await?;
        debug!(redis_url, "Redis queue connected");
        Ok(Self {
            pool,
            blocking,
            ttl_secs: ttl.as_secs().max(1),
        })
    }
}

#[async_trait]
impl JobQueue for RedisQueue {
    async fn enqueue(&self, job: Job) -> QueueResult<JobState> {
        let state = JobState::pending(&job);
        self.put_state(&state).await?;

        let mut conn = self.pool.clone();
        let payload = serde_json::to_string(&job)?;
        conn.lpush::<_, _, ()>(QUEUE_KEY, payload).await?;
        Ok(state)
    }

    async fn dequeue(&self, timeout: Duration) -> QueueResult<Option<Job>> {
        let mut conn = self.blocking.clone();
        let popped: Option<(String, String)> = conn.brpop(QUEUE_KEY, timeout.as_secs_f64()).await?;
        let Some((_, payload)) = popped else {
            return Ok(None);
        };
        match serde_json::from_str::<Job>(&payload) {
            Ok(job) => Ok(Some(job)),
            Err(e) => {
                // A malformed entry would otherwise be retried forever.
                warn!(error = %e, "Dropping malformed job from queue");
                Ok(None)
            }
        }
    }

    async fn state(&self, id: &str) -> QueueResult<Option<JobState>> {
        let mut conn = self.pool.clone();
        let json: Option<String> = conn.get(job_key(id)).await?;
        match json {
            Some(j) => Ok(Some(serde_json::from_str(&j)?)),
            None => Ok(None),
        }
    }

    async fn put_state(&self, state: &JobState) -> QueueResult<()> {
        let mut conn = self.pool.clone();
        let json = serde_json::to_string(state)?;
        conn.set_ex::<_, _, ()>(job_key(&state.id), json, self.ttl_secs).await?;
        Ok(())
    }

    async fn pending_count(&self) -> QueueResult<usize> {
        let mut conn = self.pool.clone();
        let len: usize = conn.llen(QUEUE_KEY).await?;
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_key() {
        assert_eq!(job_key("abc"), "bta:job:abc");
    }
}
