//! BTA Task Queue
//!
//! Hands analysis jobs from the HTTP layer to workers and keeps a key-value
//! record of each job's status. Two backends implement [`JobQueue`]:
//! an in-process [`MemoryQueue`] and a Redis-backed [`RedisQueue`] that lets
//! API servers and standalone workers run as separate processes.

pub mod broadcast;
pub mod client;
pub mod job;
pub mod memory;
pub mod queue;
pub mod redis_queue;

pub use broadcast::{create_broadcast_channel, EventReceiver, EventSender, JobEvent};
pub use client::{init_pool, QueueError, QueueResult, RedisPool};
pub use job::{Job, JobState, JobStatus};
pub use memory::MemoryQueue;
pub use queue::JobQueue;
pub use redis_queue::RedisQueue;
