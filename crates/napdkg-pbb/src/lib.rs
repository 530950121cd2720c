//! NAP-DKG PBB - Public bulletin board used by every party
//!
//! Participants never message each other directly. They publish once per
//! topic and poll the board for everybody else's records.

pub mod board;
pub mod error;
pub mod metrics;
pub mod poller;
pub mod topic;

pub use board::{BulletinBoard, InMemoryBoard};
pub use error::{BoardError, Result};
pub use metrics::{BoardMetrics, CountingBoard, Phase, Traffic};
pub use poller::TopicPoller;
pub use topic::{InMemoryTopic, Topic, TopicLog};
