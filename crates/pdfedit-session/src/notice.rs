//! Auto-dismissing user notices

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub message: String,
    pub level: NoticeLevel,
    pub created_at: Instant,
    pub expires_at: Instant,
}

impl Notice {
    pub fn is_active(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone)]
pub struct NoticeQueue {
    ttl: Duration,
    notices: Vec<Notice>,
}

impl NoticeQueue {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            notices: Vec::new(),
        }
    }

    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>, now: Instant) {
        let message = message.into();
        match level {
            NoticeLevel::Error => tracing::warn!(%message, "notice"),
            _ => tracing::debug!(%message, "notice"),
        }
        self.notices.push(Notice {
            message,
            level,
            created_at: now,
            expires_at: now + self.ttl,
        });
    }

    /// Notices still visible at `now`, oldest first
    pub fn active(&self, now: Instant) -> impl Iterator<Item = &Notice> {
        self.notices.iter().filter(move |n| n.is_active(now))
    }

    /// Drop expired notices
    pub fn prune(&mut self, now: Instant) {
        self.notices.retain(|n| n.is_active(now));
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }

    pub fn clear(&mut self) {
        self.notices.clear();
    }
}
