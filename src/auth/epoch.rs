//! Epoch-bucketed reclamation of expired tokens.
//!
//! Server uptime is cut into fixed-width windows ("epochs"), numbered from 1.
//! Every issued token is recorded in the bucket of the epoch it was minted in.
//! Once enough whole windows have passed that even a token minted at the very
//! end of a bucket's window must be past its TTL, the whole bucket is dropped
//! at once.
//!
//! ## Design
//! - Buckets are kept oldest-first; only the newest one is appended to
//! - A bucket is opened only when the epoch advances, and only then is
//!   eviction attempted, so the cost is amortized over issuance
//! - Eviction trims a prefix and stops at the first bucket still in range
//! - No timer: an idle server does not prune until the next issuance
//! - Buckets hold references only; the token table decides liveness

use super::token::TokenValue;
use std::collections::VecDeque;
use std::time::Duration;

/// Tokens minted during one epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochBucket {
    epoch: u64,
    tokens: Vec<TokenValue>,
}

impl EpochBucket {
    fn new(epoch: u64) -> Self {
        Self {
            epoch,
            tokens: Vec::new(),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Token references recorded in this bucket. Some may already be gone
    /// from the token table.
    pub fn tokens(&self) -> &[TokenValue] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[derive(Debug)]
pub struct EpochPruner {
    /// Width of one epoch.
    window: Duration,
    /// Whole windows a bucket must trail the current epoch by before it is
    /// expirable: `ceil(ttl / window)`.
    horizon: u64,
    buckets: VecDeque<EpochBucket>,
}

impl EpochPruner {
    pub fn new(window: Duration, ttl: Duration) -> Self {
        let window_nanos = window.as_nanos().max(1);
        let horizon = ttl.as_nanos().div_ceil(window_nanos);
        Self {
            window,
            horizon: u64::try_from(horizon).unwrap_or(u64::MAX),
            buckets: VecDeque::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn horizon(&self) -> u64 {
        self.horizon
    }

    /// Epoch number for the given uptime. The first window is epoch 1.
    pub fn epoch_at(&self, uptime: Duration) -> u64 {
        let index = uptime.as_nanos() / self.window.as_nanos().max(1);
        u64::try_from(index).unwrap_or(u64::MAX - 1) + 1
    }

    /// Whether every token of a bucket from `epoch` is certainly expired once
    /// the server is in epoch `current`.
    pub fn is_expirable(&self, epoch: u64, current: u64) -> bool {
        current.saturating_sub(epoch) > self.horizon
    }

    /// Record a freshly minted token. When the epoch has advanced since the
    /// newest bucket, opens a single new bucket for the current epoch and
    /// evicts expirable buckets first. Returns the evicted buckets so the
    /// caller can drop their tokens from its table.
    pub fn record(&mut self, token: TokenValue, uptime: Duration) -> Vec<EpochBucket> {
        let current = self.epoch_at(uptime);
        let advanced = self.buckets.back().is_none_or(|b| b.epoch < current);

        let mut evicted = Vec::new();
        if advanced {
            self.buckets.push_back(EpochBucket::new(current));
            evicted = self.evict(current);
        }

        if let Some(newest) = self.buckets.back_mut() {
            newest.tokens.push(token);
        }
        evicted
    }

    /// Pop buckets from the old end while they are expirable.
    pub fn evict(&mut self, current: u64) -> Vec<EpochBucket> {
        let mut evicted = Vec::new();
        while let Some(oldest) = self.buckets.front() {
            if !self.is_expirable(oldest.epoch, current) {
                break;
            }
            if let Some(bucket) = self.buckets.pop_front() {
                evicted.push(bucket);
            }
        }
        evicted
    }

    pub fn buckets(&self) -> impl Iterator<Item = &EpochBucket> {
        self.buckets.iter()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn oldest_epoch(&self) -> Option<u64> {
        self.buckets.front().map(EpochBucket::epoch)
    }

    pub fn newest_epoch(&self) -> Option<u64> {
        self.buckets.back().map(EpochBucket::epoch)
    }

    /// Total token references held across all buckets, dangling ones included.
    pub fn tracked(&self) -> usize {
        self.buckets.iter().map(EpochBucket::len).sum()
    }
}
