// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Token bucket burst control for domain registration.
//!
//! Two flavours share the same bucket:
//! 1. Per-identity buckets, created lazily on first observation with the
//!    caller's burst size and a fixed refill interval (1 token/second default)
//! 2. Global buckets shared by every identity, guarding total throughput
//!
//! The per-identity registry is bounded: at capacity the least recently seen
//! identity is evicted, and buckets that have fully refilled are swept.

use crate::identity::Identity;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Result of a burst check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateLimitResult {
    /// Token consumed
    Allowed {
        /// Whole tokens left in the bucket
        remaining: u32,
    },
    /// Bucket empty
    Limited {
        /// Time until the next token is available
        retry_after: Duration,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }
}

/// Token bucket with continuous refill.
#[derive(Debug)]
pub struct TokenBucket {
    /// Available tokens
    tokens: f64,
    /// Maximum tokens (bucket capacity)
    capacity: f64,
    /// Token refill rate per second
    refill_rate: f64,
    /// Last time tokens were refilled
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket holding `capacity` tokens, regaining one token
    /// every `refill_interval`.
    pub fn new(capacity: u32, refill_interval: Duration) -> Self {
        let interval = refill_interval.max(Duration::from_millis(1));
        Self {
            tokens: capacity as f64,
            capacity: capacity as f64,
            refill_rate: 1.0 / interval.as_secs_f64(),
            last_refill: Instant::now(),
        }
    }

    /// Refill tokens based on elapsed time.
    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    /// Try to consume a token.
    pub fn try_consume(&mut self) -> RateLimitResult {
        self.refill(Instant::now());
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            RateLimitResult::Allowed {
                remaining: self.remaining(),
            }
        } else {
            RateLimitResult::Limited {
                retry_after: self.time_until_available(),
            }
        }
    }

    /// Get remaining whole tokens.
    pub fn remaining(&self) -> u32 {
        self.tokens.floor() as u32
    }

    /// Get time until a token is available.
    pub fn time_until_available(&self) -> Duration {
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            let needed = 1.0 - self.tokens;
            Duration::from_secs_f64(needed / self.refill_rate)
        }
    }

    /// True when the bucket would be back at capacity by `now`, making it
    /// indistinguishable from a freshly created one.
    fn is_replenished(&self, now: Instant) -> bool {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens + elapsed * self.refill_rate >= self.capacity
    }
}

/// Registry entry plus its position in the recency index.
#[derive(Debug)]
struct Slot<V> {
    value: V,
    seq: u64,
}

/// Bounded map from identity to state with least-recently-seen eviction.
///
/// Recency is kept in a `BTreeMap` keyed by a monotonically increasing
/// sequence number, so touching and evicting are O(log n) rather than a scan
/// of every entry.
#[derive(Debug)]
pub(crate) struct Registry<K, V> {
    entries: HashMap<K, Slot<V>>,
    recency: BTreeMap<u64, K>,
    next_seq: u64,
    max_entries: usize,
}

impl<K, V> Registry<K, V>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            next_seq: 0,
            max_entries: max_entries.max(1),
        }
    }

    /// Look up `key`, creating it with `init` if absent, and mark it as the
    /// most recently seen. A new key arriving at capacity evicts the least
    /// recently seen entry first.
    pub(crate) fn touch_or_insert(&mut self, key: &K, init: impl FnOnce() -> V) -> &mut V {
        let seq = self.next_seq;
        self.next_seq += 1;

        if !self.entries.contains_key(key) && self.entries.len() >= self.max_entries {
            if let Some((_, oldest)) = self.recency.pop_first() {
                self.entries.remove(&oldest);
                warn!(
                    capacity = self.max_entries,
                    "Identity registry full, evicted least recently seen"
                );
            }
        }

        let slot = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| Slot { value: init(), seq });
        self.recency.remove(&slot.seq);
        slot.seq = seq;
        self.recency.insert(seq, key.clone());
        &mut slot.value
    }

    pub(crate) fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|slot| &slot.value)
    }

    /// Keep only entries whose value satisfies `keep`.
    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&V) -> bool) {
        let recency = &mut self.recency;
        self.entries.retain(|_, slot| {
            let kept = keep(&slot.value);
            if !kept {
                recency.remove(&slot.seq);
            }
            kept
        });
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Per-identity burst limiter.
pub struct IdentityRateLimiter {
    /// One token regained per interval, independent of burst size
    refill_interval: Duration,
    buckets: Mutex<Registry<Identity, TokenBucket>>,
}

impl IdentityRateLimiter {
    pub fn new(refill_interval: Duration, max_identities: usize) -> Self {
        Self {
            refill_interval,
            buckets: Mutex::new(Registry::new(max_identities)),
        }
    }

    /// Consume one token from `identity`'s bucket.
    ///
    /// Unknown identities get a full bucket of `burst` tokens.
    pub async fn allow(&self, identity: &Identity, burst: u32) -> RateLimitResult {
        let mut buckets = self.buckets.lock().await;
        let refill_interval = self.refill_interval;
        let bucket = buckets.touch_or_insert(identity, || TokenBucket::new(burst, refill_interval));

        let result = bucket.try_consume();
        if let RateLimitResult::Limited { retry_after } = result {
            debug!(%identity, ?retry_after, "Identity burst limit exceeded");
        }
        result
    }

    /// Drop buckets that have fully refilled. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        let before = buckets.len();
        buckets.retain(|bucket| !bucket.is_replenished(now));
        before - buckets.len()
    }

    /// Number of identities currently tracked.
    pub async fn tracked(&self) -> usize {
        self.buckets.lock().await.len()
    }
}

/// A single bucket shared by every requester.
pub struct GlobalLimiter {
    name: &'static str,
    bucket: Mutex<TokenBucket>,
}

impl GlobalLimiter {
    pub fn new(name: &'static str, capacity: u32, refill_interval: Duration) -> Self {
        Self {
            name,
            bucket: Mutex::new(TokenBucket::new(capacity, refill_interval)),
        }
    }

    pub async fn allow(&self) -> RateLimitResult {
        let result = self.bucket.lock().await.try_consume();
        if let RateLimitResult::Limited { retry_after } = result {
            warn!(limiter = self.name, ?retry_after, "Global limit exceeded");
        }
        result
    }
}
