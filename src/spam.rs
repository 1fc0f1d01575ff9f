//! Cadence and similarity checks gating message acceptance.
//!
//! A submission is rejected when its author posted too recently, or when
//! enough recently accepted bodies are near-duplicates of it. Accepted
//! submissions are recorded before [`SpamGuard::check_at`] returns.

use std::{
    collections::{HashMap, VecDeque},
    fmt,
    net::IpAddr,
    time::{Duration, Instant},
};

const SWEEP_EVERY_CHECKS: u64 = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpamConfig {
    pub min_interval: Duration,
    pub similarity_threshold: f64,
    pub max_similar: usize,
    pub history_size: usize,
}

impl Default for SpamConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(2000),
            similarity_threshold: 0.8,
            max_similar: 3,
            history_size: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpamRejection {
    TooFast { retry_after: Duration },
    TooSimilar { similar: usize },
}

impl fmt::Display for SpamRejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SpamRejection::TooFast { retry_after } => write!(
                f,
                "Please wait {:.1}s before posting again",
                retry_after.as_secs_f64()
            ),
            SpamRejection::TooSimilar { similar } => write!(
                f,
                "Message too similar to {similar} recent messages"
            ),
        }
    }
}

#[derive(Debug)]
pub struct SpamGuard {
    config: SpamConfig,
    history: VecDeque<String>,
    last_accepted: HashMap<IpAddr, Instant>,
    checks_seen: u64,
}

impl SpamGuard {
    pub fn new(config: SpamConfig) -> Self {
        Self {
            config,
            history: VecDeque::with_capacity(config.history_size.min(1024)),
            last_accepted: HashMap::new(),
            checks_seen: 0,
        }
    }

    pub fn check_at(
        &mut self,
        submitter: IpAddr,
        body: &str,
        now: Instant,
    ) -> Result<(), SpamRejection> {
        self.sweep_if_needed(now);

        if let Some(&last) = self.last_accepted.get(&submitter) {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.config.min_interval {
                return Err(SpamRejection::TooFast {
                    retry_after: self.config.min_interval - elapsed,
                });
            }
        }

        let similar = self
            .history
            .iter()
            .filter(|previous| similarity(body, previous) > self.config.similarity_threshold)
            .count();
        if similar >= self.config.max_similar {
            return Err(SpamRejection::TooSimilar { similar });
        }

        self.record(submitter, body, now);
        Ok(())
    }

    fn record(&mut self, submitter: IpAddr, body: &str, now: Instant) {
        self.last_accepted.insert(submitter, now);
        self.history.push_back(body.to_owned());
        while self.history.len() > self.config.history_size {
            self.history.pop_front();
        }
    }

    // An entry older than the interval can no longer cause a rejection.
    fn sweep_if_needed(&mut self, now: Instant) {
        self.checks_seen += 1;
        if !self.checks_seen.is_multiple_of(SWEEP_EVERY_CHECKS) {
            return;
        }
        let min_interval = self.config.min_interval;
        self.last_accepted
            .retain(|_, last| now.saturating_duration_since(*last) < min_interval);
    }

    #[cfg(test)]
    fn tracked_submitters(&self) -> usize {
        self.last_accepted.len()
    }
}

/// Levenshtein edit distance over Unicode scalar values.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j]
            } else {
                1 + prev[j].min(prev[j + 1]).min(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// `(maxLen - distance) / maxLen`, in `[0, 1]`. Two empty strings are identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    (max_len - levenshtein(a, b)) as f64 / max_len as f64
}
