use std::thread;
use std::time::Duration;

use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cell::Cell;
use crate::error::{CellError, CellResult};

/// How [`apply`] retries after losing a compare-and-swap race.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first lost race; doubles on each further loss.
    #[serde(with = "duration_ms")]
    pub base_delay: Duration,
    #[serde(with = "duration_ms")]
    pub max_delay: Duration,
    /// Pick each delay uniformly from the upper half of its range.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(100),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Retry immediately, up to `max_attempts` times in total.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    /// Pause before the attempt following failed attempt number `attempt`
    /// (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(20);
        let delay = self
            .base_delay
            .saturating_mul(1 << shift)
            .min(self.max_delay);
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let micros = u64::try_from(delay.as_micros()).unwrap_or(u64::MAX);
        Duration::from_micros(rand::thread_rng().gen_range(micros / 2..=micros))
    }
}

/// Run one optimistic transaction against `cell`.
///
/// The current contents are decoded as JSON (`None` when the cell is
/// empty) and handed to `f`. If `f` returns `Some(next)`, `next` is
/// encoded and swapped in; if another writer changed the cell in the
/// meantime, `f` runs again on the fresh contents. `f` must therefore be
/// safe to call more than once.
///
/// Returns the committed value, or `None` when `f` chose not to write.
/// Errors from `f` are returned unchanged and nothing is written.
pub fn apply<C, T, E, F>(cell: &C, policy: &RetryPolicy, mut f: F) -> Result<Option<T>, E>
where
    C: Cell + ?Sized,
    T: Serialize + DeserializeOwned,
    E: From<CellError>,
    F: FnMut(Option<T>) -> Result<Option<T>, E>,
{
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        let current = cell.read()?;
        let Some(next) = f(decode(&current)?)? else {
            return Ok(None);
        };
        let encoded = serde_json::to_vec(&next).map_err(CellError::from)?;
        if cell.compare_and_swap(&current, &encoded)? {
            debug!(attempt, size = encoded.len(), "cell committed");
            return Ok(Some(next));
        }

        warn!(attempt, max_attempts = attempts, "cell changed concurrently; retrying");
        if attempt < attempts {
            thread::sleep(policy.backoff(attempt));
        }
    }
    Err(CellError::Conflict { attempts }.into())
}

fn decode<T: DeserializeOwned>(raw: &[u8]) -> CellResult<Option<T>> {
    if raw.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(raw)?))
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
