//! Bounded retry for single-image insertion.
//!
//! The service fetches and embeds the image server-side, and that step fails
//! intermittently. Inserting an image therefore resubmits the same batch
//! until it succeeds or the attempt budget is spent. Exhaustion is an
//! ordinary outcome ([`ImageInsertOutcome::NotCreated`]), not an error: an
//! image is a non-critical asset and the run carries on without it.
//!
//! ```text
//! Attempting ──ok──▶ Succeeded
//!     │  └─retryable error, attempts < max──▶ Attempting
//!     └─non-retryable error or attempts == max──▶ ExhaustedRetries
//! ```
//!
//! [`insert_images`] is the all-or-nothing alternative: one batch, one
//! attempt, and any failure propagates.

use super::builder::{Placement, build_image, build_images};
use super::service::{SlidesError, SlidesService, extract_created_id};
use crate::config::SlidesConfig;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Attempt budget for one image.
pub const IMAGE_INSERT_ATTEMPTS: u32 = 40;

/// Delay between failed attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry right away.
    Immediate,
    /// `base * 2^(n-1)` capped at `max`, with full jitter.
    Exponential { base: Duration, max: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: IMAGE_INSERT_ATTEMPTS,
            backoff: Backoff::Immediate,
        }
    }
}

impl RetryPolicy {
    /// Image policy from the `[slides]` config section.
    ///
    /// A zero `retry-backoff-ms` keeps the immediate-retry behavior.
    pub fn from_config(config: &SlidesConfig) -> Self {
        let backoff = if config.retry_backoff_ms == 0 {
            Backoff::Immediate
        } else {
            Backoff::Exponential {
                base: Duration::from_millis(config.retry_backoff_ms),
                max: Duration::from_millis(config.retry_backoff_max_ms.max(config.retry_backoff_ms)),
            }
        };
        Self {
            max_attempts: IMAGE_INSERT_ATTEMPTS,
            backoff,
        }
    }

    /// Upper bound of the wait after failed attempt number `attempt` (1-based).
    pub fn delay_cap(&self, attempt: u32) -> Option<Duration> {
        match self.backoff {
            Backoff::Immediate => None,
            Backoff::Exponential { base, max } => {
                let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
                Some(base.saturating_mul(factor).min(max))
            }
        }
    }

    fn wait(&self, attempt: u32) {
        if let Some(cap) = self.delay_cap(attempt) {
            let millis = u64::try_from(cap.as_millis()).unwrap_or(u64::MAX);
            let jittered = rand::rng().random_range(0..=millis);
            std::thread::sleep(Duration::from_millis(jittered));
        }
    }
}

/// Result of [`insert_image`].
#[derive(Debug)]
pub enum ImageInsertOutcome {
    Created { object_id: String, attempts: u32 },
    NotCreated { attempts: u32, last_error: SlidesError },
}

impl ImageInsertOutcome {
    pub fn object_id(&self) -> Option<&str> {
        match self {
            Self::Created { object_id, .. } => Some(object_id),
            Self::NotCreated { .. } => None,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Created { attempts, .. } | Self::NotCreated { attempts, .. } => *attempts,
        }
    }
}

/// Insert one image, resubmitting the same batch on retryable failures.
///
/// Attempts are strictly sequential. The batch (and so the element ID) is
/// built once and reused for every attempt.
pub fn insert_image(
    service: &dyn SlidesService,
    page_id: &str,
    url: &str,
    placement: &Placement,
    policy: &RetryPolicy,
) -> ImageInsertOutcome {
    let batch = build_image(page_id, url, placement);
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;

    loop {
        attempts += 1;
        debug!(attempt = attempts, max_attempts, url, "adding image");
        let error = match service
            .submit(&batch)
            .and_then(|reply| extract_created_id(&reply, 0))
        {
            Ok(object_id) => {
                info!(%object_id, attempts, "created image");
                return ImageInsertOutcome::Created {
                    object_id,
                    attempts,
                };
            }
            Err(e) => e,
        };

        if !error.is_retryable() || attempts >= max_attempts {
            warn!(url, attempts, error = %error, "image was not added");
            return ImageInsertOutcome::NotCreated {
                attempts,
                last_error: error,
            };
        }
        debug!(error = %error, "image insert failed, retrying");
        policy.wait(attempts);
    }
}

/// Insert several images in one batch without retrying.
///
/// Returns the created IDs in input order. The parallel inputs are checked
/// before anything is submitted.
pub fn insert_images(
    service: &dyn SlidesService,
    page_id: &str,
    urls: &[String],
    widths: &[f64],
    heights: &[f64],
    xs: &[f64],
    ys: &[f64],
) -> Result<Vec<String>, SlidesError> {
    let batch = build_images(page_id, urls, widths, heights, xs, ys)?;
    let reply = service.submit(&batch)?;
    let ids = (0..batch.len())
        .map(|i| extract_created_id(&reply, i))
        .collect::<Result<Vec<_>, _>>()?;
    info!(count = ids.len(), "created images");
    Ok(ids)
}
