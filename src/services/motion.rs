// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shake gesture detection from raw accelerometer samples.
//!
//! Converts a continuous 3-axis stream into discrete "record a shake"
//! pulses via magnitude-delta thresholding and debouncing. The checks
//! against recorder state are synchronous reads of in-memory flags, so
//! per-sample cost stays trivial. No quota state lives here.

use crate::services::RecorderStatus;
use chrono::{DateTime, Utc};

/// Minimum magnitude delta between consecutive samples to count as a
/// shake gesture.
pub const SHAKE_DELTA_THRESHOLD: f64 = 1.5;

/// Minimum gap between fired triggers.
pub const SHAKE_DEBOUNCE_MS: i64 = 800;

/// Detects shake gestures in an accelerometer sample stream.
pub struct MotionDetector {
    status: RecorderStatus,
    previous_magnitude: Option<f64>,
    last_trigger: Option<DateTime<Utc>>,
}

impl MotionDetector {
    pub fn new(status: RecorderStatus) -> Self {
        Self {
            status,
            previous_magnitude: None,
            last_trigger: None,
        }
    }

    /// Feed one `[x, y, z]` sample. Returns `true` when the caller
    /// should submit a shake.
    ///
    /// `previous_magnitude` updates on every sample, fired or not, so
    /// the delta always spans exactly one sample interval.
    pub fn on_sample(&mut self, sample: [f64; 3], now: DateTime<Utc>) -> bool {
        let [x, y, z] = sample;
        let magnitude = (x * x + y * y + z * z).sqrt();
        let delta = self.previous_magnitude.map(|prev| (magnitude - prev).abs());
        self.previous_magnitude = Some(magnitude);

        let Some(delta) = delta else {
            return false;
        };
        if delta <= SHAKE_DELTA_THRESHOLD {
            return false;
        }

        if let Some(last) = self.last_trigger {
            if (now - last).num_milliseconds() <= SHAKE_DEBOUNCE_MS {
                return false;
            }
        }

        // Never fire into an in-flight submission or an exhausted quota
        if !self.status.idle() || self.status.limit_reached() {
            return false;
        }

        self.last_trigger = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{BackendClient, CredentialStore, QuotaTracker, ShakeRecorder, SyncService};
    use crate::store::LocalStore;
    use chrono::{Duration, TimeZone};

    async fn detector() -> (tempfile::TempDir, ShakeRecorder, MotionDetector) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();
        let credentials = CredentialStore::new(store.clone());
        let backend = BackendClient::new_mock(credentials);
        let quota = QuotaTracker::load(store.clone(), chrono::Local::now()).await;
        let sync = SyncService::load(store).await;
        let recorder = ShakeRecorder::new(backend, quota, sync);
        let status = recorder.status();
        (dir, recorder, MotionDetector::new(status))
    }

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).single().unwrap()
    }

    #[tokio::test]
    async fn test_first_sample_never_fires() {
        let (_dir, _recorder, mut detector) = detector().await;
        assert!(!detector.on_sample([0.0, 0.0, 9.0], t0()));
    }

    #[tokio::test]
    async fn test_fires_on_large_delta() {
        let (_dir, _recorder, mut detector) = detector().await;
        detector.on_sample([0.0, 0.0, 1.0], t0());
        assert!(detector.on_sample([0.0, 0.0, 4.0], t0() + Duration::milliseconds(50)));
    }

    #[tokio::test]
    async fn test_small_delta_does_not_fire() {
        let (_dir, _recorder, mut detector) = detector().await;
        detector.on_sample([0.0, 0.0, 1.0], t0());
        assert!(!detector.on_sample([0.0, 0.0, 1.5], t0() + Duration::milliseconds(50)));
    }

    #[tokio::test]
    async fn test_debounce_suppresses_rapid_pulses() {
        let (_dir, _recorder, mut detector) = detector().await;
        detector.on_sample([0.0, 0.0, 1.0], t0());
        assert!(detector.on_sample([0.0, 0.0, 4.0], t0() + Duration::milliseconds(50)));

        // Big delta again, but inside the debounce window
        assert!(!detector.on_sample([0.0, 0.0, 1.0], t0() + Duration::milliseconds(150)));

        // Past the debounce window it fires again
        assert!(detector.on_sample([0.0, 0.0, 4.0], t0() + Duration::milliseconds(900)));
    }

    #[tokio::test]
    async fn test_does_not_fire_while_submission_in_flight() {
        let (_dir, recorder, mut detector) = detector().await;
        let status = recorder.status();

        // Simulate an in-flight submission by holding the guard
        let guard = status.in_flight.try_acquire().unwrap();

        detector.on_sample([0.0, 0.0, 1.0], t0());
        assert!(!detector.on_sample([0.0, 0.0, 4.0], t0() + Duration::milliseconds(50)));

        // Same gesture once the guard clears goes through
        drop(guard);
        assert!(detector.on_sample([0.0, 0.0, 1.0], t0() + Duration::milliseconds(100)));
    }

    #[tokio::test]
    async fn test_magnitude_updates_even_when_suppressed() {
        let (_dir, _recorder, mut detector) = detector().await;
        detector.on_sample([0.0, 0.0, 1.0], t0());
        // Suppressed by threshold, but the baseline still moves
        detector.on_sample([0.0, 0.0, 2.0], t0() + Duration::milliseconds(50));
        // Delta vs 2.0 is only 1.0, under the threshold
        assert!(!detector.on_sample([0.0, 0.0, 3.0], t0() + Duration::milliseconds(100)));
    }
}
