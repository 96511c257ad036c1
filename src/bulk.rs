//! Continue-on-error loops over many Discord calls.

use crate::gateway::GatewayError;
use crate::utils::{clip, preview_list};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Most failure lines shown in a tally report.
const SHOWN_FAILURES: usize = 10;
/// Failure lines longer than this are clipped.
const FAILURE_LINE_CHARS: usize = 150;

/// A fixed pause inserted between consecutive external calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    delay: Duration,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    #[cfg(test)]
    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn pause(&self) {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    pub channels: Throttle,
    pub messages: Throttle,
}

impl ThrottlePolicy {
    #[cfg(test)]
    pub fn none() -> Self {
        Self {
            channels: Throttle::none(),
            messages: Throttle::none(),
        }
    }
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            channels: Throttle::new(Duration::from_millis(1000)),
            messages: Throttle::new(Duration::from_millis(1000)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub target: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    pub succeeded: usize,
    pub failures: Vec<Failure>,
}

impl Tally {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed()
    }

    /// `<title>: 5 succeeded, 0 failed` plus the first few failure reasons.
    pub fn report(&self, title: &str) -> String {
        let mut report = format!(
            "{}: {} succeeded, {} failed",
            title,
            self.succeeded,
            self.failed()
        );

        if !self.failures.is_empty() {
            let lines: Vec<String> = self
                .failures
                .iter()
                .map(|f| clip(&format!("{}: {}", f.target, f.reason), FAILURE_LINE_CHARS))
                .collect();
            report.push('\n');
            report.push_str(&preview_list(&lines, SHOWN_FAILURES, "failures"));
        }

        report
    }
}

/// Runs `op` once per target, pausing between calls.
///
/// A failing target is recorded and the loop moves on. Only a fatal
/// [`GatewayError`] ends the loop early.
pub async fn run_bulk<T, F, Fut>(
    targets: Vec<(String, T)>,
    throttle: Throttle,
    mut op: F,
) -> Result<Tally, GatewayError>
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<(), GatewayError>>,
{
    let mut tally = Tally::default();

    for (index, (label, item)) in targets.into_iter().enumerate() {
        if index > 0 {
            throttle.pause().await;
        }

        match op(item).await {
            Ok(()) => tally.succeeded += 1,
            Err(e) if e.is_fatal() => {
                warn!(
                    "Aborting bulk operation at {} after {} calls: {}",
                    label,
                    tally.attempted(),
                    e
                );
                return Err(e);
            }
            Err(e) => {
                debug!("Bulk target {} failed: {}", label, e);
                tally.failures.push(Failure {
                    target: label,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(tally)
}
