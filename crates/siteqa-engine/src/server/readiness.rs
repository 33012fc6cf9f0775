use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use siteqa_utils::error::ServerError;

/// Bounded, fixed-interval readiness polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

/// Answers whether the server responds yet.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn is_ready(&self, url: &str) -> bool;
}

/// HTTP GET probe: any response counts, whatever the status code.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    /// Each probe gives up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ReadinessProbe for HttpProbe {
    async fn is_ready(&self, url: &str) -> bool {
        match self.client.get(url).send().await {
            Ok(response) => {
                debug!(url, status = %response.status(), "Readiness probe answered");
                true
            }
            Err(e) => {
                debug!(url, error = %e, "Readiness probe failed");
                false
            }
        }
    }
}

/// Poll `url` until it answers or the policy is exhausted.
///
/// Before each attempt `exited` is consulted; a server that has already died
/// (e.g. it could not bind the port) fails immediately instead of burning the
/// remaining attempts. Returns the attempt number that succeeded.
pub async fn wait_until_ready<F>(
    policy: ReadinessPolicy,
    probe: &dyn ReadinessProbe,
    url: &str,
    mut exited: F,
) -> Result<u32, ServerError>
where
    F: FnMut() -> Option<String> + Send,
{
    for attempt in 1..=policy.attempts {
        if let Some(status) = exited() {
            return Err(ServerError::ExitedEarly { status });
        }

        if probe.is_ready(url).await {
            debug!(url, attempt, "Server is ready");
            return Ok(attempt);
        }

        debug!(url, attempt, max = policy.attempts, "Server not ready yet");
        if attempt < policy.attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(ServerError::NotReady {
        url: url.to_string(),
        attempts: policy.attempts,
    })
}
