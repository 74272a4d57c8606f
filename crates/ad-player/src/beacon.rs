//! Fire-and-forget beacon transport.

use reqwest::Client;
use tokio::runtime::Handle;
use tracing::{debug, warn};
use url::Url;

use crate::config::BeaconConfig;
use crate::error::Result;

/// One-way delivery of tracking URLs. No response is consumed and nothing is
/// retried.
pub trait BeaconSender: Send + Sync {
    fn send(&self, url: &str);
}

/// Sends each beacon as an HTTP GET.
///
/// Requests run on the runtime current at construction, so beacons may be
/// sent from host threads outside it.
#[derive(Debug, Clone)]
pub struct HttpBeaconSender {
    client: Client,
    runtime: Option<Handle>,
}

impl HttpBeaconSender {
    pub fn new(config: &BeaconConfig) -> Result<Self> {
        let mut builder = Client::builder().timeout(config.timeout());
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        Ok(Self::with_client(builder.build()?))
    }

    /// Use an existing client (shared connection pool).
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            runtime: Handle::try_current().ok(),
        }
    }
}

impl BeaconSender for HttpBeaconSender {
    fn send(&self, url: &str) {
        let target = match Url::parse(url) {
            Ok(target) => target,
            Err(e) => {
                warn!(url, error = %e, "Dropping beacon with invalid URL");
                return;
            }
        };

        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            warn!(url = %target, "Dropping beacon, no runtime to send it on");
            return;
        };
        let client = self.client.clone();
        runtime.spawn(async move {
            match client.get(target.clone()).send().await {
                Ok(response) => {
                    debug!(url = %target, status = %response.status(), "Beacon delivered");
                }
                Err(e) => {
                    warn!(url = %target, error = %e, "Beacon delivery failed");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_dropped_without_spawning() {
        let sender = HttpBeaconSender::new(&BeaconConfig::default()).unwrap();
        // Must not panic or reach the network.
        sender.send("not a url");
    }

    #[test]
    fn test_send_without_runtime_is_dropped() {
        let sender = HttpBeaconSender::new(&BeaconConfig::default()).unwrap();
        sender.send("https://track.example/start");
    }

    #[test]
    fn test_client_honours_user_agent_config() {
        let config = BeaconConfig {
            timeout_secs: 2,
            user_agent: Some("adslot/0.1".to_string()),
        };
        assert!(HttpBeaconSender::new(&config).is_ok());
    }
}
