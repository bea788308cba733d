use std::time::Duration;

use reqwest::{Client, Error};
use tracing::warn;

use crate::configs::HttpProxyConfig;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Fixed transport policy: connect, read and whole-request budgets are all
/// 30 seconds and cannot be changed per request.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const READ_TIMEOUT: Duration = Duration::from_secs(30);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpClient;

impl HttpClient {
  pub fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
  }

  pub fn new() -> Result<Client, Error> {
    Self::with_proxy(None)
  }

  /// Builds the pooled client shared by every request of the extension.
  ///
  /// The client is cheap to clone and safe to use from concurrent track loads.
  pub fn with_proxy(proxy: Option<&HttpProxyConfig>) -> Result<Client, Error> {
    let mut builder = Client::builder()
      .user_agent(Self::default_user_agent())
      .connect_timeout(CONNECT_TIMEOUT)
      .read_timeout(READ_TIMEOUT)
      .timeout(REQUEST_TIMEOUT)
      .tcp_keepalive(Duration::from_secs(25))
      .pool_idle_timeout(Duration::from_secs(70));

    if let Some(proxy_config) = proxy {
      if let Some(p_url) = &proxy_config.url {
        match reqwest::Proxy::all(p_url) {
          Ok(mut proxy_obj) => {
            if let (Some(u), Some(p)) = (&proxy_config.username, &proxy_config.password) {
              proxy_obj = proxy_obj.basic_auth(u, p);
            }
            builder = builder.proxy(proxy_obj);
          }
          Err(e) => {
            warn!(
              "Failed to parse proxy URL '{}': {} - proxy will be ignored",
              p_url, e
            );
          }
        }
      }
    }

    builder.build()
  }
}
