//! Outbound proposal calls over HTTP.
//!
//! Each configured service maps a principal to a base URL. A call posts the
//! raw argument bytes to `{url}/{method}`; a 2xx reply body is the result.
//! The method is always one percent-encoded path segment under the base.

use crate::config::ServiceEndpoint;
use crate::tracing_spans::dispatch_span;
use crate::NodeError;
use agora_governance::{DispatchError, Dispatcher};
use agora_types::Principal;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, Instrument};

pub struct HttpDispatcher {
    client: Client,
    services: HashMap<Principal, Url>,
    timeout: Duration,
}

impl HttpDispatcher {
    pub fn new(services: &[ServiceEndpoint], timeout: Duration) -> Result<Self, NodeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NodeError::Http(e.to_string()))?;
        let services = services
            .iter()
            .map(|s| {
                let url = Url::parse(&s.url)
                    .map_err(|e| NodeError::Config(format!("service {} url {}: {e}", s.id, s.url)))?;
                if url.cannot_be_a_base() {
                    return Err(NodeError::Config(format!(
                        "service {} url {} cannot take a path",
                        s.id, s.url
                    )));
                }
                Ok((s.id, url))
            })
            .collect::<Result<_, NodeError>>()?;
        Ok(Self {
            client,
            services,
            timeout,
        })
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    async fn post(
        &self,
        target: &Principal,
        base: &Url,
        method: &str,
        args: &[u8],
    ) -> Result<Vec<u8>, DispatchError> {
        let url = method_url(base, method)?;
        let resp = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(args.to_vec())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DispatchError::Timeout(self.timeout.as_secs())
                } else {
                    DispatchError::Unreachable(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected {
                target: *target,
                method: method.to_string(),
                reason: format!("{status} {body}").trim_end().to_string(),
            });
        }
        let reply = resp
            .bytes()
            .await
            .map_err(|e| DispatchError::Unreachable(e.to_string()))?;
        debug!(%target, method, reply_len = reply.len(), "call succeeded");
        Ok(reply.to_vec())
    }
}

/// `{base}/{method}`, with `method` confined to a single path segment.
fn method_url(base: &Url, method: &str) -> Result<Url, DispatchError> {
    if method.is_empty() || method == "." || method == ".." || method.contains(['/', '?', '#']) {
        return Err(DispatchError::InvalidMethod(method.to_string()));
    }
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| DispatchError::InvalidMethod(method.to_string()))?
        .pop_if_empty()
        .push(method);
    Ok(url)
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn call(
        &self,
        target: &Principal,
        method: &str,
        args: &[u8],
    ) -> Result<Vec<u8>, DispatchError> {
        let base = self
            .services
            .get(target)
            .ok_or(DispatchError::UnknownTarget(*target))?;
        self.post(target, base, method, args)
            .instrument(dispatch_span(target, method))
            .await
    }
}
