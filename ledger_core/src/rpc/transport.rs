//! Component A: RPC transport.
//!
//! A thin, stateless façade over `reqwest` shared by the live and archive
//! surfaces. Normalizes a base URL that may or may not already carry a
//! `/live/v1` or `/query/v1` suffix, decodes wide integers transparently
//! (callers rely on `serde` attributes in the response structs for that),
//! and turns non-2xx responses into a structured [`TransportError`].

use crate::errors::{RequestFailure, TransportError};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Fired after every request completes (success or failure); never affects semantics.
pub type ResponseHook = Arc<dyn Fn(u64, u16, bool) + Send + Sync>;
/// Fired immediately before every request is sent.
pub type RequestHook = Arc<dyn Fn(&str, &str) + Send + Sync>;
/// Fired when a request fails at the transport layer (network error, bad JSON, ...).
pub type ErrorHook = Arc<dyn Fn(&TransportError) + Send + Sync>;

#[derive(Clone, Default)]
pub struct TransportHooks {
    pub on_request: Option<RequestHook>,
    pub on_response: Option<ResponseHook>,
    pub on_error: Option<ErrorHook>,
}

/// Shared, stateless, cheaply-clonable transport used by both the live and
/// archive surfaces. Safe to use concurrently: `reqwest::Client` pools its
/// own connections internally.
#[derive(Clone)]
pub struct Transport {
    http: reqwest::Client,
    base: Url,
    hooks: TransportHooks,
}

/// Strip an accidental `/live/v1` or `/query/v1` suffix from a caller-supplied
/// base URL so surfaces can append their own prefix unambiguously.
fn normalize_base(mut base: Url) -> Url {
    let stripped = {
        let path = base.path();
        path.strip_suffix("/live/v1")
            .or_else(|| path.strip_suffix("/query/v1"))
            .map(str::to_string)
    };
    if let Some(path) = stripped {
        base.set_path(&path);
    }
    base
}

impl Transport {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_hooks(base_url, TransportHooks::default())
    }

    pub fn with_hooks(base_url: &str, hooks: TransportHooks) -> Result<Self, TransportError> {
        let base = normalize_base(Url::parse(base_url)?);
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http, base, hooks })
    }

    fn join(&self, path: &str) -> Result<Url, TransportError> {
        Ok(self.base.join(path)?)
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, TransportError> {
        let mut url = self.join(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        self.execute(self.http.get(url.clone()), "GET", &url).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, TransportError> {
        let url = self.join(path)?;
        let request = self.http.post(url.clone()).json(body);
        self.execute(request, "POST", &url).await
    }

    /// `getTransactionByHash`-style calls need to distinguish 404 from other
    /// failures; this variant returns `Ok(None)` on a 404 instead of erroring.
    pub async fn post_json_optional<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<T>, TransportError> {
        match self.post_json::<B, T>(path, body).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        method: &str,
        url: &Url,
    ) -> Result<T, TransportError> {
        if let Some(hook) = &self.hooks.on_request {
            hook(method, url.as_str());
        }
        tracing::debug!(method, url = %url, "ledger_core: sending rpc request");

        let start = Instant::now();
        let result = self.execute_inner::<T>(request, method, url).await;
        let duration = start.elapsed();

        match &result {
            Ok(_) => self.fire_response_hooks(duration, 200, true),
            Err(TransportError::RequestFailed(f)) => {
                self.fire_response_hooks(duration, f.status, false);
            }
            Err(_) => self.fire_response_hooks(duration, 0, false),
        }
        if let Err(err) = &result {
            if let Some(hook) = &self.hooks.on_error {
                hook(err);
            }
            tracing::warn!(method, url = %url, error = %err, "ledger_core: rpc request failed");
        }
        result
    }

    async fn execute_inner<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        method: &str,
        url: &Url,
    ) -> Result<T, TransportError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(TransportError::RequestFailed(Box::new(RequestFailure {
                url: url.to_string(),
                method: method.to_string(),
                status: status.as_u16(),
                status_text: status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string(),
                body_text,
            })));
        }
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|err| TransportError::InvalidJson(err.to_string()))
    }

    fn fire_response_hooks(&self, duration: Duration, status: u16, ok: bool) {
        if let Some(hook) = &self.hooks.on_response {
            hook(duration.as_millis() as u64, status, ok);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_live_suffix() {
        let base = Url::parse("https://rpc.example.test/live/v1").unwrap();
        assert_eq!(normalize_base(base).as_str(), "https://rpc.example.test/");
    }

    #[test]
    fn normalize_strips_query_suffix() {
        let base = Url::parse("https://rpc.example.test/query/v1").unwrap();
        assert_eq!(normalize_base(base).as_str(), "https://rpc.example.test/");
    }

    #[test]
    fn normalize_leaves_bare_base_untouched() {
        let base = Url::parse("https://rpc.example.test/").unwrap();
        assert_eq!(normalize_base(base).as_str(), "https://rpc.example.test/");
    }
}
