use async_trait::async_trait;
use serde_json::Value;

use crate::errors::FetchError;

/// One named GET against the remote data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    name: String,
    path: String,
    query: Vec<(String, String)>,
}

impl RequestSpec {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }
}

/// Ordered set of named sub-requests that make up one view's fetch cycle.
///
/// Names are unique; adding a request under an existing name replaces the
/// earlier descriptor in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchPlan {
    requests: Vec<RequestSpec>,
}

impl FetchPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, request: RequestSpec) -> Self {
        match self.requests.iter_mut().find(|r| r.name == request.name) {
            Some(existing) => *existing = request,
            None => self.requests.push(request),
        }
        self
    }

    pub fn requests(&self) -> &[RequestSpec] {
        &self.requests
    }

    pub fn names(&self) -> Vec<String> {
        self.requests.iter().map(|r| r.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Read side of the REST API as seen by the refresh core.
/// Real implementation: `HttpSource`. Tests use a scripted double.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn fetch(&self, request: &RequestSpec) -> Result<Value, FetchError>;
}

/// `RemoteSource` over HTTP via `reqwest`.
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl RemoteSource for HttpSource {
    async fn fetch(&self, request: &RequestSpec) -> Result<Value, FetchError> {
        let path = request.path().to_string();
        let resp = self
            .client
            .get(self.url_for(request.path()))
            .header("Accept", "application/json")
            .query(request.query())
            .send()
            .await
            .map_err(|e| FetchError::Network {
                path: path.clone(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Server {
                path,
                status: status.as_u16(),
            });
        }

        resp.json::<Value>().await.map_err(|e| FetchError::Decode {
            path,
            message: e.to_string(),
        })
    }
}
