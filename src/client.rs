use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The payload submitted to the analysis endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisRequest {
    /// Source of the single function under analysis.
    pub test_func: String,
    /// Whether the caller wants a suggested patch in the response.
    pub patch_requested: bool,
    /// Installable packages the flattened code depends on, in order.
    pub pip_imports: Vec<String>,
    /// The whole file, normalized and self-contained.
    pub test_code: String,
}

/// Blocking client for the remote analysis service.
///
/// The token is treated as an opaque bearer credential; acquiring and
/// caching it is the caller's business. There is no retry: a timeout or a
/// non-success status aborts the operation with a `Service` error.
pub struct AnalysisClient {
    url: String,
    token: String,
    timeout: Duration,
}

/// The advertised turnaround is about a minute; the request deadline is
/// five times that.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

impl AnalysisClient {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Submits the payload and returns the response body as text.
    pub fn analyze(&self, request: &AnalysisRequest) -> Result<String> {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(self.timeout))
            .build()
            .into();

        let mut response = agent
            .post(&self.url)
            .header("Authorization", &format!("Bearer {}", self.token))
            .send_json(request)
            .map_err(|e| match e {
                ureq::Error::StatusCode(code) => {
                    Error::Service(format!("server returned status {code}"))
                }
                other => Error::Service(format!("request failed: {other}")),
            })?;

        response
            .body_mut()
            .read_to_string()
            .map_err(|e| Error::Service(format!("failed to read response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_expected_shape() {
        let request = AnalysisRequest {
            test_func: "def hotdog(a, b):\n    return a + b".to_string(),
            patch_requested: true,
            pip_imports: vec!["numpy".to_string(), "pandas".to_string()],
            test_code: "import numpy\n".to_string(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["patch_requested"], true);
        assert_eq!(json["pip_imports"][0], "numpy");
        assert!(json["test_func"].as_str().unwrap().contains("hotdog"));
        assert!(json.get("test_code").is_some());

        let back: AnalysisRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, request);
    }
}
