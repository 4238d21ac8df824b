//! Digest-authenticated HTTP client for camera control endpoints

use super::challenge::DigestChallenge;
use super::types::Credentials;
use crate::error::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Client, Method, Response, StatusCode, Url};
use std::sync::Arc;
use std::time::Duration;

/// Produces the client nonce for each authorized request
pub type CnonceSource = Arc<dyn Fn() -> String + Send + Sync>;

/// A request that can be sent twice (probe, then authorized retry)
#[derive(Debug, Clone)]
pub struct DigestRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

impl DigestRequest {
    pub fn new(method: Method, url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| Error::Validation(format!("invalid url {}: {}", url, e)))?;

        Ok(Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        })
    }

    pub fn get(url: &str) -> Result<Self> {
        Self::new(Method::GET, url)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// JSON body with matching content type
    pub fn json(self, value: &serde_json::Value) -> Result<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(self
            .header(
                reqwest::header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )
            .body(body))
    }

    /// Path plus query string, as used for the Digest `uri` field
    pub fn digest_uri(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }
}

/// HTTP Digest Authentication client (RFC 2617, qop=auth)
///
/// Every call performs its own handshake: an unauthenticated probe, then at
/// most one authorized retry. No challenge state is kept between calls.
#[derive(Clone)]
pub struct DigestAuthClient {
    client: Client,
    cnonce: CnonceSource,
}

impl DigestAuthClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            cnonce: Arc::new(random_cnonce),
        }
    }

    /// Replace the client nonce generator
    pub fn with_cnonce_source(mut self, source: CnonceSource) -> Self {
        self.cnonce = source;
        self
    }

    /// Send `request`, answering a Digest challenge if the server issues one.
    ///
    /// The final response is returned as-is, whatever its status; a second
    /// 401 on the authorized retry is not retried.
    pub async fn authenticated_request(
        &self,
        request: &DigestRequest,
        credentials: &Credentials,
    ) -> Result<Response> {
        let url = request.url.as_str();

        let probe = self.send(request, None).await?;
        if probe.status() != StatusCode::UNAUTHORIZED {
            tracing::debug!(url = %url, status = %probe.status(), "No authentication required");
            return Ok(probe);
        }

        let challenge = {
            let values: Vec<&str> = probe
                .headers()
                .get_all(WWW_AUTHENTICATE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect();
            DigestChallenge::from_headers(values).map_err(|message| Error::Protocol {
                url: url.to_string(),
                message,
            })?
        };

        let (username, password) = credentials
            .pair()
            .ok_or_else(|| Error::MissingCredentials(url.to_string()))?;

        let cnonce = (self.cnonce)();
        let authorization = challenge
            .respond(
                request.method.as_str(),
                &request.digest_uri(),
                username,
                password,
                &cnonce,
            )
            .header_value();
        let authorization = HeaderValue::from_str(&authorization).map_err(|e| Error::Protocol {
            url: url.to_string(),
            message: format!("cannot encode Authorization header: {}", e),
        })?;

        tracing::debug!(
            url = %url,
            realm = %challenge.realm,
            algorithm = challenge.algorithm.as_str(),
            "Answering Digest challenge"
        );

        let response = self.send(request, Some(authorization)).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(url = %url, "Digest credentials rejected");
        }

        Ok(response)
    }

    async fn send(
        &self,
        request: &DigestRequest,
        authorization: Option<HeaderValue>,
    ) -> Result<Response> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        Ok(builder.send().await?)
    }
}

fn random_cnonce() -> String {
    format!("{:016x}", rand::random::<u64>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CHALLENGE: &str = r#"Digest realm="R", nonce="N", qop="auth""#;

    fn client() -> DigestAuthClient {
        DigestAuthClient::new(Duration::from_secs(5))
            .unwrap()
            .with_cnonce_source(Arc::new(|| "0a4f113b".to_string()))
    }

    fn challenge(value: &str) -> ResponseTemplate {
        ResponseTemplate::new(401).insert_header("WWW-Authenticate", value)
    }

    #[test]
    fn test_digest_uri() {
        let req = DigestRequest::get("http://10.0.0.5:8080/axis-cgi/com/ptz.cgi?pan=1#frag").unwrap();
        assert_eq!(req.digest_uri(), "/axis-cgi/com/ptz.cgi?pan=1");

        let req = DigestRequest::get("http://10.0.0.5/axis-cgi/restart.cgi").unwrap();
        assert_eq!(req.digest_uri(), "/axis-cgi/restart.cgi");
    }

    #[test]
    fn test_random_cnonce_is_fresh() {
        let a = random_cnonce();
        let b = random_cnonce();
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_passthrough_without_challenge() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/axis-cgi/com/ptz.cgi"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .expect(1)
            .mount(&server)
            .await;

        let req = DigestRequest::get(&format!("{}/axis-cgi/com/ptz.cgi?pan=1", server.uri())).unwrap();
        let resp = client()
            .authenticated_request(&req, &Credentials::default())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_challenge_then_authorized_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/axis-cgi/com/ptz.cgi"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/axis-cgi/com/ptz.cgi"))
            .and(query_param("pan", "1"))
            .respond_with(challenge(CHALLENGE))
            .expect(1)
            .mount(&server)
            .await;

        let req = DigestRequest::get(&format!("{}/axis-cgi/com/ptz.cgi?pan=1", server.uri())).unwrap();
        let resp = client()
            .authenticated_request(&req, &Credentials::new("u", "p"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.text().await.unwrap(), "OK");

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].headers.get("authorization").is_none());

        let auth = requests[1]
            .headers
            .get("authorization")
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(
            auth,
            "Digest username=\"u\", realm=\"R\", nonce=\"N\", uri=\"/axis-cgi/com/ptz.cgi?pan=1\", \
             algorithm=MD5, response=\"36f8151d6c6eaa27a775e0fddae40114\", qop=auth, nc=00000001, \
             cnonce=\"0a4f113b\""
        );
    }

    #[tokio::test]
    async fn test_retry_resends_body_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(challenge(CHALLENGE))
            .mount(&server)
            .await;

        let req = DigestRequest::new(Method::POST, &format!("{}/axis-cgi/param.cgi", server.uri()))
            .unwrap()
            .header(
                HeaderName::from_static("x-request-id"),
                HeaderValue::from_static("abc"),
            )
            .json(&serde_json::json!({ "method": "reboot" }))
            .unwrap();

        let resp = client()
            .authenticated_request(&req, &Credentials::new("u", "p"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        let retry = &requests[1];
        assert_eq!(retry.headers.get("x-request-id").unwrap(), "abc");
        assert_eq!(retry.headers.get("content-type").unwrap(), "application/json");
        let body: serde_json::Value = serde_json::from_slice(&retry.body).unwrap();
        assert_eq!(body["method"], "reboot");
    }

    #[tokio::test]
    async fn test_second_401_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(challenge(CHALLENGE))
            .expect(2)
            .mount(&server)
            .await;

        let req = DigestRequest::get(&format!("{}/axis-cgi/restart.cgi", server.uri())).unwrap();
        let resp = client()
            .authenticated_request(&req, &Credentials::new("u", "wrong"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_upstream_error_status_returned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(500))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(challenge(CHALLENGE))
            .mount(&server)
            .await;

        let req = DigestRequest::get(&format!("{}/axis-cgi/restart.cgi", server.uri())).unwrap();
        let resp = client()
            .authenticated_request(&req, &Credentials::new("u", "p"))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_challenge_without_nonce() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(challenge(r#"Digest realm="R", qop="auth""#))
            .expect(1)
            .mount(&server)
            .await;

        let req = DigestRequest::get(&format!("{}/axis-cgi/com/ptz.cgi?pan=1", server.uri())).unwrap();
        let result = client()
            .authenticated_request(&req, &Credentials::new("u", "p"))
            .await;

        match result {
            Err(Error::Protocol { url, message }) => {
                assert!(url.contains("/axis-cgi/com/ptz.cgi"));
                assert!(message.contains("nonce"));
            }
            other => panic!("expected protocol error, got {:?}", other.map(|r| r.status())),
        }
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_401_without_challenge_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let req = DigestRequest::get(&format!("{}/", server.uri())).unwrap();
        let result = client()
            .authenticated_request(&req, &Credentials::new("u", "p"))
            .await;
        assert!(matches!(result, Err(Error::Protocol { .. })));
    }

    #[tokio::test]
    async fn test_basic_only_challenge() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(challenge(r#"Basic realm="R""#))
            .expect(1)
            .mount(&server)
            .await;

        let req = DigestRequest::get(&format!("{}/", server.uri())).unwrap();
        let result = client()
            .authenticated_request(&req, &Credentials::new("u", "p"))
            .await;
        assert!(matches!(result, Err(Error::Protocol { .. })));
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(challenge(CHALLENGE))
            .expect(1)
            .mount(&server)
            .await;

        let req = DigestRequest::get(&format!("{}/axis-cgi/restart.cgi", server.uri())).unwrap();
        let result = client()
            .authenticated_request(
                &req,
                &Credentials {
                    username: Some("u".to_string()),
                    password: None,
                },
            )
            .await;

        assert!(matches!(result, Err(Error::MissingCredentials(_))));
    }
}
