//! Client for the external address-parsing service.
//!
//! The service exposes `POST /split` taking `{"query": "..."}` and answering
//! with a JSON array of candidate segmentations. Only the first candidate
//! is used.
//!
//! The parser is an optional refinement: whenever it cannot be consulted
//! (connection refused, timeout, non-200 status, unreadable body) the whole
//! query is treated as a road name and resolution continues.

use async_trait::async_trait;
use osm_geocoder_models::ParsedAddress;
use reqwest::{StatusCode, Url};
use serde::Serialize;
use serde_json::Value;

use crate::deadline::Deadline;

/// Splits a free-text query into address components.
#[async_trait]
pub trait AddressParser: Send + Sync {
    /// Parses `raw`. Never fails: implementations degrade to
    /// [`ParsedAddress::road_only`].
    async fn parse(&self, raw: &str, deadline: Deadline) -> ParsedAddress;
}

/// Reasons the service could not produce a segmentation.
#[derive(Debug, thiserror::Error)]
enum SplitError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned status {0}")]
    Status(StatusCode),

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Serialize)]
struct SplitRequest<'a> {
    query: &'a str,
}

/// [`AddressParser`] backed by the HTTP segmentation service.
#[derive(Debug, Clone)]
pub struct HttpAddressParser {
    client: reqwest::Client,
    split_url: String,
}

impl HttpAddressParser {
    /// Creates a client for the service rooted at `base_url`.
    #[must_use]
    pub fn new(base_url: &Url) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Creates a client reusing an existing `reqwest` client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: &Url) -> Self {
        let split_url = format!("{}/split", base_url.as_str().trim_end_matches('/'));
        Self { client, split_url }
    }

    /// The endpoint requests are sent to.
    #[must_use]
    pub fn split_url(&self) -> &str {
        &self.split_url
    }

    async fn split(
        &self,
        raw: &str,
        deadline: Deadline,
    ) -> Result<Option<ParsedAddress>, SplitError> {
        let mut request = self
            .client
            .post(&self.split_url)
            .json(&SplitRequest { query: raw });

        if let Some(remaining) = deadline.remaining() {
            if remaining.is_zero() {
                return Err(SplitError::DeadlineExceeded);
            }
            request = request.timeout(remaining);
        }

        let resp = request.send().await?;

        if resp.status() != StatusCode::OK {
            return Err(SplitError::Status(resp.status()));
        }

        // Only the first candidate is decoded, so a malformed later entry
        // cannot discard a usable first one.
        let candidates: Vec<Value> = resp.json().await?;
        Ok(candidates
            .first()
            .and_then(candidate_to_address)
            .filter(|parsed| !parsed.is_empty()))
    }
}

/// Reads one segmentation leniently.
///
/// Components may arrive as strings or numbers (`"house_number": 5`); any
/// other shape leaves that component absent. `None` if the candidate is not
/// a JSON object.
fn candidate_to_address(candidate: &Value) -> Option<ParsedAddress> {
    let fields = candidate.as_object()?;
    let component = |name: &str| match fields.get(name)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    };

    Some(
        ParsedAddress {
            road: component("road"),
            house_number: component("house_number"),
            postcode: component("postcode"),
            city: component("city"),
        }
        .normalized(),
    )
}

#[async_trait]
impl AddressParser for HttpAddressParser {
    async fn parse(&self, raw: &str, deadline: Deadline) -> ParsedAddress {
        match self.split(raw, deadline).await {
            Ok(Some(parsed)) => {
                log::debug!("Parsed {raw:?} into {parsed:?}");
                parsed
            }
            Ok(None) => {
                log::debug!("Address parser returned no candidates for {raw:?}, using it as road");
                ParsedAddress::road_only(raw)
            }
            Err(e) => {
                log::warn!("Address parser unavailable ({e}), using {raw:?} as road");
                ParsedAddress::road_only(raw)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
    use tokio::net::TcpListener;

    use super::*;

    /// Serves exactly one HTTP response and returns the captured request.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (Url, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request
        });

        (Url::parse(&format!("http://{addr}")).unwrap(), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0_u8; 1024];

        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }

        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn falls_back_to_road_when_unreachable() {
        // Bind then drop to get a port with nothing listening.
        let addr = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();
        let parser = HttpAddressParser::new(&Url::parse(&format!("http://{addr}")).unwrap());

        let parsed = parser.parse("Main St 5", Deadline::none()).await;
        assert_eq!(parsed, ParsedAddress::road_only("Main St 5"));
        assert!(parsed.house_number.is_none());
        assert!(parsed.postcode.is_none());
        assert!(parsed.city.is_none());
    }

    #[tokio::test]
    async fn uses_first_candidate_on_success() {
        let (url, server) = serve_once(
            "200 OK",
            r#"[{"road": "Main St", "house_number": "5", "postcode": "12345"}, {"road": "Other"}]"#,
        )
        .await;
        let parser = HttpAddressParser::new(&url);

        let parsed = parser.parse("Main St 5, 12345", Deadline::none()).await;
        assert_eq!(parsed.road.as_deref(), Some("Main St"));
        assert_eq!(parsed.house_number.as_deref(), Some("5"));
        assert_eq!(parsed.postcode.as_deref(), Some("12345"));
        assert!(parsed.city.is_none());

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /split "));
        assert!(request.contains(r#"{"query":"Main St 5, 12345"}"#));
    }

    #[tokio::test]
    async fn accepts_numeric_components() {
        let (url, _server) = serve_once(
            "200 OK",
            r#"[{"road": "Main St", "house_number": 5, "postcode": 12345, "city": null}]"#,
        )
        .await;
        let parser = HttpAddressParser::new(&url);

        let parsed = parser.parse("Main St 5, 12345", Deadline::none()).await;
        assert_eq!(parsed.road.as_deref(), Some("Main St"));
        assert_eq!(parsed.house_number.as_deref(), Some("5"));
        assert_eq!(parsed.postcode.as_deref(), Some("12345"));
        assert!(parsed.city.is_none());
    }

    #[tokio::test]
    async fn malformed_later_candidate_does_not_discard_first() {
        let (url, _server) = serve_once(
            "200 OK",
            r#"[{"road": "Main St", "house_number": "5"}, "garbage", {"road": ["x"]}]"#,
        )
        .await;
        let parser = HttpAddressParser::new(&url);

        let parsed = parser.parse("Main St 5", Deadline::none()).await;
        assert_eq!(parsed.road.as_deref(), Some("Main St"));
        assert_eq!(parsed.house_number.as_deref(), Some("5"));
    }

    #[test]
    fn non_object_candidate_is_unusable() {
        assert!(candidate_to_address(&Value::String("Main St".to_string())).is_none());
        assert_eq!(
            candidate_to_address(&serde_json::json!({"road": "  ", "city": true})),
            Some(ParsedAddress::default())
        );
    }

    #[tokio::test]
    async fn falls_back_on_error_status() {
        let (url, _server) = serve_once("500 Internal Server Error", "{}").await;
        let parser = HttpAddressParser::new(&url);

        let parsed = parser.parse("Main St 5", Deadline::none()).await;
        assert_eq!(parsed, ParsedAddress::road_only("Main St 5"));
    }

    #[tokio::test]
    async fn falls_back_on_empty_candidate_list() {
        let (url, _server) = serve_once("200 OK", "[]").await;
        let parser = HttpAddressParser::new(&url);

        let parsed = parser.parse("Main St 5", Deadline::none()).await;
        assert_eq!(parsed, ParsedAddress::road_only("Main St 5"));
    }

    #[tokio::test]
    async fn falls_back_when_deadline_passes() {
        // Accepts but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let parser = HttpAddressParser::new(&Url::parse(&format!("http://{addr}")).unwrap());
        let parsed = parser
            .parse("Main St 5", Deadline::after(Duration::from_millis(100)))
            .await;
        assert_eq!(parsed, ParsedAddress::road_only("Main St 5"));
    }

    #[test]
    fn split_url_ignores_trailing_slash() {
        let parser = HttpAddressParser::new(&Url::parse("http://localhost:8083/").unwrap());
        assert_eq!(parser.split_url(), "http://localhost:8083/split");

        let parser = HttpAddressParser::new(&Url::parse("http://localhost/api/").unwrap());
        assert_eq!(parser.split_url(), "http://localhost/api/split");
    }
}
