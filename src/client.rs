use encoding_rs::{Encoding, WINDOWS_1252};
use reqwest::StatusCode;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderValue, LOCATION, ORIGIN, REFERER,
    USER_AGENT,
};
use reqwest::redirect::Policy;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::{LottoError, Result};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Headers the portal expects on every request. The form content type is
/// not set here; `reqwest` adds it on POSTs only, and the portal rejects
/// GETs that carry one.
fn baseline_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(ORIGIN, HeaderValue::from_static("https://dhlottery.co.kr"));
    headers.insert(REFERER, HeaderValue::from_static("https://dhlottery.co.kr/"));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    headers
}

/// A portal response with its body already charset-decoded.
#[derive(Debug)]
pub struct DecodedResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub text: String,
    /// Present when the response declared JSON and the body parsed as such.
    pub json: Option<Value>,
}

impl DecodedResponse {
    pub fn ensure_ok(self) -> Result<DecodedResponse> {
        if self.status.is_success() {
            return Ok(self);
        }
        let body: String = self.text.trim().chars().take(300).collect();
        Err(LottoError::Http {
            status: self.status.as_u16(),
            body,
        })
    }
}

/// Session-scoped portal client: one cookie jar for the whole login/buy
/// flow, redirects surfaced to callers instead of followed.
pub struct LottoClient {
    http: reqwest::Client,
}

impl LottoClient {
    pub fn new() -> Result<LottoClient> {
        let http = reqwest::Client::builder()
            .default_headers(baseline_headers())
            .cookie_store(true)
            .redirect(Policy::none())
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(LottoClient { http })
    }

    pub async fn get(&self, url: &str) -> Result<DecodedResponse> {
        self.execute(self.http.get(url)).await
    }

    pub async fn post_form<T: Serialize + ?Sized>(
        &self,
        url: &str,
        form: &T,
    ) -> Result<DecodedResponse> {
        self.execute(self.http.post(url).form(form)).await
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<DecodedResponse> {
        let response = request.send().await?;
        let status = response.status();
        let location = header_text(response.headers(), LOCATION);
        let content_type = header_text(response.headers(), CONTENT_TYPE).unwrap_or_default();

        // Error bodies go through the same decoding so callers can read the
        // server's diagnostic text.
        let bytes = response.bytes().await?;
        let text = decode_body(&bytes, &content_type);
        let json = if content_type.contains("json") {
            serde_json::from_str(&text).ok()
        } else {
            None
        };

        Ok(DecodedResponse {
            status,
            location,
            text,
            json,
        })
    }
}

/// Cookie-less client for endpoints that must not share the session jar.
pub fn bare_client() -> Result<reqwest::Client> {
    let http = reqwest::Client::builder()
        .default_headers(baseline_headers())
        .timeout(REQUEST_TIMEOUT)
        .build()?;
    Ok(http)
}

fn header_text(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

/// The portal mixes EUC-KR pages with UTF-8 APIs, so the declared charset
/// decides. Unknown or missing charsets fall back to windows-1252, which
/// decodes any byte sequence.
fn decode_body(bytes: &[u8], content_type: &str) -> String {
    let encoding = charset_of(content_type)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(WINDOWS_1252);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

fn charset_of(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let part = part.trim().to_ascii_lowercase();
        part.strip_prefix("charset=")
            .map(|value| value.trim_matches('"').to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_is_read_from_content_type() {
        assert_eq!(
            charset_of("text/html; charset=euc-kr"),
            Some("euc-kr".to_string())
        );
        assert_eq!(
            charset_of("application/json;CHARSET=\"UTF-8\""),
            Some("utf-8".to_string())
        );
        assert_eq!(charset_of("text/html"), None);
    }

    #[test]
    fn euc_kr_bodies_are_decoded() {
        // "가나" in EUC-KR
        let bytes = [0xB0, 0xA1, 0xB3, 0xAA];
        assert_eq!(decode_body(&bytes, "text/html; charset=euc-kr"), "가나");
    }

    #[test]
    fn unknown_charset_still_decodes() {
        let bytes = [0xB0, 0xA1];
        let text = decode_body(&bytes, "text/html; charset=klingon");
        assert_eq!(text.chars().count(), 2);
    }
}
