// Transport boundary.
//
// The adapter core only ever hands a flat parameter map to something that
// can perform the signed query call and give back a parsed document or a
// structured backend error. `HttpTransport` is the reference
// implementation used by the integration tests; request signing lives
// below this boundary and is not implemented here.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::context::ProviderContext;
use crate::error::Error;

use firebridge_xml::Element;

/// Flat, string-keyed wire parameters for one call.
///
/// Ordered map so encoded request bodies are deterministic.
pub type Params = BTreeMap<String, String>;

/// Wire version sent with every query call.
const WIRE_VERSION: &str = "2012-07-20";

/// Something that can execute one query-API call.
///
/// Implementations must report structured backend failures as
/// [`Error::Backend`] so the adapter can special-case the duplicate-rule
/// and invalid-group codes. No retries happen at or below this boundary.
pub trait Transport {
    fn invoke(
        &self,
        action: &str,
        params: &Params,
    ) -> impl Future<Output = Result<Element, Error>> + Send;
}

/// HTTP transport POSTing form-encoded query parameters.
///
/// Adds the standard `Action` / `Version` / `AWSAccessKeyId` parameters
/// to every call and translates the backend's XML error envelope into
/// [`Error::Backend`].
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: Url,
    access_key_id: String,
}

impl HttpTransport {
    /// Build a transport for the given session context.
    pub fn new(ctx: &ProviderContext) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("firebridge/0.1.0")
            .build()
            .map_err(Error::Transport)?;
        Ok(Self {
            http,
            endpoint: ctx.endpoint().clone(),
            access_key_id: ctx.credentials().access_key_id.clone(),
        })
    }

    /// Wrap an existing `reqwest::Client` (tests, custom TLS setups).
    pub fn from_reqwest(
        endpoint: Url,
        access_key_id: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            http,
            endpoint,
            access_key_id: access_key_id.into(),
        }
    }

    /// Parameters every call carries regardless of action.
    fn standard_params(&self, action: &str, params: &Params) -> Params {
        let mut merged = params.clone();
        merged.insert("Action".to_string(), action.to_string());
        merged.insert("Version".to_string(), WIRE_VERSION.to_string());
        merged.insert("AWSAccessKeyId".to_string(), self.access_key_id.clone());
        merged
    }

    /// Translate a non-success response body.
    ///
    /// The backend wraps failures as
    /// `<Response><Errors><Error><Code/><Message/></Error></Errors></Response>`;
    /// anything that doesn't parse that way becomes a codeless backend
    /// error carrying the HTTP status.
    fn backend_error(status: reqwest::StatusCode, body: &str) -> Error {
        if let Ok(doc) = firebridge_xml::parse(body.as_bytes()) {
            if let Some(err) = doc.find_all("Error").into_iter().next() {
                return Error::Backend {
                    code: err.child_text("Code").map(str::to_string),
                    message: err
                        .child_text("Message")
                        .map_or_else(|| format!("HTTP {status}"), str::to_string),
                };
            }
        }
        // Truncate on a char boundary; byte 200 may fall mid-character.
        let mut cut = body.len().min(200);
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        Error::Backend {
            code: None,
            message: format!("HTTP {status}: {}", &body[..cut]),
        }
    }
}

impl Transport for HttpTransport {
    async fn invoke(&self, action: &str, params: &Params) -> Result<Element, Error> {
        let url = self.endpoint.clone();
        debug!(action, %url, "POST query call");

        let form = self.standard_params(action, params);
        let resp = self
            .http
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            return Err(Self::backend_error(status, &body));
        }
        Ok(firebridge_xml::parse(body.as_bytes())?)
    }
}

#[cfg(test)]
mod tests {
    use super::{HttpTransport, Params};

    #[test]
    fn standard_params_are_merged_in() {
        let transport = HttpTransport::from_reqwest(
            url::Url::parse("https://compute.example.test/").unwrap(),
            "AKID",
            reqwest::Client::new(),
        );
        let mut params = Params::new();
        params.insert("GroupName".to_string(), "web".to_string());

        let merged = transport.standard_params("CreateSecurityGroup", &params);
        assert_eq!(merged["Action"], "CreateSecurityGroup");
        assert_eq!(merged["AWSAccessKeyId"], "AKID");
        assert_eq!(merged["GroupName"], "web");
        assert!(merged.contains_key("Version"));
    }

    #[test]
    fn error_envelope_is_translated() {
        let body = r#"<Response><Errors><Error>
            <Code>InvalidGroup.NotFound</Code>
            <Message>The security group does not exist</Message>
        </Error></Errors><RequestID>req-1</RequestID></Response>"#;

        let err = HttpTransport::backend_error(reqwest::StatusCode::BAD_REQUEST, body);
        assert_eq!(err.backend_code(), Some("InvalidGroup.NotFound"));
        assert!(err.is_invalid_group());
    }

    #[test]
    fn unparseable_error_body_keeps_the_status() {
        let err = HttpTransport::backend_error(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "<html>gateway timeout",
        );
        assert_eq!(err.backend_code(), None);
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn preview_truncation_lands_on_char_boundaries() {
        // A multibyte character straddling the 200-byte cutoff must not
        // panic the error path.
        let body = format!("{}é gateway timeout", "x".repeat(199));
        let err =
            HttpTransport::backend_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, &body);
        assert_eq!(err.backend_code(), None);
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(!msg.contains('é'));
    }
}
