use crate::error::RequestError;
use crate::ids::RequestId;
use crate::params::ValuePool;
use http::Method;
use may_minihttp::Request;
use std::collections::HashMap;
use std::io::Read;
use tracing::debug;

/// Default cap on a form body, the classic 10 MiB limit.
pub const DEFAULT_MAX_FORM_BYTES: usize = 10 << 20;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// An owned, transport-independent HTTP request.
///
/// The server adapter builds one per inbound request; tests build them
/// directly with [`HttpRequest::new`] and the `with_*` helpers.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Request id used for log correlation
    pub request_id: RequestId,
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Request path without the query string
    pub path: String,
    /// Raw query string (without the leading `?`)
    pub query: String,
    /// HTTP headers (lowercase keys)
    pub headers: HashMap<String, String>,
    /// Parsed cookies from the Cookie header
    pub cookies: HashMap<String, String>,
    /// Raw request body
    pub body: Vec<u8>,
    /// Values captured from `{name}` segments of the matched route
    pub path_params: Vec<(String, String)>,
}

impl HttpRequest {
    /// Build a request for `target`, a path with an optional query string.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = split_target(target);
        Self {
            request_id: RequestId::new(),
            method,
            path: path.to_string(),
            query: query.to_string(),
            headers: HashMap::new(),
            cookies: HashMap::new(),
            body: Vec::new(),
            path_params: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self.cookies = parse_cookies(&self.headers);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Set an url-encoded form body along with its content type.
    #[must_use]
    pub fn with_form(self, pairs: &[(&str, &str)]) -> Self {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.with_header("content-type", FORM_URLENCODED)
            .with_body(body)
    }

    /// The request target as received: path plus query string.
    #[must_use]
    pub fn url(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }

    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    #[inline]
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Query string values, multi-valued and in order of appearance.
    #[must_use]
    pub fn query_values(&self) -> ValuePool {
        let mut values = ValuePool::new();
        for (k, v) in url::form_urlencoded::parse(self.query.as_bytes()) {
            values.add(k.into_owned(), v.into_owned());
        }
        values
    }

    /// Parse the body as an url-encoded form.
    ///
    /// Bodies of any other content type yield no values. A missing content
    /// type is treated as `application/octet-stream`.
    pub fn parse_form(&self, max_bytes: usize) -> Result<ValuePool, RequestError> {
        let content_type = self
            .header("content-type")
            .unwrap_or("application/octet-stream");
        let mime = content_type
            .split(';')
            .next()
            .map(str::trim)
            .unwrap_or_default()
            .to_ascii_lowercase();
        if mime.is_empty() || !mime.contains('/') {
            return Err(RequestError::InvalidContentType(content_type.to_string()));
        }
        if mime != FORM_URLENCODED {
            debug!(content_type = %mime, "Body is not an url-encoded form, skipping");
            return Ok(ValuePool::new());
        }
        if self.body.len() > max_bytes {
            return Err(RequestError::BodyTooLarge {
                size: self.body.len(),
                limit: max_bytes,
            });
        }
        check_escapes(&self.body)?;

        let mut values = ValuePool::new();
        for (k, v) in url::form_urlencoded::parse(&self.body) {
            values.add(k.into_owned(), v.into_owned());
        }
        debug!(field_count = values.len(), "Form body parsed");
        Ok(values)
    }
}

/// Convert a `may_minihttp::Request` into an owned [`HttpRequest`].
///
/// The body is read fully; an unreadable body is treated as empty.
pub fn parse_request(req: Request) -> Result<HttpRequest, http::method::InvalidMethod> {
    let method = Method::from_bytes(req.method().as_bytes())?;
    let (path, query) = split_target(req.path());
    let (path, query) = (path.to_string(), query.to_string());

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();
    let cookies = parse_cookies(&headers);
    let request_id =
        RequestId::from_header_or_new(headers.get("x-request-id").map(String::as_str));
    debug!(
        header_count = headers.len(),
        cookie_count = cookies.len(),
        "Headers extracted"
    );

    let mut body = Vec::new();
    if let Err(e) = req.body().read_to_end(&mut body) {
        debug!(error = %e, "Request body unreadable, treating as empty");
        body.clear();
    }

    Ok(HttpRequest {
        request_id,
        method,
        path,
        query,
        headers,
        cookies,
        body,
        path_params: Vec::new(),
    })
}

/// Split a request target into path and query string.
pub fn split_target(target: &str) -> (&str, &str) {
    match target.split_once('?') {
        Some((path, query)) => (if path.is_empty() { "/" } else { path }, query),
        None => (if target.is_empty() { "/" } else { target }, ""),
    }
}

/// Extract cookies from a `cookie` header.
pub fn parse_cookies(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .get("cookie")
        .map(|c| {
            c.split(';')
                .filter_map(|pair| {
                    let mut parts = pair.trim().splitn(2, '=');
                    let name = parts.next()?.trim().to_string();
                    if name.is_empty() {
                        return None;
                    }
                    let value = parts.next().unwrap_or("").trim().to_string();
                    Some((name, value))
                })
                .collect()
        })
        .unwrap_or_default()
}

// Every '%' must introduce two hex digits.
fn check_escapes(body: &[u8]) -> Result<(), RequestError> {
    let mut i = 0;
    while i < body.len() {
        if body[i] == b'%' {
            let valid = body.len() > i + 2
                && body[i + 1].is_ascii_hexdigit()
                && body[i + 2].is_ascii_hexdigit();
            if !valid {
                return Err(RequestError::InvalidEscape(i));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}
