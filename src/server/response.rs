use dashmap::DashMap;
use may_minihttp::Response;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::io;
use std::sync::Arc;
use tracing::{debug, warn};

/// Canonical reason phrase, empty for codes without one.
pub(crate) fn status_reason(status: u16) -> &'static str {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}

const DEFAULT_CONTENT_TYPE: &str = "Content-Type: text/html; charset=utf-8";

type HeaderList = SmallVec<[(String, String); 4]>;

#[derive(Debug, Default)]
struct ResponseState {
    status: Option<u16>,
    headers: HeaderList,
    body: Vec<u8>,
}

/// Response sink shared by everything that takes part in one request.
///
/// Cloning yields another handle to the same response, so the controller
/// instance, handler parameters and action results all write into one place.
/// The first status written wins; a body write without a prior status
/// commits `200`. Only [`ResponseWriter::override_status`] changes it later.
#[derive(Clone, Default)]
pub struct ResponseWriter {
    inner: Arc<Mutex<ResponseState>>,
}

impl std::fmt::Debug for ResponseWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("ResponseWriter")
            .field("status", &state.status)
            .field("headers", &state.headers)
            .field("body_len", &state.body.len())
            .finish()
    }
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit the status code. Later calls are ignored.
    pub fn write_status(&self, status: u16) {
        let mut state = self.inner.lock();
        match state.status {
            None => state.status = Some(status),
            Some(existing) if existing != status => {
                debug!(existing, ignored = status, "Status already written");
            }
            Some(_) => {}
        }
    }

    /// Replace whatever status was committed. The response is buffered
    /// until [`ResponseWriter::finish`], so a late error can still turn a
    /// partially written response into a 500.
    pub fn override_status(&self, status: u16) {
        let mut state = self.inner.lock();
        if let Some(existing) = state.status.replace(status) {
            if existing != status {
                debug!(existing, status, "Status overridden");
            }
        }
    }

    /// Set a header, replacing any previous value of the same name.
    pub fn set_header(&self, name: &str, value: impl Into<String>) {
        let mut state = self.inner.lock();
        if state.status.is_some() && !state.body.is_empty() {
            warn!(header = name, "Header set after the body was written");
        }
        state.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        state.headers.push((name.to_string(), value.into()));
    }

    pub fn write_body(&self, bytes: &[u8]) {
        let mut state = self.inner.lock();
        state.status.get_or_insert(200);
        state.body.extend_from_slice(bytes);
    }

    pub fn write_str(&self, s: &str) {
        self.write_body(s.as_bytes());
    }

    /// Status committed so far, `200` when nothing was written.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.inner.lock().status.unwrap_or(200)
    }

    #[must_use]
    pub fn is_status_written(&self) -> bool {
        self.inner.lock().status.is_some()
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        self.inner
            .lock()
            .headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        self.inner.lock().body.clone()
    }

    #[must_use]
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock().body).into_owned()
    }

    /// Take a snapshot of the response as written so far.
    #[must_use]
    pub fn finish(&self) -> HttpResponse {
        let mut state = self.inner.lock();
        HttpResponse {
            status: state.status.unwrap_or(200),
            headers: state.headers.to_vec(),
            body: std::mem::take(&mut state.body),
        }
    }
}

impl io::Write for ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_body(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A finished response, ready to be written to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or_default()
    }

    /// Write into a `may_minihttp` response.
    ///
    /// A non-empty body without a `Content-Type` is sent as HTML.
    pub fn write_to(self, res: &mut Response) {
        res.status_code(self.status as usize, status_reason(self.status));
        for (name, value) in &self.headers {
            res.header(intern_header(format!("{name}: {value}")));
        }
        if !self.body.is_empty() && self.header("Content-Type").is_none() {
            res.header(DEFAULT_CONTENT_TYPE);
        }
        res.body_vec(self.body);
    }
}

// may_minihttp only accepts `&'static str` header lines. Each distinct line is
// leaked once and reused afterwards.
static HEADER_LINES: Lazy<DashMap<String, &'static str>> = Lazy::new(DashMap::new);

fn intern_header(line: String) -> &'static str {
    if let Some(existing) = HEADER_LINES.get(&line) {
        return *existing;
    }
    let leaked: &'static str = Box::leak(line.clone().into_boxed_str());
    *HEADER_LINES.entry(line).or_insert(leaked)
}
