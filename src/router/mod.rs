//! # Router Module
//!
//! Path matching for the MVC dispatcher. The router is a plain mux: paths
//! are registered against a `(Controller, Action)` target, optionally for a
//! single HTTP method, and requests are resolved to one of three outcomes:
//!
//! - an action route (generated `/{controller}/{action}` paths and any
//!   pattern bound with `bind_url`),
//! - a static-file mount (first registered prefix that matches),
//! - nothing, which the dispatcher answers with the not-found result.
//!
//! Action routes are tried before static mounts. A path with routes for
//! other methods still matches so the dispatcher can apply its GET fallback.
//!
//! ## Example
//!
//! ```rust,ignore
//! use brrtmvc::router::{Router, Routed};
//! use brrtmvc::ids::{ControllerAction, Method};
//!
//! let mut router = Router::new();
//! router.register("/home/index", Some(Method::GET), ControllerAction::new("home", "index"));
//! match router.route(&Method::GET, "/home/index") {
//!     Routed::Action(m) => println!("{}", m.target),
//!     _ => unreachable!(),
//! }
//! ```

mod radix;
#[cfg(test)]
mod tests;

pub use radix::RadixRouter;

use crate::ids::{Action, Controller, ControllerAction};
use crate::static_files::StaticFiles;
use http::Method;
use std::fmt::Write as _;
use tracing::{debug, trace};

/// Result of matching a request path to an action route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub target: ControllerAction,
    /// Values captured by `{name}` segments, in path order.
    pub path_params: Vec<(String, String)>,
}

impl RouteMatch {
    /// Get a path parameter by name. The last occurrence wins.
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
struct StaticMount {
    prefix: String,
    files: StaticFiles,
}

/// Outcome of [`Router::route`].
#[derive(Debug)]
pub enum Routed<'a> {
    Action(RouteMatch),
    /// A static mount matched; `path` is the request path with the prefix stripped.
    Static { files: &'a StaticFiles, path: String },
    NotFound,
}

#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: RadixRouter<ControllerAction>,
    mounts: Vec<StaticMount>,
    route_count: usize,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `pattern` for `target`. `None` accepts any method.
    pub fn register(&mut self, pattern: &str, method: Option<Method>, target: ControllerAction) {
        debug!(
            pattern = %pattern,
            method = ?method,
            target = %target,
            "Route registered"
        );
        self.routes.insert(pattern, method, target);
        self.route_count += 1;
    }

    /// Serve files under `files` for request paths starting with `prefix`.
    pub fn mount_static(&mut self, prefix: impl Into<String>, files: StaticFiles) {
        let prefix = prefix.into();
        debug!(prefix = %prefix, dir = %files.base_dir().display(), "Static mount registered");
        self.mounts.push(StaticMount { prefix, files });
    }

    /// Number of `register` calls so far.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.route_count
    }

    pub fn route(&self, method: &Method, path: &str) -> Routed<'_> {
        if let Some((target, path_params)) = self.routes.route(method, path) {
            trace!(method = %method, path = %path, target = %target, "Route matched");
            return Routed::Action(RouteMatch { target, path_params });
        }
        for mount in &self.mounts {
            if let Some(rest) = path.strip_prefix(mount.prefix.as_str()) {
                trace!(path = %path, prefix = %mount.prefix, "Static mount matched");
                return Routed::Static {
                    files: &mount.files,
                    path: rest.to_string(),
                };
            }
        }
        debug!(method = %method, path = %path, "No route matched");
        Routed::NotFound
    }
}

/// Build `/{controller}/{action}[?k=v&..]`. Keys and values are written as
/// given, without percent-encoding.
pub fn create_url(controller: &Controller, action: &Action, params: &[(String, String)]) -> String {
    let mut url = format!("/{controller}/{action}");
    for (i, (k, v)) in params.iter().enumerate() {
        url.push(if i == 0 { '?' } else { '&' });
        let _ = write!(url, "{k}={v}");
    }
    url
}

/// Split `/{controller}/{action}/..` into its first two segments. Missing
/// segments come back empty.
pub fn parse_url(url: &str) -> (Controller, Action) {
    let Some(rest) = url.get(1..) else {
        return (Controller::default(), Action::default());
    };
    let mut parts = rest.split('/');
    let controller = parts.next().map(Controller::new).unwrap_or_default();
    let action = parts.next().map(Action::new).unwrap_or_default();
    (controller, action)
}
