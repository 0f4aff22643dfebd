//! # MVC Infrastructure
//!
//! [`MvcBuilder`] collects controllers, URLs, views and settings during
//! startup. [`MvcBuilder::build`] freezes them into an [`Mvc`], which is
//! read-only while serving and can be shared across worker coroutines
//! behind an `Arc`.
//!
//! ## Request flow
//!
//! ```text
//! route ─┬─ action ──> access check ──> call action ──> respond
//!        ├─ static ──> file, or not found
//!        └─ none ────> not found
//! ```
//!
//! A panic anywhere between the access check and the response is caught
//! and answered with an internal-error result for that request only.

mod builder;
mod dispatch;

pub use builder::MvcBuilder;

use crate::controller::ControllerFactory;
use crate::handler::MethodDescriptor;
use crate::ids::{Action, Controller, ControllerAction, Method};
use crate::params::SuppliedParam;
use crate::result::ActionResult;
use crate::router::Router;
use crate::server::{HttpRequest, ResponseWriter};
use crate::view::Views;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Decides whether a controller/action may run for a request.
///
/// `None` allows the request. `Some(result)` denies it and `result` is
/// rendered instead, e.g. a redirect to a login page.
pub trait AccessChecker: Send + Sync {
    fn check_access(
        &self,
        controller: &Controller,
        action: &Action,
        response: &ResponseWriter,
        request: &HttpRequest,
    ) -> Option<ActionResult>;
}

impl<F> AccessChecker for F
where
    F: Fn(&Controller, &Action, &ResponseWriter, &HttpRequest) -> Option<ActionResult> + Send + Sync,
{
    fn check_access(
        &self,
        controller: &Controller,
        action: &Action,
        response: &ResponseWriter,
        request: &HttpRequest,
    ) -> Option<ActionResult> {
        self(controller, action, response, request)
    }
}

pub(crate) type HandlerTable = HashMap<Controller, HashMap<Action, HashMap<Method, MethodDescriptor>>>;

/// Frozen registries plus the settings used while serving.
pub struct Mvc {
    handlers: HandlerTable,
    constructors: HashMap<Controller, ControllerFactory>,
    views: Views,
    router: Router,
    not_found_view: Option<ControllerAction>,
    internal_error_view: Option<ControllerAction>,
    access_checker: Option<Arc<dyn AccessChecker>>,
    provided: Vec<SuppliedParam>,
    max_form_bytes: usize,
}

impl Mvc {
    pub fn builder() -> MvcBuilder {
        MvcBuilder::new()
    }

    #[must_use]
    pub fn views(&self) -> &Views {
        &self.views
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn not_found_view(&self) -> Option<&ControllerAction> {
        self.not_found_view.as_ref()
    }

    #[must_use]
    pub fn internal_error_view(&self) -> Option<&ControllerAction> {
        self.internal_error_view.as_ref()
    }

    #[must_use]
    pub fn max_form_bytes(&self) -> usize {
        self.max_form_bytes
    }

    /// Descriptor bound for an exact (controller, action, method) triple.
    #[must_use]
    pub fn handler(&self, controller: &Controller, action: &Action, method: &Method) -> Option<&MethodDescriptor> {
        self.handlers.get(controller)?.get(action)?.get(method)
    }

    /// All bound triples, sorted.
    pub fn bindings(&self) -> Vec<(&Controller, &Action, &Method)> {
        let mut out: Vec<_> = self
            .handlers
            .iter()
            .flat_map(|(c, actions)| {
                actions
                    .iter()
                    .flat_map(move |(a, methods)| methods.keys().map(move |m| (c, a, m)))
            })
            .collect();
        out.sort_by(|x, y| (x.0, x.1, x.2.as_str()).cmp(&(y.0, y.1, y.2.as_str())));
        out
    }
}

impl fmt::Debug for Mvc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mvc")
            .field("controllers", &self.constructors.len())
            .field("views", &self.views.len())
            .field("routes", &self.router.route_count())
            .field("not_found_view", &self.not_found_view)
            .field("internal_error_view", &self.internal_error_view)
            .field("access_checker", &self.access_checker.is_some())
            .field("provided", &self.provided)
            .field("max_form_bytes", &self.max_form_bytes)
            .finish()
    }
}
