//! The action result protocol.
//!
//! An action returns an [`ActionResult`]; the dispatcher renders it into the
//! response with [`ActionResult::respond`]. Results name a target
//! controller/action only where they need one, empty identifiers fall back to
//! the pair being dispatched.

use crate::ids::{Action, Controller};
use crate::mvc::Mvc;
use crate::router::create_url;
use crate::server::{HttpRequest, ResponseWriter};
use crate::view::render_page;
use minijinja::Value;
use serde::Serialize;
use std::fmt::Display;
use tracing::{debug, error, trace};

/// Body written for a 404 when no not-found view is configured.
pub const NOT_FOUND_PAGE: &str = "<html><body>Not found</body></html>";

/// Body written for a 500 when no internal-error view is configured.
pub fn internal_error_page(cause: &str) -> String {
    format!("<html><body>Internal Error: {cause}</body></html>")
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    /// HTTP 500, rendered with the internal-error view when one is set.
    Error {
        cause: String,
        /// Raised while rendering a view. Stops the internal-error view from
        /// being rendered again for its own failure.
        is_view_error: bool,
    },
    /// HTTP 404, rendered with the not-found view when one is set.
    NotFound,
    /// HTTP 302 to `/{controller}/{action}[?k=v&..]`.
    RedirectTo {
        controller: Controller,
        action: Action,
        params: Vec<(String, String)>,
    },
    /// Render the view bound to the controller/action.
    ShowView {
        controller: Controller,
        action: Action,
        view_model: Value,
    },
}

impl ActionResult {
    pub fn error(cause: impl Display) -> Self {
        let cause = cause.to_string();
        debug!(cause = %cause, "Error result");
        ActionResult::Error {
            cause,
            is_view_error: false,
        }
    }

    pub(crate) fn view_error(cause: impl Display) -> Self {
        ActionResult::Error {
            cause: cause.to_string(),
            is_view_error: true,
        }
    }

    pub fn not_found() -> Self {
        ActionResult::NotFound
    }

    pub fn redirect_to(controller: impl Into<Controller>, action: impl Into<Action>) -> Self {
        ActionResult::RedirectTo {
            controller: controller.into(),
            action: action.into(),
            params: Vec::new(),
        }
    }

    /// Add a query parameter to a redirect. Other results are returned as is.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let ActionResult::RedirectTo { params, .. } = &mut self {
            params.push((key.into(), value.into()));
        }
        self
    }

    pub fn show_view<M: Serialize>(
        controller: impl Into<Controller>,
        action: impl Into<Action>,
        view_model: &M,
    ) -> Self {
        ActionResult::ShowView {
            controller: controller.into(),
            action: action.into(),
            view_model: Value::from_serialize(view_model),
        }
    }

    /// Show the view of the action being dispatched.
    pub fn view<M: Serialize>(view_model: &M) -> Self {
        Self::show_view(Controller::default(), Action::default(), view_model)
    }

    /// Write this result into `response`.
    ///
    /// `controller` and `action` are the pair being dispatched; a result
    /// overrides only the parts it names.
    pub fn respond(
        self,
        mvc: &Mvc,
        controller: &Controller,
        action: &Action,
        response: &ResponseWriter,
        request: &HttpRequest,
    ) {
        match self {
            ActionResult::Error { cause, is_view_error } => {
                response.override_status(500);
                match mvc.internal_error_view() {
                    None => write_internal_error(response, &cause),
                    Some(view)
                        if is_view_error
                            && *controller == view.controller
                            && *action == view.action =>
                    {
                        error!(cause = %cause, view = %view, "Internal error view failed");
                        write_internal_error(response, &cause);
                    }
                    Some(view) => ActionResult::ShowView {
                        controller: view.controller.clone(),
                        action: view.action.clone(),
                        view_model: Value::from(cause),
                    }
                    .respond(mvc, &view.controller, &view.action, response, request),
                }
            }
            ActionResult::NotFound => {
                response.write_status(404);
                match mvc.not_found_view() {
                    None => response.write_str(NOT_FOUND_PAGE),
                    Some(view) => ActionResult::ShowView {
                        controller: view.controller.clone(),
                        action: view.action.clone(),
                        view_model: Value::from(request.url()),
                    }
                    .respond(mvc, &view.controller, &view.action, response, request),
                }
            }
            ActionResult::RedirectTo {
                controller: target_c,
                action: target_a,
                params,
            } => {
                let c = if target_c.is_empty() { controller } else { &target_c };
                let a = if target_a.is_empty() { action } else { &target_a };
                let location = create_url(c, a, &params);
                debug!(location = %location, "Redirect");
                response.set_header("Location", location);
                response.write_status(302);
            }
            ActionResult::ShowView {
                controller: target_c,
                action: target_a,
                view_model,
            } => {
                let c = if target_c.is_empty() { controller } else { &target_c };
                let a = if target_a.is_empty() { action } else { &target_a };
                trace!(controller = %c, action = %a, "Resolving view");

                let descriptor = match mvc.views().get(c, a) {
                    Ok(d) => d,
                    Err(e) => {
                        error!(controller = %c, action = %a, error = %e, "View lookup failed");
                        return ActionResult::view_error(e).respond(mvc, c, a, response, request);
                    }
                };
                match render_page(descriptor, &view_model) {
                    Ok(html) => response.write_body(&html),
                    Err(e) => {
                        error!(controller = %c, action = %a, error = %e, "View render failed");
                        ActionResult::view_error(e).respond(mvc, c, a, response, request);
                    }
                }
            }
        }
    }
}

fn write_internal_error(response: &ResponseWriter, cause: &str) {
    response.write_str(&internal_error_page(cause));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_param_only_touches_redirects() {
        let r = ActionResult::redirect_to("", "X").with_param("a", "1");
        assert_eq!(
            r,
            ActionResult::RedirectTo {
                controller: Controller::default(),
                action: Action::new("X"),
                params: vec![("a".to_string(), "1".to_string())],
            }
        );
        assert_eq!(ActionResult::not_found().with_param("a", "1"), ActionResult::NotFound);
    }

    #[test]
    fn test_error_keeps_message() {
        assert_eq!(
            ActionResult::error("disk on fire"),
            ActionResult::Error {
                cause: "disk on fire".to_string(),
                is_view_error: false,
            }
        );
        assert!(internal_error_page("disk on fire").contains("disk on fire"));
    }
}
