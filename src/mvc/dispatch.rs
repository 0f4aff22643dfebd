use super::Mvc;
use crate::error::panic_message;
use crate::handler::MethodDescriptor;
use crate::ids::{Action, Controller, Method};
use crate::params::{ParamBinder, SuppliedParam, SuppliedParams};
use crate::result::ActionResult;
use crate::router::Routed;
use crate::server::{HttpRequest, HttpResponse, ResponseWriter};
use crate::static_files::StaticFiles;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info_span, trace};

impl Mvc {
    /// Serve one request.
    pub fn handle(&self, request: HttpRequest) -> HttpResponse {
        let span = info_span!(
            "mvc_request",
            request_id = %request.request_id,
            method = %request.method,
            path = %request.path
        );
        let _enter = span.enter();

        let response = ResponseWriter::new();
        match self.router.route(&request.method, &request.path) {
            Routed::Action(route) => {
                let mut request = request;
                request.path_params = route.path_params;
                let target = route.target;
                trace!(controller = %target.controller, action = %target.action, "Routed");
                self.handle_request(&target.controller, &target.action, &response, Arc::new(request));
            }
            Routed::Static { files, path } => self.serve_static(files, &path, &response, &request),
            Routed::NotFound => self.not_found(&response, &request),
        }
        let out = response.finish();
        debug!(status = out.status, bytes = out.body.len(), "Request done");
        out
    }

    /// Access check, action call and response for a routed pair. Panics are
    /// answered with an internal-error result.
    pub(crate) fn handle_request(
        &self,
        c: &Controller,
        a: &Action,
        response: &ResponseWriter,
        request: Arc<HttpRequest>,
    ) {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let mut result = None;
            if let Some(checker) = &self.access_checker {
                trace!("Checking access");
                result = checker.check_access(c, a, response, &request);
                if result.is_some() {
                    debug!(controller = %c, action = %a, "Access denied");
                }
            }
            if result.is_none() {
                result = self.call_action(c, a, response, &request);
            }
            if let Some(result) = result {
                trace!("Rendering result");
                result.respond(self, c, a, response, &request);
            }
        }));

        if let Err(payload) = outcome {
            let cause = panic_message(payload.as_ref());
            error!(controller = %c, action = %a, panic = %cause, "Recovered from panic");
            ActionResult::error(cause).respond(self, c, a, response, &request);
        }
    }

    fn call_action(
        &self,
        c: &Controller,
        a: &Action,
        response: &ResponseWriter,
        request: &Arc<HttpRequest>,
    ) -> Option<ActionResult> {
        trace!(controller = %c, action = %a, "Searching handler");
        let Some(actions) = self.handlers.get(c) else {
            error!(controller = %c, "Controller not found");
            return Some(ActionResult::not_found());
        };
        let Some(methods) = actions.get(a) else {
            error!(controller = %c, action = %a, "Action not found");
            return Some(ActionResult::not_found());
        };
        let descriptor = methods.get(&request.method).or_else(|| {
            trace!(method = %request.method, "Searching handler for GET");
            methods.get(&Method::GET)
        });
        match descriptor {
            Some(descriptor) => self.call_handler(descriptor, c, a, response, request),
            None => {
                error!(controller = %c, action = %a, method = %request.method, "No handler for method");
                Some(ActionResult::not_found())
            }
        }
    }

    fn call_handler(
        &self,
        descriptor: &MethodDescriptor,
        c: &Controller,
        a: &Action,
        response: &ResponseWriter,
        request: &Arc<HttpRequest>,
    ) -> Option<ActionResult> {
        let Some(factory) = self.constructors.get(c) else {
            error!(controller = %c, "No constructor bound for controller");
            return Some(ActionResult::not_found());
        };

        let mut supplied = SuppliedParams::new();
        supplied
            .push(SuppliedParam::new(response.clone()).with_capability(
                |w: &ResponseWriter| -> Box<dyn io::Write + Send> { Box::new(w.clone()) },
            ))
            .push(SuppliedParam::shared(Arc::clone(request)))
            .add(c.clone())
            .add(a.clone())
            .add(request.request_id)
            .extend(self.provided.iter().cloned());

        let mut values = request.query_values();
        for (name, value) in &request.path_params {
            values.add(name.as_str(), value.as_str());
        }
        if request.method == Method::POST {
            match request.parse_form(self.max_form_bytes) {
                Ok(form) => {
                    values.merge(form);
                }
                Err(e) => {
                    error!(error = %e, "Form parsing failed");
                    return Some(ActionResult::error(e));
                }
            }
        }
        values.set("Controller", c.as_str()).set("Action", a.as_str());

        let mut controller = factory();
        {
            let base = controller.base_mut();
            base.set_controller(c.clone());
            base.set_action(a.clone());
            base.set_request(Arc::clone(request));
            base.set_response(response.clone());
        }

        trace!(handler = descriptor.handler_name(), "Invoking handler");
        let binder = ParamBinder::new(&supplied, &values);
        match descriptor.invoke(controller.as_any_mut(), &binder) {
            Ok(result) => result,
            Err(e) => {
                error!(controller = %c, action = %a, error = %e, "Parameter binding failed");
                Some(ActionResult::error(e))
            }
        }
    }

    /// Answer with the not-found result and empty identifiers.
    pub(crate) fn not_found(&self, response: &ResponseWriter, request: &HttpRequest) {
        debug!(path = %request.path, "Not found");
        ActionResult::not_found().respond(
            self,
            &Controller::default(),
            &Action::default(),
            response,
            request,
        );
    }

    fn serve_static(&self, files: &StaticFiles, path: &str, response: &ResponseWriter, request: &HttpRequest) {
        match files.load(path) {
            Ok((bytes, content_type)) => {
                trace!(path = %path, content_type, "Serving static file");
                response.set_header("Content-Type", content_type);
                response.write_status(200);
                response.write_body(&bytes);
            }
            Err(e) => {
                debug!(path = %path, error = %e, "Static file unavailable");
                self.not_found(response, request);
            }
        }
    }
}
