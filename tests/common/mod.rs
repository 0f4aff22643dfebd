#![allow(dead_code)]

use brrtmvc::server::{HttpRequest, HttpResponse};
use brrtmvc::{Method, Mvc};

/// Views folder with `home`, `account`, `error` and `shared` views plus a
/// master page.
pub const VIEWS_DIR: &str = "tests/views";

/// Static fixture tree: `hello.txt`, `index.html`, `css/site.css`.
pub const STATIC_DIR: &str = "tests/staticdata";

pub fn get(mvc: &Mvc, target: &str) -> HttpResponse {
    mvc.handle(HttpRequest::new(Method::GET, target))
}

pub fn post_form(mvc: &Mvc, target: &str, pairs: &[(&str, &str)]) -> HttpResponse {
    mvc.handle(HttpRequest::new(Method::POST, target).with_form(pairs))
}

pub fn request(mvc: &Mvc, method: Method, target: &str) -> HttpResponse {
    mvc.handle(HttpRequest::new(method, target))
}
