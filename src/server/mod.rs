//! HTTP plumbing: the owned request type, the shared response sink and the
//! `may_minihttp` adapter that feeds requests into [`Mvc`](crate::mvc::Mvc).

pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_request, HttpRequest, DEFAULT_MAX_FORM_BYTES};
pub use response::{HttpResponse, ResponseWriter};
pub use service::AppService;
