use super::request::parse_request;
use super::response::HttpResponse;
use crate::mvc::Mvc;
use may_minihttp::{HttpService, Request, Response};
use std::io;
use std::sync::Arc;
use tracing::warn;

/// `may_minihttp` service wrapping a frozen [`Mvc`].
#[derive(Clone)]
pub struct AppService {
    pub mvc: Arc<Mvc>,
}

impl AppService {
    pub fn new(mvc: Arc<Mvc>) -> Self {
        Self { mvc }
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        match parse_request(req) {
            Ok(request) => self.mvc.handle(request).write_to(res),
            Err(e) => {
                warn!(error = %e, "Rejected request with invalid method");
                HttpResponse {
                    status: 400,
                    headers: Vec::new(),
                    body: b"<html><body>Bad request</body></html>".to_vec(),
                }
                .write_to(res);
            }
        }
        Ok(())
    }
}
