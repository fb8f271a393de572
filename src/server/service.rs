use super::request::to_http_request;
use super::response::write_response;
use crate::app::Core;
use crate::response::status_text;
use may_minihttp::{HttpService, Request, Response};
use std::io;
use std::sync::Arc;
use tracing::warn;

/// `may_minihttp` service running every request through a [`Core`]
///
/// Cloned once per connection; clones share the same core.
#[derive(Clone)]
pub struct AppService {
    pub core: Arc<Core>,
}

impl AppService {
    #[must_use]
    pub fn new(core: Arc<Core>) -> Self {
        Self { core }
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let request = match to_http_request(req) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "Rejecting malformed request line");
                res.status_code(400, status_text(400));
                res.body_vec(status_text(400).as_bytes().to_vec());
                return Ok(());
            }
        };
        let response = self.core.handle(request);
        write_response(res, response);
        Ok(())
    }
}
