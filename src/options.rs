// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 内置的 OPTIONS 处理器。只应答目标为 `*` 的请求，报告服务器整体支持的方法与 WebDAV 兼容等级。

use std::sync::Arc;

use chrono::Utc;

use crate::{
    backend::Identity,
    exception::Exception,
    namespace::MethodHandler,
    param::{join_methods, DAV_COMPLIANCE_CLASS},
    request::Request,
    response::{format_date, Response},
    server::ServerProfile,
};

pub struct OptionsHandler {
    profile: Arc<ServerProfile>,
}

impl OptionsHandler {
    pub fn new(profile: Arc<ServerProfile>) -> Self {
        Self { profile }
    }
}

impl MethodHandler for OptionsHandler {
    fn execute(&self, request: &Request, _identity: &Identity) -> Result<Option<Response>, Exception> {
        if request.uri().path() != "*" {
            return Err(Exception::not_found(request.uri()));
        }
        let mut response = Response::new(200);
        response
            .add_header("Date", format_date(&Utc::now()))
            .add_header("Allow", join_methods(self.profile.access_allowed()))
            .add_header("Connection", "keep-alive")
            .add_header("DAV", DAV_COMPLIANCE_CLASS);
        Ok(Some(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{message::Message, param::HttpRequestMethod};

    fn options(target: &str) -> Request {
        Request::new(
            HttpRequestMethod::OPTIONS,
            target.parse().unwrap(),
            "HTTP/1.1",
            Message::new(),
        )
    }

    #[test]
    fn test_options_star() {
        let profile = ServerProfile::default()
            .with_access_allowed(vec![HttpRequestMethod::GET, HttpRequestMethod::PROPFIND]);
        let handler = OptionsHandler::new(Arc::new(profile));
        let response = handler
            .execute(&options("*"), &Identity::anonymous())
            .unwrap()
            .unwrap();

        assert_eq!(response.status_code(), 200);
        assert_eq!(response.header("Allow"), Some("GET, PROPFIND"));
        assert_eq!(response.header("DAV"), Some("1,2"));
        assert_eq!(response.header("Connection"), Some("keep-alive"));
        assert!(response.header("Date").unwrap().ends_with("GMT"));
    }

    #[test]
    fn test_default_profile_methods() {
        let handler = OptionsHandler::new(Arc::new(ServerProfile::default()));
        let response = handler
            .execute(&options("*"), &Identity::anonymous())
            .unwrap()
            .unwrap();
        let allow = response.header("Allow").unwrap();
        for method in ["GET", "PUT", "PROPFIND", "MKCOL", "UNLOCK"] {
            assert!(allow.contains(method), "{} missing from {}", method, allow);
        }
    }

    /// 目标不是 `*` 时返回 404
    #[test]
    fn test_options_other_target_is_not_found() {
        let handler = OptionsHandler::new(Arc::new(ServerProfile::default()));
        let result = handler.execute(&options("/index.html"), &Identity::anonymous());
        assert_eq!(result.unwrap_err().status_code(), 404);
    }
}
