// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 方法分发器
//!
//! 每个挂载点对应一个 `NameSpace`：它持有方法到处理器的映射表、服务器档案和存储后端，
//! 并负责把处理器报告的 [`Exception`] 统一翻译成带状态码的纯文本响应。
//! `dispatch` 总是返回一个响应，不会把错误继续向上传播。

use std::{collections::HashMap, sync::Arc};

use log::{debug, error, warn};

use crate::{
    backend::{Backend, Identity},
    exception::Exception,
    options::OptionsHandler,
    param::{join_methods, HttpRequestMethod},
    request::Request,
    response::Response,
    server::ServerProfile,
};

/// 某个 HTTP 方法的处理器。
///
/// 返回 `Ok(None)` 表示处理器没有产生响应，分发器会将其视为内部错误。
pub trait MethodHandler: Send + Sync {
    fn execute(&self, request: &Request, identity: &Identity) -> Result<Option<Response>, Exception>;
}

impl<F> MethodHandler for F
where
    F: Fn(&Request, &Identity) -> Result<Option<Response>, Exception> + Send + Sync,
{
    fn execute(&self, request: &Request, identity: &Identity) -> Result<Option<Response>, Exception> {
        self(request, identity)
    }
}

pub struct NameSpace {
    profile: Arc<ServerProfile>,
    backend: Arc<dyn Backend>,
    handlers: HashMap<HttpRequestMethod, Arc<dyn MethodHandler>>,
}

impl NameSpace {
    /// 创建分发器，并注册内置的 OPTIONS 处理器。
    pub fn new(profile: Arc<ServerProfile>, backend: Arc<dyn Backend>) -> Self {
        let mut namespace = Self {
            profile: profile.clone(),
            backend,
            handlers: HashMap::new(),
        };
        namespace.add(HttpRequestMethod::OPTIONS, OptionsHandler::new(profile));
        namespace
    }

    /// 注册处理器。同一方法重复注册时，后注册的覆盖先注册的。
    pub fn add(&mut self, method: HttpRequestMethod, handler: impl MethodHandler + 'static) -> &mut Self {
        self.add_shared(method, Arc::new(handler))
    }

    pub fn add_shared(&mut self, method: HttpRequestMethod, handler: Arc<dyn MethodHandler>) -> &mut Self {
        if self.handlers.insert(method.clone(), handler).is_some() {
            debug!("方法{}的处理器被替换", method);
        }
        self
    }

    pub fn get(&self, method: &HttpRequestMethod) -> Option<Arc<dyn MethodHandler>> {
        self.handlers.get(method).cloned()
    }

    /// 已注册处理器的方法集合，按方法名排序。
    pub fn allowed_methods(&self) -> Vec<HttpRequestMethod> {
        let mut methods: Vec<HttpRequestMethod> = self.handlers.keys().cloned().collect();
        methods.sort();
        methods
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn profile(&self) -> &Arc<ServerProfile> {
        &self.profile
    }

    /// 把请求分发给对应方法的处理器，并把所有失败翻译成响应。
    ///
    /// - 没有处理器：`501`；
    /// - 处理器没有返回响应：`500`；
    /// - `Unauthorized`：`401`，附带 `WWW-Authenticate`；
    /// - `MethodNotAllowed`：`405`，附带 `Allow`；
    /// - 其余失败：对应的状态码。
    pub fn dispatch(&self, request: &Request, identity: &Identity) -> Response {
        let method = request.method();
        let handler = match self.handlers.get(method) {
            Some(h) => h,
            None => {
                warn!("没有为方法{}注册处理器", method);
                return Response::text(501, format!("{} is not implemented.\n", method));
            }
        };

        match handler.execute(request, identity) {
            Ok(Some(response)) => response,
            Ok(None) => {
                error!("方法{}的处理器没有返回响应：{}", method, request.uri());
                Response::text(500, format!("{} handler produced no response.\n", method))
            }
            Err(exception) => exception_response(&exception),
        }
    }
}

/// 把失败翻译成纯文本响应
pub fn exception_response(exception: &Exception) -> Response {
    let code = exception.status_code();
    if code >= 500 {
        error!("{}", exception);
    } else {
        debug!("{}", exception);
    }
    let mut response = Response::text(code, format!("{}\n", exception));
    match exception {
        Exception::Unauthorized { challenge, .. } => {
            response.add_header("WWW-Authenticate", challenge.as_str());
        }
        Exception::MethodNotAllowed { allowed, .. } => {
            response.add_header("Allow", join_methods(allowed));
        }
        _ => {}
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::{Challenge, MockBackend},
        message::Message,
    };

    fn namespace() -> NameSpace {
        let mut backend = MockBackend::new();
        backend.expect_authentication_challenge().return_const(None::<Challenge>);
        NameSpace::new(Arc::new(ServerProfile::default()), Arc::new(backend))
    }

    fn request(method: HttpRequestMethod, target: &str) -> Request {
        Request::new(method, target.parse().unwrap(), "HTTP/1.1", Message::new())
    }

    fn handler<F>(f: F) -> F
    where
        F: Fn(&Request, &Identity) -> Result<Option<Response>, Exception> + Send + Sync,
    {
        f
    }

    fn body_text(response: &Response) -> String {
        String::from_utf8_lossy(response.body().unwrap()).into_owned()
    }

    #[test]
    fn test_options_registered_by_default() {
        let ns = namespace();
        assert!(ns.get(&HttpRequestMethod::OPTIONS).is_some());
        assert_eq!(ns.allowed_methods(), vec![HttpRequestMethod::OPTIONS]);
    }

    #[test]
    fn test_unregistered_method_is_501() {
        let ns = namespace();
        let response = ns.dispatch(&request(HttpRequestMethod::PROPFIND, "/"), &Identity::anonymous());
        assert_eq!(response.status_code(), 501);
        assert_eq!(body_text(&response), "PROPFIND is not implemented.\n");
        assert_eq!(response.header("Content-Type"), Some("text/plain;charset=utf-8"));
    }

    #[test]
    fn test_handler_without_response_is_500() {
        let mut ns = namespace();
        ns.add(HttpRequestMethod::GET, handler(|_, _| Ok(None)));
        let response = ns.dispatch(&request(HttpRequestMethod::GET, "/"), &Identity::anonymous());
        assert_eq!(response.status_code(), 500);
        assert!(body_text(&response).contains("GET"));
    }

    #[test]
    fn test_unauthorized_carries_challenge() {
        let mut ns = namespace();
        ns.add(
            HttpRequestMethod::GET,
            handler(|_, _| Err(Exception::unauthorized("login first", Challenge::basic("dav")))),
        );
        let response = ns.dispatch(&request(HttpRequestMethod::GET, "/x"), &Identity::anonymous());
        assert_eq!(response.status_code(), 401);
        assert_eq!(response.header("WWW-Authenticate"), Some("Basic realm=\"dav\""));
        assert!(body_text(&response).contains("login first"));
    }

    #[test]
    fn test_method_not_allowed_carries_allow() {
        let mut ns = namespace();
        ns.add(
            HttpRequestMethod::DELETE,
            handler(|_, _| {
                Err(Exception::method_not_allowed(
                    "read-only",
                    vec![HttpRequestMethod::GET, HttpRequestMethod::HEAD],
                ))
            }),
        );
        let response = ns.dispatch(&request(HttpRequestMethod::DELETE, "/x"), &Identity::anonymous());
        assert_eq!(response.status_code(), 405);
        assert_eq!(response.header("Allow"), Some("GET, HEAD"));
    }

    #[test]
    fn test_other_exceptions_map_to_status() {
        let cases = vec![
            (Exception::not_found("/x"), 404),
            (Exception::conflict("/x"), 409),
            (Exception::Gone("/x".into()), 410),
            (Exception::Locked("/x".into()), 423),
            (Exception::internal("boom"), 500),
        ];
        for (exception, code) in cases {
            let mut ns = namespace();
            let expected_body = format!("{}\n", exception);
            ns.add(HttpRequestMethod::GET, handler(move |_, _| Err(exception.clone())));
            let response = ns.dispatch(&request(HttpRequestMethod::GET, "/x"), &Identity::anonymous());
            assert_eq!(response.status_code(), code);
            assert_eq!(body_text(&response), expected_body);
        }
    }

    /// 同一方法后注册的处理器生效
    #[test]
    fn test_last_registration_wins() {
        let mut ns = namespace();
        ns.add(HttpRequestMethod::GET, handler(|_, _| Ok(Some(Response::new(200)))));
        ns.add(HttpRequestMethod::GET, handler(|_, _| Ok(Some(Response::new(204)))));
        let response = ns.dispatch(&request(HttpRequestMethod::GET, "/"), &Identity::anonymous());
        assert_eq!(response.status_code(), 204);
        assert_eq!(
            ns.allowed_methods(),
            vec![HttpRequestMethod::GET, HttpRequestMethod::OPTIONS]
        );
    }

    #[test]
    fn test_handler_receives_identity() {
        let mut ns = namespace();
        ns.add(
            HttpRequestMethod::GET,
            handler(|_, identity| Ok(Some(Response::text(200, identity.name().to_string())))),
        );
        let identity = Identity::anonymous().with_property("name", "alice");
        let response = ns.dispatch(&request(HttpRequestMethod::GET, "/"), &identity);
        assert_eq!(body_text(&response), "alice");
    }

    #[test]
    fn test_backend_accessor() {
        let ns = namespace();
        assert!(ns.backend().authentication_challenge(&"/".parse().unwrap()).is_none());
        assert_eq!(ns.profile().name(), crate::param::SERVER_NAME);
    }
}
