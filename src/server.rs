// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 连接层
//!
//! - [`ServerProfile`]：服务器整体的信息，包括名称、协议版本以及对外声明支持的方法集合。
//! - [`HttpServer`]：挂载点表。按最长前缀选择 [`NameSpace`]，并在一个连接上循环执行
//!   “解析请求 → 分发 → 写回响应”，直到对端关闭连接或任一方要求关闭。

use std::{
    io::{self, BufRead, Write},
    sync::Arc,
    time::Instant,
};

use chrono::Utc;
use log::{debug, info, warn};

use crate::{
    backend::Identity,
    exception::ReadError,
    namespace::{exception_response, NameSpace},
    param::{HttpRequestMethod, HTTP_VERSION, SERVER_NAME},
    request::Request,
    response::{format_date, Response},
};

/// 服务器整体的信息，由所有挂载点共享。
#[derive(Debug, Clone, PartialEq)]
pub struct ServerProfile {
    name: String,
    version: String,
    access_allowed: Vec<HttpRequestMethod>,
}

impl ServerProfile {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            access_allowed: vec![
                HttpRequestMethod::GET,
                HttpRequestMethod::PUT,
                HttpRequestMethod::POST,
                HttpRequestMethod::HEAD,
                HttpRequestMethod::OPTIONS,
                HttpRequestMethod::DELETE,
                HttpRequestMethod::PROPFIND,
                HttpRequestMethod::PROPPATCH,
                HttpRequestMethod::COPY,
                HttpRequestMethod::MOVE,
                HttpRequestMethod::LOCK,
                HttpRequestMethod::UNLOCK,
                HttpRequestMethod::MKCOL,
            ],
        }
    }

    /// 替换对外声明支持的方法集合（OPTIONS * 的 `Allow` 头部）
    pub fn with_access_allowed(mut self, methods: Vec<HttpRequestMethod>) -> Self {
        self.access_allowed = methods;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn access_allowed(&self) -> &[HttpRequestMethod] {
        &self.access_allowed
    }
}

impl Default for ServerProfile {
    fn default() -> Self {
        Self::new(SERVER_NAME, HTTP_VERSION)
    }
}

pub struct HttpServer {
    profile: Arc<ServerProfile>,
    mounts: Vec<(String, NameSpace)>,
}

impl HttpServer {
    pub fn new(profile: Arc<ServerProfile>) -> Self {
        Self {
            profile,
            mounts: Vec::new(),
        }
    }

    pub fn profile(&self) -> &Arc<ServerProfile> {
        &self.profile
    }

    /// 在给定前缀下挂载分发器。相同前缀重复挂载时替换旧的分发器。
    pub fn add_namespace(&mut self, prefix: impl Into<String>, namespace: NameSpace) -> &mut Self {
        let prefix = prefix.into();
        info!("挂载点{}已注册", prefix);
        self.mounts.retain(|(p, _)| *p != prefix);
        self.mounts.push((prefix, namespace));
        self
    }

    /// 按最长前缀匹配选择分发器。`*` 形式的请求目标交给前缀最短的挂载点。
    pub fn namespace_for(&self, path: &str) -> Option<&NameSpace> {
        if path == "*" {
            return self
                .mounts
                .iter()
                .min_by_key(|(prefix, _)| prefix.len())
                .map(|(_, ns)| ns);
        }
        self.mounts
            .iter()
            .filter(|(prefix, _)| path.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, ns)| ns)
    }

    /// 由请求构造请求方身份。认证方案的解码不在这里完成，只保存原始的 `Authorization` 头部。
    pub fn identity_for(request: &Request) -> Identity {
        match request.header("Authorization") {
            Some(raw) => Identity::from_authorization(raw),
            None => Identity::anonymous(),
        }
    }

    /// 处理一个请求并补全通用的响应头部。
    pub fn dispatch(&self, request: &Request) -> Response {
        let mut response = match self.namespace_for(request.path()) {
            Some(namespace) => namespace.dispatch(request, &Self::identity_for(request)),
            None => {
                warn!("没有挂载点可以处理{}", request.path());
                Response::text(404, format!("Not Found: {}\n", request.uri()))
            }
        };
        self.finish(&mut response);
        response
    }

    fn finish(&self, response: &mut Response) {
        response.set_version(self.profile.version());
        if response.header("Server").is_none() {
            response.add_header("Server", self.profile.name());
        }
        if response.header("Date").is_none() {
            response.add_header("Date", format_date(&Utc::now()));
        }
        let code = response.status_code();
        let bodiless = code < 200 || code == 204 || code == 304;
        if !bodiless && response.body().is_none() && response.header("Content-Length").is_none() {
            response.add_header("Content-Length", "0");
        }
    }

    /// 在一个连接上按到达顺序处理请求，直到对端关闭、读写出错，或任一方声明 `Connection: close`。
    ///
    /// 请求格式错误时回复对应的错误状态并关闭连接：出错位置之后的字节无法可靠地划分为下一个请求。
    pub fn serve_connection<R: BufRead, W: Write>(
        &self,
        reader: &mut R,
        writer: &mut W,
        id: u128,
    ) -> io::Result<()> {
        loop {
            let request = match Request::parse_with(reader, Some(&mut *writer as &mut dyn Write)) {
                Ok(request) => request,
                Err(ReadError::Closed) => {
                    debug!("[ID{}]客户端关闭了连接", id);
                    return Ok(());
                }
                Err(ReadError::Io(e)) => {
                    debug!("[ID{}]读取请求时连接中断：{}", id, e);
                    return Ok(());
                }
                Err(ReadError::Protocol(exception)) => {
                    warn!("[ID{}]解析HTTP请求失败：{}", id, exception);
                    let mut response = exception_response(&exception);
                    response.add_header("Connection", "close");
                    self.finish(&mut response);
                    response.write_to(writer)?;
                    return Ok(());
                }
            };
            debug!("[ID{}]成功解析HTTP请求", id);

            let start_time = Instant::now();
            let mut response = self.dispatch(&request);
            let close = wants_close(request.header("Connection"))
                || wants_close(response.header("Connection"));
            if close {
                response.add_header("Connection", "close");
            }
            debug!(
                "[ID{}]HTTP响应构建完成，服务端用时{}ms。",
                id,
                start_time.elapsed().as_millis()
            );

            info!(
                "[ID{}] {}, {}, {}, {}, {}, {}",
                id,
                request.version(),
                request.path(),
                request.method(),
                response.status_code(),
                response.information(),
                request.header("User-Agent").unwrap_or("-"),
            );

            if *request.method() == HttpRequestMethod::HEAD {
                response.write_head_to(writer)?;
            } else {
                response.write_to(writer)?;
            }

            if close {
                debug!("[ID{}]按Connection: close关闭连接", id);
                return Ok(());
            }
        }
    }
}

fn wants_close(connection: Option<&str>) -> bool {
    connection
        .map(|c| c.split(',').any(|token| token.trim().eq_ignore_ascii_case("close")))
        .unwrap_or(false)
}
