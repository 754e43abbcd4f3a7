// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了请求处理生命周期中可能出现的各类失败情况。
//!
//! - [`Exception`] 是协议层面的失败词汇表。每个变体固定对应一个标准状态码，
//!   资源、后端与方法处理器都只通过它报告失败，由分发器统一翻译成响应。
//! - [`ReadError`] 是从连接上读取请求时的失败：对端关闭、I/O 错误，或者请求本身不合法。

use std::io;

use thiserror::Error;

use crate::{backend::Challenge, param::HttpRequestMethod};

/// 处理请求过程中发生的协议层失败。
///
/// 变体集合是封闭的，所有后端共用同一套词汇；附带的消息会作为纯文本响应体返回给客户端。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Exception {
    /// 请求无法被理解，例如请求行格式错误。对应 `400 Bad Request`。
    #[error("Bad Request: {0}")]
    BadRequest(String),
    /// 需要（或提供了错误的）认证信息。携带写入 `WWW-Authenticate` 的质询。
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String, challenge: Challenge },
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    /// 资源不接受该操作。携带资源当前允许的方法集合。
    #[error("Method Not Allowed: {message}")]
    MethodNotAllowed {
        message: String,
        allowed: Vec<HttpRequestMethod>,
    },
    /// 操作与资源当前状态冲突，例如父集合不存在。
    #[error("Conflict: {0}")]
    Conflict(String),
    /// 资源曾经存在，但已不可用。
    #[error("Gone: {0}")]
    Gone(String),
    #[error("Precondition Failed: {0}")]
    PreconditionFailed(String),
    #[error("Locked: {0}")]
    Locked(String),
    #[error("Insufficient Storage: {0}")]
    InsufficientStorage(String),
    /// 无法更具体描述的内部错误。分发器在处理器没有返回响应时也使用该状态。
    #[error("Internal Server Error: {0}")]
    InternalServerError(String),
    /// 未实现。分发器在找不到方法处理器时使用该状态。
    #[error("Not Implemented: {0}")]
    NotImplemented(String),
}

use Exception::*;

impl Exception {
    /// 返回该失败对应的标准 HTTP 状态码。
    pub fn status_code(&self) -> u16 {
        match self {
            BadRequest(_) => 400,
            Unauthorized { .. } => 401,
            Forbidden(_) => 403,
            NotFound(_) => 404,
            MethodNotAllowed { .. } => 405,
            Conflict(_) => 409,
            Gone(_) => 410,
            PreconditionFailed(_) => 412,
            Locked(_) => 423,
            InsufficientStorage(_) => 507,
            InternalServerError(_) => 500,
            NotImplemented(_) => 501,
        }
    }

    pub fn not_found(what: impl ToString) -> Self {
        NotFound(what.to_string())
    }

    pub fn conflict(what: impl ToString) -> Self {
        Conflict(what.to_string())
    }

    pub fn internal(what: impl ToString) -> Self {
        InternalServerError(what.to_string())
    }

    pub fn method_not_allowed(message: impl ToString, allowed: Vec<HttpRequestMethod>) -> Self {
        MethodNotAllowed {
            message: message.to_string(),
            allowed,
        }
    }

    pub fn unauthorized(message: impl ToString, challenge: Challenge) -> Self {
        Unauthorized {
            message: message.to_string(),
            challenge,
        }
    }

    /// 将文件系统 I/O 错误映射为协议失败：不存在映射为 404，权限不足映射为 403，其余为 500。
    pub fn from_io(error: &io::Error, what: impl ToString) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => NotFound(what.to_string()),
            io::ErrorKind::PermissionDenied => Forbidden(what.to_string()),
            _ => InternalServerError(format!("{}: {}", what.to_string(), error)),
        }
    }
}

/// 从连接上读取一个请求时可能发生的错误。
#[derive(Debug, Error)]
pub enum ReadError {
    /// 在读到请求行之前输入流已经结束，通常表示客户端关闭了连接。
    #[error("connection closed by peer")]
    Closed,
    #[error(transparent)]
    Io(#[from] io::Error),
    /// 请求本身不合法，可以向客户端回复相应的错误状态。
    #[error(transparent)]
    Protocol(#[from] Exception),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = vec![
            (BadRequest("x".into()), 400),
            (Exception::unauthorized("x", Challenge::basic("realm")), 401),
            (Forbidden("x".into()), 403),
            (Exception::not_found("/a"), 404),
            (Exception::method_not_allowed("x", vec![]), 405),
            (Exception::conflict("x"), 409),
            (Gone("x".into()), 410),
            (PreconditionFailed("x".into()), 412),
            (Locked("x".into()), 423),
            (InsufficientStorage("x".into()), 507),
            (Exception::internal("x"), 500),
            (NotImplemented("x".into()), 501),
        ];
        for (exception, code) in cases {
            assert_eq!(exception.status_code(), code, "{}", exception);
        }
    }

    #[test]
    fn test_display_contains_reason_and_detail() {
        let e = Exception::not_found("/missing.txt");
        assert_eq!(e.to_string(), "Not Found: /missing.txt");
    }

    #[test]
    fn test_from_io_mapping() {
        let not_found = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(Exception::from_io(&not_found, "/a").status_code(), 404);

        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "no");
        assert_eq!(Exception::from_io(&denied, "/a").status_code(), 403);

        let other = io::Error::new(io::ErrorKind::Other, "boom");
        let e = Exception::from_io(&other, "/a");
        assert_eq!(e.status_code(), 500);
        assert!(e.to_string().contains("boom"));
    }
}
