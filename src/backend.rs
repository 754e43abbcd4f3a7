// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 后端与资源契约
//!
//! `Backend` 把请求 URI 解析为 `Resource`，`Resource` 暴露方法处理器需要的全部能力。
//! 所有失败都通过 [`Exception`] 报告，由分发器统一翻译成响应。
//!
//! 资源在每次 `resolve` 时重新构造，不在请求之间缓存任何状态。

use std::{
    collections::HashMap,
    fmt,
    io::{Read, Write},
    time::SystemTime,
};

use http::Uri;

use crate::{exception::Exception, param::HttpRequestMethod, request::Request, response::Response};

/// 认证质询，原样写入 `WWW-Authenticate` 头部。具体的认证方案不在本模块的职责范围内。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge(String);

impl Challenge {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// `Basic realm="<realm>"` 形式的质询
    pub fn basic(realm: &str) -> Self {
        Self(format!("Basic realm=\"{}\"", realm))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 请求方身份的属性键：原始的 `Authorization` 头部值
pub const AUTHORIZATION_PROPERTY: &str = "authorization";
/// 请求方身份的属性键：名称
pub const NAME_PROPERTY: &str = "name";

/// 请求方身份，本质上是一张属性表。空表即匿名身份。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Identity {
    properties: HashMap<String, String>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// 由原始 `Authorization` 头部构造身份，不做任何方案解码。
    pub fn from_authorization(raw: &str) -> Self {
        Self::anonymous().with_property(AUTHORIZATION_PROPERTY, raw)
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// 身份名称，未设置时为 `anonymous`
    pub fn name(&self) -> &str {
        self.property(NAME_PROPERTY, "anonymous")
    }

    /// 读取属性，不存在时返回 `default`
    pub fn property<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.properties.get(name).map(String::as_str).unwrap_or(default)
    }

    pub fn is_anonymous(&self) -> bool {
        self.properties.is_empty()
    }
}

/// 存储后端：把 URI 解析为资源。实现必须可以在线程间共享。
#[cfg_attr(test, mockall::automock)]
pub trait Backend: Send + Sync {
    /// 访问该 URI 需要认证时返回质询，否则返回 `None`
    fn authentication_challenge(&self, uri: &Uri) -> Option<Challenge>;

    /// 为给定 URI 和身份构造一个新的资源对象。资源不存在并不是错误，由 `Resource::exists` 判断。
    ///
    /// 可能的失败：`InternalServerError`、`Gone`、`Unauthorized`。
    fn resolve(&self, uri: &Uri, identity: &Identity) -> Result<Box<dyn Resource>, Exception>;
}

/// 后端中的一个可寻址条目，绑定了 URI 和请求方身份。
///
/// `NotFound`、`Gone`、`Unauthorized`、`Conflict` 表示资源在检查与使用之间发生了变化，
/// 调用方不应重试。
pub trait Resource: Send {
    fn uri(&self) -> &Uri;

    fn identity(&self) -> &Identity;

    fn exists(&self) -> bool;

    fn is_collection(&self) -> bool;

    /// 集合的直接子资源
    fn children(&self) -> Result<Vec<Box<dyn Resource>>, Exception>;

    fn content_type(&self) -> Result<String, Exception>;

    fn content_length(&self) -> Result<u64, Exception>;

    fn creation_time(&self) -> Result<SystemTime, Exception>;

    fn last_modified_time(&self) -> Result<SystemTime, Exception>;

    fn open_for_read(&self) -> Result<Box<dyn Read + Send>, Exception>;

    /// 打开资源用于覆盖写入
    fn open_for_write(&self) -> Result<Box<dyn Write + Send>, Exception>;

    /// 该资源当前接受的方法
    fn allowed_methods(&self) -> Vec<HttpRequestMethod>;

    /// 以给定的内容类型创建一个空资源
    fn create(&self, content_type: &str) -> Result<(), Exception>;

    fn delete(&self) -> Result<(), Exception>;

    fn handle_post(&self, request: &Request, identity: &Identity) -> Result<Response, Exception>;

    /// 移动到目标 URI，返回应答使用的状态码
    fn move_to(&self, destination: &Uri) -> Result<u16, Exception>;

    /// 复制到目标 URI。目标不存在时创建（201），已存在时被替换（204）。
    fn copy_to(&self, destination: &Uri) -> Result<u16, Exception>;

    fn create_collection(&self) -> Result<(), Exception>;
}
