// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与常量模块
//!
//! 该模块定义了服务器遵循的 HTTP/WebDAV 协议常量和数据结构，包括：
//! - 常见的 HTTP（含 WebDAV 扩展）状态码及其原因短语。
//! - 文件后缀名到媒体类型的映射表。
//! - 可在运行时扩展注册的 HTTP 方法类型 `HttpRequestMethod`。

use std::{
    borrow::Cow,
    collections::HashMap,
    fmt,
    sync::RwLock,
};

use lazy_static::lazy_static;
use log::warn;

/// 根路径 `/` 映射到的默认文档名
pub const DEFAULT_DOCUMENT: &str = "index.html";

/// 服务器名称标识，用于 HTTP 响应头的 `Server` 字段
pub const SERVER_NAME: &str = "shaneyale-davserver";

/// 服务器使用的协议版本
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// `DAV` 响应头声明的 WebDAV 兼容等级
pub const DAV_COMPLIANCE_CLASS: &str = "1,2";

/// 无法推断类型时使用的通用二进制媒体类型
pub const OCTET_STREAM: &str = "application/octet-stream";

/// 纯文本响应体使用的媒体类型
pub const TEXT_PLAIN: &str = "text/plain;charset=utf-8";

lazy_static! {
    /// HTTP 状态码与其对应的标准原因短语映射表。
    ///
    /// 参考标准：RFC 9110 以及 RFC 4918（WebDAV）。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        map.insert(100, "Continue");
        map.insert(101, "Switching Protocols");

        map.insert(200, "OK");
        map.insert(201, "Created");
        map.insert(202, "Accepted");
        map.insert(203, "Non-Authoritative Information");
        map.insert(204, "No Content");
        map.insert(205, "Reset Content");
        map.insert(206, "Partial Content");
        map.insert(207, "Multi-Status");

        map.insert(300, "Multiple Choices");
        map.insert(301, "Moved Permanently");
        map.insert(302, "Found");
        map.insert(303, "See Other");
        map.insert(304, "Not Modified");
        map.insert(307, "Temporary Redirect");
        map.insert(308, "Permanent Redirect");

        map.insert(400, "Bad Request");
        map.insert(401, "Unauthorized");
        map.insert(403, "Forbidden");
        map.insert(404, "Not Found");
        map.insert(405, "Method Not Allowed");
        map.insert(406, "Not Acceptable");
        map.insert(408, "Request Timeout");
        map.insert(409, "Conflict");
        map.insert(410, "Gone");
        map.insert(411, "Length Required");
        map.insert(412, "Precondition Failed");
        map.insert(413, "Content Too Large");
        map.insert(414, "URI Too Long");
        map.insert(415, "Unsupported Media Type");
        map.insert(416, "Range Not Satisfiable");
        map.insert(417, "Expectation Failed");
        map.insert(422, "Unprocessable Content");
        // WebDAV 扩展
        map.insert(423, "Locked");
        map.insert(424, "Failed Dependency");

        map.insert(500, "Internal Server Error");
        map.insert(501, "Not Implemented");
        map.insert(502, "Bad Gateway");
        map.insert(503, "Service Unavailable");
        map.insert(504, "Gateway Timeout");
        map.insert(505, "HTTP Version Not Supported");
        map.insert(507, "Insufficient Storage");
        map
    };
}

/// 文件后缀名到媒体类型的静态对照表。
const MEDIA_TYPE_TABLE: &[(&str, &str)] = &[
    ("aac", "audio/aac"),
    ("avi", "video/x-msvideo"),
    ("avif", "image/avif"),
    ("bin", "application/octet-stream"),
    ("bmp", "image/bmp"),
    ("bz", "application/x-bzip"),
    ("bz2", "application/x-bzip2"),
    ("css", "text/css;charset=utf-8"),
    ("csv", "text/csv"),
    ("deb", "application/x-deb"),
    ("doc", "application/msword"),
    ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    ("epub", "application/epub+zip"),
    ("gif", "image/gif"),
    ("gz", "application/gzip"),
    ("htm", "text/html;charset=utf-8"),
    ("html", "text/html;charset=utf-8"),
    ("ico", "image/x-icon"),
    ("ics", "text/calendar"),
    ("iso", "application/x-iso9660-image"),
    ("jar", "application/java-archive"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("js", "text/javascript;charset=utf-8"),
    ("json", "application/json"),
    ("md", "text/markdown"),
    ("mjs", "text/javascript"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
    ("mpeg", "video/mpeg"),
    ("odp", "application/vnd.oasis.opendocument.presentation"),
    ("ods", "application/vnd.oasis.opendocument.spreadsheet"),
    ("odt", "application/vnd.oasis.opendocument.text"),
    ("ogg", "audio/ogg"),
    ("otf", "font/otf"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("ppt", "application/vnd.ms-powerpoint"),
    ("pptx", "application/vnd.openxmlformats-officedocument.presentationml.presentation"),
    ("rar", "application/x-rar-compressed"),
    ("rtf", "application/rtf"),
    ("sh", "application/x-sh"),
    ("svg", "image/svg+xml"),
    ("tar", "application/x-tar"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("ttf", "font/ttf"),
    ("txt", "text/plain"),
    ("vcf", "text/vcard"),
    ("wasm", "application/wasm"),
    ("wav", "audio/wav"),
    ("webm", "video/webm"),
    ("webp", "image/webp"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("xhtml", "application/xhtml+xml"),
    ("xls", "application/vnd.ms-excel"),
    ("xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
    ("xml", "text/xml"),
    ("zip", "application/zip"),
    ("7z", "application/x-7z-compressed"),
];

lazy_static! {
    /// 文件后缀名（小写）到媒体类型的映射表。
    pub static ref MIME_TYPES: HashMap<&'static str, &'static str> =
        MEDIA_TYPE_TABLE.iter().copied().collect();
}

/// 根据文件后缀名推断媒体类型，未知后缀一律返回 `application/octet-stream`。
pub fn media_type_for(extension: &str) -> &'static str {
    MIME_TYPES
        .get(extension.to_ascii_lowercase().as_str())
        .copied()
        .unwrap_or(OCTET_STREAM)
}

/// HTTP 请求方法。
///
/// 内部保存规范化的方法名。标准方法以关联常量的形式提供，
/// 其余扩展方法可以通过 [`HttpRequestMethod::register`] 在运行时加入全局注册表，
/// 之后请求解析器即可识别。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HttpRequestMethod(Cow<'static, str>);

impl HttpRequestMethod {
    pub const GET: Self = Self(Cow::Borrowed("GET"));
    pub const PUT: Self = Self(Cow::Borrowed("PUT"));
    pub const POST: Self = Self(Cow::Borrowed("POST"));
    pub const HEAD: Self = Self(Cow::Borrowed("HEAD"));
    pub const OPTIONS: Self = Self(Cow::Borrowed("OPTIONS"));
    pub const DELETE: Self = Self(Cow::Borrowed("DELETE"));
    pub const TRACE: Self = Self(Cow::Borrowed("TRACE"));
    pub const CONNECT: Self = Self(Cow::Borrowed("CONNECT"));
    // WebDAV (RFC 4918)
    pub const PROPFIND: Self = Self(Cow::Borrowed("PROPFIND"));
    pub const PROPPATCH: Self = Self(Cow::Borrowed("PROPPATCH"));
    pub const MKCOL: Self = Self(Cow::Borrowed("MKCOL"));
    pub const COPY: Self = Self(Cow::Borrowed("COPY"));
    pub const MOVE: Self = Self(Cow::Borrowed("MOVE"));
    pub const LOCK: Self = Self(Cow::Borrowed("LOCK"));
    pub const UNLOCK: Self = Self(Cow::Borrowed("UNLOCK"));

    /// 在全局注册表中查找方法名。方法名区分大小写。
    pub fn from_token(token: &str) -> Option<Self> {
        let registry = match METHOD_REGISTRY.read() {
            Ok(lock) => lock,
            Err(poisoned) => {
                warn!("方法注册表的锁被污染，恢复并继续");
                poisoned.into_inner()
            }
        };
        registry.get(token).cloned()
    }

    /// 注册一个扩展方法并返回它。重复注册同名方法是幂等的。
    ///
    /// 方法名必须是非空的 HTTP token（可见 ASCII 字符，不含分隔符），否则返回 `None`。
    pub fn register(token: &str) -> Option<Self> {
        if !is_token(token) {
            return None;
        }
        let mut registry = match METHOD_REGISTRY.write() {
            Ok(lock) => lock,
            Err(poisoned) => {
                warn!("方法注册表的锁被污染，恢复并继续");
                poisoned.into_inner()
            }
        };
        let method = registry
            .entry(token.to_string())
            .or_insert_with(|| Self(Cow::Owned(token.to_string())));
        Some(method.clone())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HttpRequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 默认即可识别的方法名，包括 HTTP/1.1、WebDAV 以及 DeltaV（RFC 3253）定义的方法。
const STANDARD_METHODS: &[&str] = &[
    "GET",
    "PUT",
    "POST",
    "HEAD",
    "OPTIONS",
    "DELETE",
    "TRACE",
    "CONNECT",
    "PROPFIND",
    "PROPPATCH",
    "MKCOL",
    "COPY",
    "MOVE",
    "LOCK",
    "UNLOCK",
    "LABEL",
    "VERSION-CONTROL",
    "REPORT",
    "CHECKIN",
    "CHECKOUT",
    "UNCHECKOUT",
    "MKWORKSPACE",
    "UPDATE",
    "MERGE",
    "BASELINE-CONTROL",
    "MKACTIVITY",
];

lazy_static! {
    static ref METHOD_REGISTRY: RwLock<HashMap<String, HttpRequestMethod>> = {
        let map = STANDARD_METHODS
            .iter()
            .map(|&m| (m.to_string(), HttpRequestMethod(Cow::Borrowed(m))))
            .collect();
        RwLock::new(map)
    };
}

fn is_token(token: &str) -> bool {
    const SEPARATORS: &[u8] = b"()<>@,;:\\\"/[]?={}";
    !token.is_empty()
        && token
            .bytes()
            .all(|b| b.is_ascii_graphic() && !SEPARATORS.contains(&b))
}

/// 将方法集合拼接为 `Allow` 头使用的逗号分隔字符串。集合顺序不作保证。
pub fn join_methods<'a, I>(methods: I) -> String
where
    I: IntoIterator<Item = &'a HttpRequestMethod>,
{
    methods
        .into_iter()
        .map(HttpRequestMethod::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// 查询状态码对应的原因短语，未收录的状态码返回 `None`。
pub fn reason_phrase(code: u16) -> Option<&'static str> {
    STATUS_CODES.get(&code).copied()
}
