// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求处理模块
//!
//! 负责把连接上读到的原始字节解析为强类型的 `Request`，以及反向把 `Request` 写回线路格式。
//! 涵盖：
//! 1. 请求行（Request-Line）的解析（方法、目标 URI、版本）。
//! 2. 头部与正文的读取（委托给 [`Message`]）。
//! 3. 查询字符串（URL-encoded）参数的解码。
//! 4. 用于诊断日志的可读文本输出。

use std::{
    collections::HashMap,
    fmt,
    io::{BufRead, Write},
};

use http::Uri;
use log::{debug, warn};
use percent_encoding::percent_decode_str;

use crate::{
    exception::{Exception, ReadError},
    message::{read_line, trim_line_ending, Message},
    param::{HttpRequestMethod, CRLF},
};

/// 一个完整的 HTTP 请求。构造之后不再修改。
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// HTTP 请求方法
    method: HttpRequestMethod,
    /// 请求目标（可能是 `*`、绝对路径或绝对 URI，含查询字符串）
    uri: Uri,
    /// 协议版本，原样保存请求行中的第三个记号
    version: String,
    /// 头部与正文
    message: Message,
}

impl Request {
    /// 构造请求。协议版本必须显式给出。
    pub fn new(
        method: HttpRequestMethod,
        uri: Uri,
        version: impl Into<String>,
        message: Message,
    ) -> Self {
        Self {
            method,
            uri,
            version: version.into(),
            message,
        }
    }

    /// 从输入流解析一个请求，等价于 `parse_with(reader, None)`。
    pub fn parse<R: BufRead>(reader: &mut R) -> Result<Self, ReadError> {
        Self::parse_with(reader, None)
    }

    /// 从输入流解析一个请求。
    ///
    /// # 逻辑步骤
    /// 1. 跳过请求行之前的空行（部分客户端或中间件会在请求之间多发 CRLF）。
    /// 2. 请求行按单个空格切分，必须恰好得到方法、目标、版本三个记号。
    /// 3. 方法必须已在方法注册表中，目标必须是合法的 URI。
    /// 4. 读取头部块与正文。`interim` 用于在 `Expect: 100-continue` 时写出临时响应。
    ///
    /// # 错误处理
    /// - 读到请求行之前流已结束：`ReadError::Closed`；
    /// - 格式错误：`ReadError::Protocol(Exception::BadRequest)`，消息中包含出错的请求行；
    /// - 其余 I/O 错误：`ReadError::Io`。
    pub fn parse_with<R: BufRead>(
        reader: &mut R,
        interim: Option<&mut dyn Write>,
    ) -> Result<Self, ReadError> {
        let mut line = Vec::new();
        let request_line = loop {
            line.clear();
            if read_line(reader, &mut line)? == 0 {
                return Err(ReadError::Closed);
            }
            let trimmed = trim_line_ending(&line);
            if !trimmed.is_empty() {
                break String::from_utf8(trimmed.to_vec()).map_err(|_| {
                    Exception::BadRequest("request line is not valid UTF-8".to_string())
                })?;
            }
        };

        let tokens: Vec<&str> = request_line.split(' ').collect();
        if tokens.len() != 3 {
            warn!("HTTP请求行格式不正确：{}", request_line);
            return Err(
                Exception::BadRequest(format!("Malformed request line {}", request_line)).into(),
            );
        }

        let method = match HttpRequestMethod::from_token(tokens[0]) {
            Some(m) => m,
            None => {
                warn!("不支持的HTTP请求方法：{}", tokens[0]);
                return Err(
                    Exception::BadRequest(format!("Unsupported method '{}'", tokens[0])).into(),
                );
            }
        };

        let uri = tokens[1]
            .parse::<Uri>()
            .map_err(|e| Exception::BadRequest(format!("Bad Request-URI {}: {}", tokens[1], e)))?;
        let version = tokens[2].trim().to_string();

        let mut message = Message::read_headers(reader)?;
        message.read_body(reader, interim)?;
        debug!("成功解析HTTP请求：{} {} {}", method, uri, version);

        Ok(Self {
            method,
            uri,
            version,
            message,
        })
    }

    /// 把请求写成线路格式，返回写出的字节总数。
    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<u64> {
        let request_line = format!("{} {} {}{}", self.method, self.uri, self.version, CRLF);
        out.write_all(request_line.as_bytes())?;
        let length = request_line.len() as u64 + self.message.write_to(out)?;
        out.flush()?;
        Ok(length)
    }

    /// 解码 URI 查询字符串中的 URL-encoded 参数。
    ///
    /// 查询串先按 `&` 切分，每一段只按第一个 `=` 切成键和值，没有 `=` 的段值为空字符串。
    /// 百分号转义按单字节解码，每个字节对应同值的 ISO-8859-1 字符（不是 UTF-8），`+` 解码为空格。
    /// 重复的键以后出现的为准。
    pub fn decode_query(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        let query = match self.uri.query() {
            Some(q) => q,
            None => return map,
        };
        for piece in query.split('&').filter(|p| !p.is_empty()) {
            let mut parts = piece.splitn(2, '=');
            let key = parts.next().unwrap_or("");
            let value = parts.next().unwrap_or("");
            map.insert(decode_latin1(key), decode_latin1(value));
        }
        map
    }
}

fn decode_latin1(component: &str) -> String {
    let component = component.replace('+', " ");
    percent_decode_str(&component).map(char::from).collect()
}

// --- Getter 访问器实现 ---

impl Request {
    /// 获取请求方法
    pub fn method(&self) -> &HttpRequestMethod {
        &self.method
    }

    /// 获取请求目标 URI
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// 获取请求目标的路径部分（不含查询字符串）
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// 获取协议版本字符串
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    /// 按名称读取头部
    pub fn header(&self, name: &str) -> Option<&str> {
        self.message.header(name)
    }
}

/// 可读文本形式，仅用于诊断日志，不能当作线路格式使用。
impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}{}", self.method, self.uri, self.version, CRLF)?;
        for header in self.message.headers() {
            write!(f, "{}{}", header, CRLF)?;
        }
        f.write_str(CRLF)?;
        if let Some(body) = self.message.body() {
            f.write_str(&String::from_utf8_lossy(body))?;
        }
        Ok(())
    }
}
