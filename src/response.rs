// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 响应模块
//!
//! `Response` 由状态行（版本、状态码、原因短语）和一个 [`Message`]（头部与正文）组成。
//! 方法处理器构造响应，连接层负责把它写回客户端。

use std::{fmt, io::Write, time::SystemTime};

use bytes::Bytes;
use chrono::prelude::*;
use log::warn;

use crate::{
    message::Message,
    param::{reason_phrase, CRLF, HTTP_VERSION, TEXT_PLAIN},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    version: String,
    status_code: u16,
    information: String,
    message: Message,
}

impl Response {
    /// 构造一个没有正文的响应
    pub fn new(code: u16) -> Self {
        let mut response = Self {
            version: HTTP_VERSION.to_string(),
            status_code: 200,
            information: "OK".to_string(),
            message: Message::new(),
        };
        response.set_code(code);
        response
    }

    /// 纯文本响应，`Content-Type` 为 `text/plain;charset=utf-8`
    pub fn text(code: u16, body: impl Into<String>) -> Self {
        let mut response = Self::new(code);
        response.add_header("Content-Type", TEXT_PLAIN);
        response.set_body(body.into());
        response
    }

    /// HTML 响应
    pub fn html(code: u16, body: impl Into<String>) -> Self {
        let mut response = Self::new(code);
        response.add_header("Content-Type", "text/html;charset=utf-8");
        response.set_body(body.into());
        response
    }

    pub fn set_code(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.information = match reason_phrase(code) {
            Some(reason) => reason.to_string(),
            None => {
                warn!("未收录的状态码：{}", code);
                "Unknown".to_string()
            }
        };
        self
    }

    pub fn set_version(&mut self, version: impl Into<String>) -> &mut Self {
        self.version = version.into();
        self
    }

    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.message.add_header(name, value);
        self
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.message.set_body(body);
        self
    }

    /// 写出状态行、头部与正文，返回写出的字节总数。
    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<u64> {
        let status_line = self.status_line();
        out.write_all(status_line.as_bytes())?;
        let length = status_line.len() as u64 + self.message.write_to(out)?;
        out.flush()?;
        Ok(length)
    }

    /// 只写出状态行与头部，用于 HEAD 请求。
    pub fn write_head_to<W: Write>(&self, out: &mut W) -> std::io::Result<u64> {
        let status_line = self.status_line();
        out.write_all(status_line.as_bytes())?;
        let length = status_line.len() as u64 + self.message.write_head_to(out)?;
        out.flush()?;
        Ok(length)
    }

    fn status_line(&self) -> String {
        format!(
            "{} {} {}{}",
            self.version, self.status_code, self.information, CRLF
        )
    }
}

// --- Getter 访问器实现 ---

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.message.header(name)
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.message.body()
    }

    pub fn message(&self) -> &Message {
        &self.message
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.status_line())?;
        for header in self.message.headers() {
            write!(f, "{}{}", header, CRLF)?;
        }
        f.write_str(CRLF)
    }
}

/// 按 RFC 9110 的 IMF-fixdate 格式输出时间，用于 `Date` 与 `Last-Modified` 头部。
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// 把文件系统时间戳转换为 HTTP 日期字符串
pub fn format_system_time(time: SystemTime) -> String {
    format_date(&DateTime::<Utc>::from(time))
}
