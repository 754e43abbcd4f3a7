// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 报文（头部 + 正文）模块
//!
//! 请求与响应共用的报文部分：一组头部字段以及可选的正文。
//!
//! 头部以名称的小写形式为键保存在 `HashMap` 中，因此：
//! - 迭代顺序不作任何保证；
//! - 同名头部重复出现时，后出现的值覆盖先前的值。

use std::{
    collections::HashMap,
    fmt,
    io::{BufRead, Read, Write},
};

use bytes::Bytes;
use log::debug;

use crate::{
    exception::{Exception, ReadError},
    param::CRLF,
};

/// 单行（请求行、头部行、分块大小行）允许的最大字节数
pub const MAX_LINE_LENGTH: usize = 16 * 1024;

/// 一个头部字段，保留客户端发送时的名称写法。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    name: String,
    value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)
    }
}

/// 报文：头部集合与可选正文。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    headers: HashMap<String, Header>,
    body: Option<Bytes>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(body: impl Into<Bytes>) -> Self {
        Self {
            headers: HashMap::new(),
            body: Some(body.into()),
        }
    }

    /// 添加头部。同名（不区分大小写）头部已存在时被覆盖。
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let header = Header::new(name, value);
        self.headers.insert(header.name.to_ascii_lowercase(), header);
        self
    }

    /// 按名称（不区分大小写）读取头部的值。
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|h| h.value.as_str())
    }

    pub fn remove_header(&mut self, name: &str) -> Option<Header> {
        self.headers.remove(&name.to_ascii_lowercase())
    }

    /// 所有头部，顺序不作保证。
    pub fn headers(&self) -> impl Iterator<Item = &Header> {
        self.headers.values()
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.body = Some(body.into());
        self
    }

    /// 从输入流读取头部块，直到遇到空行为止。正文留在流中。
    ///
    /// 以空格或制表符开头的行是上一行的续行，其内容以一个空格拼接到上一个头部的值上。
    pub fn read_headers<R: BufRead>(reader: &mut R) -> Result<Self, ReadError> {
        let mut message = Self::new();
        let mut pending: Option<(String, String)> = None;
        let mut line = Vec::new();

        loop {
            line.clear();
            if read_line(reader, &mut line)? == 0 {
                return Err(ReadError::Io(std::io::ErrorKind::UnexpectedEof.into()));
            }
            let text = trim_line_ending(&line);
            if text.is_empty() {
                break;
            }
            let text = std::str::from_utf8(text)
                .map_err(|_| Exception::BadRequest("header line is not valid UTF-8".to_string()))?;

            if text.starts_with(' ') || text.starts_with('\t') {
                match pending.as_mut() {
                    Some((_, value)) => {
                        if !value.is_empty() {
                            value.push(' ');
                        }
                        value.push_str(text.trim());
                    }
                    None => {
                        return Err(Exception::BadRequest(format!(
                            "continuation line without a header: {:?}",
                            text
                        ))
                        .into())
                    }
                }
                continue;
            }

            if let Some((name, value)) = pending.take() {
                message.add_header(name, value);
            }
            let (name, value) = text.split_once(':').ok_or_else(|| {
                Exception::BadRequest(format!("malformed header line: {:?}", text))
            })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(Exception::BadRequest(format!("empty header name: {:?}", text)).into());
            }
            pending = Some((name.to_string(), value.trim().to_string()));
        }
        if let Some((name, value)) = pending {
            message.add_header(name, value);
        }
        Ok(message)
    }

    /// 根据头部读取正文。
    ///
    /// - `Transfer-Encoding: chunked` 的正文会被解码，解码后该头部被替换为 `Content-Length`；
    /// - 否则按 `Content-Length` 读取相应字节数；
    /// - 两者都没有时认为没有正文。
    ///
    /// 请求带有 `Expect: 100-continue` 且提供了 `interim` 输出流时，会先写出 `100 Continue` 临时响应。
    pub fn read_body<R: BufRead>(
        &mut self,
        reader: &mut R,
        interim: Option<&mut dyn Write>,
    ) -> Result<(), ReadError> {
        let chunked = self
            .header("Transfer-Encoding")
            .map(|te| te.to_ascii_lowercase().contains("chunked"))
            .unwrap_or(false);
        let content_length = match self.header("Content-Length") {
            Some(value) => Some(value.trim().parse::<u64>().map_err(|_| {
                Exception::BadRequest(format!("invalid Content-Length: {:?}", value))
            })?),
            None => None,
        };

        if !chunked && content_length.is_none() {
            return Ok(());
        }

        let expects_continue = self
            .header("Expect")
            .map(|e| e.eq_ignore_ascii_case("100-continue"))
            .unwrap_or(false);
        if expects_continue {
            if let Some(out) = interim {
                debug!("发送100 Continue临时响应");
                out.write_all(b"HTTP/1.1 100 Continue\r\n\r\n")?;
                out.flush()?;
            }
        }

        if chunked {
            let body = read_chunked(reader)?;
            self.remove_header("Transfer-Encoding");
            self.add_header("Content-Length", body.len().to_string());
            self.body = Some(Bytes::from(body));
        } else if let Some(length) = content_length {
            let mut body = Vec::new();
            let read = reader.by_ref().take(length).read_to_end(&mut body)?;
            if (read as u64) < length {
                return Err(ReadError::Io(std::io::ErrorKind::UnexpectedEof.into()));
            }
            self.body = Some(Bytes::from(body));
        }
        Ok(())
    }

    /// 写出头部块与正文，返回写出的字节总数。
    ///
    /// 存在正文且没有 `Content-Length` 或 `Transfer-Encoding` 头部时，自动补上 `Content-Length`。
    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<u64> {
        let head = self.head_bytes();
        out.write_all(&head)?;
        let mut written = head.len() as u64;
        if let Some(body) = &self.body {
            out.write_all(body)?;
            written += body.len() as u64;
        }
        Ok(written)
    }

    /// 只写出头部块（HEAD 响应使用），返回写出的字节数。
    pub fn write_head_to<W: Write>(&self, out: &mut W) -> std::io::Result<u64> {
        let head = self.head_bytes();
        out.write_all(&head)?;
        Ok(head.len() as u64)
    }

    fn head_bytes(&self) -> Vec<u8> {
        let mut head = String::new();
        for header in self.headers.values() {
            head.push_str(&header.to_string());
            head.push_str(CRLF);
        }
        if let Some(body) = &self.body {
            if self.header("Content-Length").is_none() && self.header("Transfer-Encoding").is_none() {
                head.push_str(&format!("Content-Length: {}{}", body.len(), CRLF));
            }
        }
        head.push_str(CRLF);
        head.into_bytes()
    }
}

/// 读取一行（含行尾），行长超过 [`MAX_LINE_LENGTH`] 时报 `400`。返回读取的字节数，0 表示流已结束。
pub(crate) fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> Result<usize, ReadError> {
    let n = reader
        .by_ref()
        .take(MAX_LINE_LENGTH as u64 + 1)
        .read_until(b'\n', buf)?;
    if n > MAX_LINE_LENGTH && !buf.ends_with(b"\n") {
        return Err(Exception::BadRequest(format!("line exceeds {} bytes", MAX_LINE_LENGTH)).into());
    }
    Ok(n)
}

/// 去掉行尾的 CRLF（兼容单独的 LF）。
pub(crate) fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn read_chunked<R: BufRead>(reader: &mut R) -> Result<Vec<u8>, ReadError> {
    let mut body = Vec::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        if read_line(reader, &mut line)? == 0 {
            return Err(ReadError::Io(std::io::ErrorKind::UnexpectedEof.into()));
        }
        let size_line = String::from_utf8_lossy(trim_line_ending(&line)).to_string();
        let size_field = size_line.split(';').next().unwrap_or("").trim();
        let size = u64::from_str_radix(size_field, 16)
            .map_err(|_| Exception::BadRequest(format!("invalid chunk size: {:?}", size_line)))?;

        if size == 0 {
            // 跳过 trailer，直到空行
            loop {
                line.clear();
                if read_line(reader, &mut line)? == 0 || trim_line_ending(&line).is_empty() {
                    return Ok(body);
                }
            }
        }

        let before = body.len();
        reader.by_ref().take(size).read_to_end(&mut body)?;
        if ((body.len() - before) as u64) < size {
            return Err(ReadError::Io(std::io::ErrorKind::UnexpectedEof.into()));
        }
        line.clear();
        read_line(reader, &mut line)?;
        if !trim_line_ending(&line).is_empty() {
            return Err(Exception::BadRequest("chunk data not followed by CRLF".to_string()).into());
        }
    }
}
