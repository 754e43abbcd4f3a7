// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 文件系统后端
//!
//! 把 URI 路径直接映射到文档根目录下的文件：文件路径是文档根目录与百分号解码后的 URI 路径的拼接，
//! 根路径 `/` 映射到默认文档。路径中的 `..` 不做任何清理。
//!
//! 写操作需要显式开启（[`FileSystemBackend::writable`]）。只读模式下所有修改操作都返回
//! `405 Method Not Allowed`，并附带 `GET, HEAD, OPTIONS`。

use std::{
    fs::{self, File, OpenOptions},
    io::{self, Read, Write},
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};

use http::Uri;
use log::{debug, info, warn};

use crate::{
    backend::{Backend, Challenge, Identity, Resource},
    exception::Exception,
    param::{media_type_for, HttpRequestMethod, DEFAULT_DOCUMENT},
    request::Request,
    response::Response,
    util::decode_path,
};

#[derive(Debug, Clone)]
struct Settings {
    root: PathBuf,
    default_document: String,
    writable: bool,
    challenge: Option<Challenge>,
}

/// 以本地目录为存储的后端
#[derive(Debug, Clone)]
pub struct FileSystemBackend {
    settings: Arc<Settings>,
}

impl FileSystemBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            settings: Arc::new(Settings {
                root: root.into(),
                default_document: DEFAULT_DOCUMENT.to_string(),
                writable: false,
                challenge: None,
            }),
        }
    }

    /// 设置根路径 `/` 映射到的文档名
    pub fn with_default_document(mut self, document: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.settings).default_document = document.into();
        self
    }

    /// 开启或关闭写操作
    pub fn writable(mut self, writable: bool) -> Self {
        Arc::make_mut(&mut self.settings).writable = writable;
        self
    }

    /// 要求匿名请求方在读取资源前先认证
    pub fn with_challenge(mut self, challenge: Challenge) -> Self {
        Arc::make_mut(&mut self.settings).challenge = Some(challenge);
        self
    }

    /// 构造给定 URI 的资源对象
    pub fn resource(&self, uri: &Uri, identity: &Identity) -> FileSystemResource {
        FileSystemResource::new(self.settings.clone(), uri.clone(), identity.clone())
    }
}

impl Backend for FileSystemBackend {
    fn authentication_challenge(&self, _uri: &Uri) -> Option<Challenge> {
        self.settings.challenge.clone()
    }

    fn resolve(&self, uri: &Uri, identity: &Identity) -> Result<Box<dyn Resource>, Exception> {
        let resource = self.resource(uri, identity);
        debug!("解析资源：{} -> {}", uri, resource.path.display());
        Ok(Box::new(resource))
    }
}

/// 文件系统中的一个文件或目录
#[derive(Debug)]
pub struct FileSystemResource {
    settings: Arc<Settings>,
    uri: Uri,
    identity: Identity,
    path: PathBuf,
}

impl FileSystemResource {
    fn new(settings: Arc<Settings>, uri: Uri, identity: Identity) -> Self {
        let path = map_path(&settings, uri.path(), true);
        Self {
            settings,
            uri,
            identity,
            path,
        }
    }

    /// 资源对应的本地路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_writable(&self, operation: &str) -> Result<(), Exception> {
        if self.settings.writable {
            Ok(())
        } else {
            Err(Exception::method_not_allowed(
                format!("{} {}: read-only document root", operation, self.uri),
                self.allowed_methods(),
            ))
        }
    }

    fn ensure_parent_exists(&self) -> Result<(), Exception> {
        match self.path.parent() {
            Some(parent) if !parent.exists() => Err(Exception::conflict(format!(
                "{}: parent does not exist",
                self.uri
            ))),
            _ => Ok(()),
        }
    }

    /// 同一后端、同一请求方下另一个 URI 对应的资源。不做默认文档映射。
    fn sibling(&self, uri: &Uri) -> FileSystemResource {
        Self {
            settings: self.settings.clone(),
            uri: uri.clone(),
            identity: self.identity.clone(),
            path: map_path(&self.settings, uri.path(), false),
        }
    }

    fn metadata(&self) -> Result<fs::Metadata, Exception> {
        fs::metadata(&self.path).map_err(|e| Exception::from_io(&e, &self.uri))
    }
}

/// 文档根目录与解码后的 URI 路径拼接得到本地路径
fn map_path(settings: &Settings, uri_path: &str, use_default_document: bool) -> PathBuf {
    if use_default_document && uri_path == "/" {
        return settings.root.join(&settings.default_document);
    }
    let decoded = decode_path(uri_path);
    settings.root.join(decoded.trim_start_matches('/'))
}

impl Resource for FileSystemResource {
    fn uri(&self) -> &Uri {
        &self.uri
    }

    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn is_collection(&self) -> bool {
        self.path.is_dir()
    }

    fn children(&self) -> Result<Vec<Box<dyn Resource>>, Exception> {
        let entries = fs::read_dir(&self.path).map_err(|e| Exception::from_io(&e, &self.uri))?;
        let parent = self.uri.path().trim_end_matches('/');
        let mut children: Vec<Box<dyn Resource>> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Exception::from_io(&e, &self.uri))?;
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!("跳过非UTF-8的文件名：{:?}", raw);
                    continue;
                }
            };
            let child_uri = match format!("{}/{}", parent, name).parse::<Uri>() {
                Ok(uri) => uri,
                Err(e) => {
                    warn!("文件名{}无法构成合法的URI，已跳过：{}", name, e);
                    continue;
                }
            };
            children.push(Box::new(FileSystemResource::new(
                self.settings.clone(),
                child_uri,
                self.identity.clone(),
            )));
        }
        Ok(children)
    }

    fn content_type(&self) -> Result<String, Exception> {
        let extension = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        Ok(media_type_for(extension).to_string())
    }

    fn content_length(&self) -> Result<u64, Exception> {
        if let Some(challenge) = &self.settings.challenge {
            if self.identity.is_anonymous() {
                return Err(Exception::unauthorized(
                    format!("{}: authentication required", self.uri),
                    challenge.clone(),
                ));
            }
        }
        if !self.path.exists() {
            return Err(Exception::not_found(&self.uri));
        }
        Ok(self.metadata()?.len())
    }

    fn creation_time(&self) -> Result<SystemTime, Exception> {
        let metadata = self.metadata()?;
        metadata
            .created()
            .or_else(|_| metadata.modified())
            .map_err(|e| Exception::from_io(&e, &self.uri))
    }

    fn last_modified_time(&self) -> Result<SystemTime, Exception> {
        self.metadata()?
            .modified()
            .map_err(|e| Exception::from_io(&e, &self.uri))
    }

    fn open_for_read(&self) -> Result<Box<dyn Read + Send>, Exception> {
        match File::open(&self.path) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) => {
                warn!("无法打开文件{}：{}", self.path.display(), e);
                Err(Exception::from_io(&e, &self.uri))
            }
        }
    }

    fn open_for_write(&self) -> Result<Box<dyn Write + Send>, Exception> {
        self.ensure_writable("PUT")?;
        match File::create(&self.path) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) => {
                warn!("无法写入文件{}：{}", self.path.display(), e);
                Err(Exception::from_io(&e, &self.uri))
            }
        }
    }

    fn allowed_methods(&self) -> Vec<HttpRequestMethod> {
        let mut methods = vec![
            HttpRequestMethod::GET,
            HttpRequestMethod::HEAD,
            HttpRequestMethod::OPTIONS,
        ];
        if self.settings.writable {
            methods.extend([
                HttpRequestMethod::PUT,
                HttpRequestMethod::DELETE,
                HttpRequestMethod::MKCOL,
                HttpRequestMethod::MOVE,
                HttpRequestMethod::COPY,
            ]);
        }
        methods
    }

    fn create(&self, content_type: &str) -> Result<(), Exception> {
        self.ensure_writable("PUT")?;
        self.ensure_parent_exists()?;
        if self.path.exists() {
            return Err(Exception::method_not_allowed(
                format!("{}: resource already exists", self.uri),
                self.allowed_methods(),
            ));
        }
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .map_err(|e| Exception::from_io(&e, &self.uri))?;
        info!("创建资源{}（{}）", self.path.display(), content_type);
        Ok(())
    }

    fn delete(&self) -> Result<(), Exception> {
        self.ensure_writable("DELETE")?;
        if !self.path.exists() {
            return Err(Exception::not_found(&self.uri));
        }
        let result = if self.path.is_dir() {
            fs::remove_dir_all(&self.path)
        } else {
            fs::remove_file(&self.path)
        };
        result.map_err(|e| Exception::from_io(&e, &self.uri))?;
        info!("删除资源{}", self.path.display());
        Ok(())
    }

    fn handle_post(&self, _request: &Request, _identity: &Identity) -> Result<Response, Exception> {
        Err(Exception::method_not_allowed(
            format!("POST {}: static resources do not accept POST", self.uri),
            self.allowed_methods(),
        ))
    }

    fn move_to(&self, destination: &Uri) -> Result<u16, Exception> {
        self.ensure_writable("MOVE")?;
        let target = map_path(&self.settings, destination.path(), false);
        if target.exists() {
            return Err(Exception::conflict(format!(
                "{}: destination already exists",
                destination
            )));
        }
        if !self.path.exists() {
            return Err(Exception::not_found(&self.uri));
        }
        fs::rename(&self.path, &target).map_err(|e| {
            Exception::internal(format!("MOVE {} -> {}: {}", self.uri, destination, e))
        })?;
        info!("移动资源{} -> {}", self.path.display(), target.display());
        Ok(201)
    }

    /// 集合只复制集合本身，不复制其中的成员。
    fn copy_to(&self, destination: &Uri) -> Result<u16, Exception> {
        self.ensure_writable("COPY")?;
        if !self.path.exists() {
            return Err(Exception::not_found(&self.uri));
        }
        let target = self.sibling(destination);
        let replaced = target.exists();

        if self.is_collection() {
            if replaced {
                target.delete()?;
            }
            target.create_collection()?;
        } else {
            if !replaced {
                target.create(&self.content_type()?)?;
            }
            let mut input = self.open_for_read()?;
            let mut output = target.open_for_write()?;
            io::copy(&mut input, &mut output)
                .and_then(|_| output.flush())
                .map_err(|e| {
                    Exception::internal(format!("COPY {} -> {}: {}", self.uri, destination, e))
                })?;
        }
        info!("复制资源{} -> {}", self.path.display(), target.path.display());
        Ok(if replaced { 204 } else { 201 })
    }

    fn create_collection(&self) -> Result<(), Exception> {
        self.ensure_writable("MKCOL")?;
        self.ensure_parent_exists()?;
        if let Err(e) = fs::create_dir(&self.path) {
            debug!("无法创建目录{}：{}", self.path.display(), e);
            return Err(Exception::method_not_allowed(
                format!("{}: not created", self.uri),
                self.allowed_methods(),
            ));
        }
        info!("创建集合{}", self.path.display());
        Ok(())
    }
}
