// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 标准方法处理器
//!
//! GET、HEAD、PUT、DELETE、MKCOL、MOVE、COPY、POST 的处理器。每个处理器先通过后端把请求 URI
//! 解析为资源，再调用资源契约上的对应操作。失败原样返回给分发器翻译。

use std::{
    io::{Read, Write},
    sync::Arc,
};

use http::Uri;
use log::debug;

use crate::{
    backend::{Backend, Identity, Resource},
    exception::Exception,
    namespace::{MethodHandler, NameSpace},
    param::{HttpRequestMethod, OCTET_STREAM},
    request::Request,
    response::{format_system_time, Response},
    util::{decode_path, HtmlBuilder},
};

type Operation = fn(&dyn Resource, &Request, &Identity) -> Result<Response, Exception>;

/// 解析资源并执行一个操作的处理器
pub struct ResourceHandler {
    backend: Arc<dyn Backend>,
    operation: Operation,
}

impl ResourceHandler {
    pub fn new(backend: Arc<dyn Backend>, operation: Operation) -> Self {
        Self { backend, operation }
    }
}

impl MethodHandler for ResourceHandler {
    fn execute(&self, request: &Request, identity: &Identity) -> Result<Option<Response>, Exception> {
        let resource = self.backend.resolve(request.uri(), identity)?;
        (self.operation)(resource.as_ref(), request, identity).map(Some)
    }
}

/// 在分发器上注册全部标准处理器，使用分发器自己的后端。
pub fn register_standard_handlers(namespace: &mut NameSpace) {
    let backend = namespace.backend().clone();
    let table: [(HttpRequestMethod, Operation); 8] = [
        (HttpRequestMethod::GET, get),
        (HttpRequestMethod::HEAD, head),
        (HttpRequestMethod::PUT, put),
        (HttpRequestMethod::DELETE, delete),
        (HttpRequestMethod::MKCOL, mkcol),
        (HttpRequestMethod::MOVE, move_resource),
        (HttpRequestMethod::COPY, copy_resource),
        (HttpRequestMethod::POST, post),
    ];
    for (method, operation) in table {
        namespace.add(method, ResourceHandler::new(backend.clone(), operation));
    }
}

fn get(resource: &dyn Resource, _request: &Request, _identity: &Identity) -> Result<Response, Exception> {
    if let Some(listing) = listing(resource)? {
        return Ok(listing);
    }
    let mut body = Vec::new();
    resource
        .open_for_read()?
        .read_to_end(&mut body)
        .map_err(|e| Exception::from_io(&e, resource.uri()))?;

    let mut response = Response::new(200);
    response
        .add_header("Content-Type", resource.content_type()?)
        .add_header("Last-Modified", format_system_time(resource.last_modified_time()?))
        .set_body(body);
    Ok(response)
}

/// 与 GET 相同的头部，不读取文件内容。连接层只写出头部。
fn head(resource: &dyn Resource, _request: &Request, _identity: &Identity) -> Result<Response, Exception> {
    if let Some(listing) = listing(resource)? {
        return Ok(listing);
    }
    let mut response = Response::new(200);
    response
        .add_header("Content-Type", resource.content_type()?)
        .add_header("Content-Length", resource.content_length()?.to_string())
        .add_header("Last-Modified", format_system_time(resource.last_modified_time()?));
    Ok(response)
}

/// 检查资源存在并通过授权检查；集合返回文件列表页面，文件返回 `None`。
fn listing(resource: &dyn Resource) -> Result<Option<Response>, Exception> {
    if !resource.exists() {
        return Err(Exception::not_found(resource.uri()));
    }
    resource.content_length()?;
    if !resource.is_collection() {
        return Ok(None);
    }
    let children = resource.children()?;
    debug!("生成{}的文件列表，共{}项", resource.uri(), children.len());
    let path = decode_path(resource.uri().path());
    Ok(Some(Response::html(200, HtmlBuilder::from_resources(&path, &children).build())))
}

/// 资源不存在时创建（201），否则覆盖（204）。
fn put(resource: &dyn Resource, request: &Request, _identity: &Identity) -> Result<Response, Exception> {
    let created = !resource.exists();
    if created {
        resource.create(request.header("Content-Type").unwrap_or(OCTET_STREAM))?;
    } else if resource.is_collection() {
        return Err(Exception::method_not_allowed(
            format!("{}: cannot PUT to a collection", resource.uri()),
            resource.allowed_methods(),
        ));
    }

    let body = request.message().body().cloned().unwrap_or_default();
    let mut out = resource.open_for_write()?;
    out.write_all(&body)
        .and_then(|_| out.flush())
        .map_err(|e| Exception::from_io(&e, resource.uri()))?;
    Ok(Response::new(if created { 201 } else { 204 }))
}

fn delete(resource: &dyn Resource, _request: &Request, _identity: &Identity) -> Result<Response, Exception> {
    resource.delete()?;
    Ok(Response::new(204))
}

fn mkcol(resource: &dyn Resource, _request: &Request, _identity: &Identity) -> Result<Response, Exception> {
    resource.create_collection()?;
    Ok(Response::new(201))
}

/// 目标由 `Destination` 头部给出，可以是绝对 URI 或绝对路径，只使用其中的路径部分。
fn destination(request: &Request) -> Result<Uri, Exception> {
    let destination = request.header("Destination").ok_or_else(|| {
        Exception::BadRequest(format!("{} requires a Destination header", request.method()))
    })?;
    destination
        .trim()
        .parse::<Uri>()
        .map_err(|e| Exception::BadRequest(format!("Bad Destination {}: {}", destination, e)))
}

fn move_resource(resource: &dyn Resource, request: &Request, _identity: &Identity) -> Result<Response, Exception> {
    let status = resource.move_to(&destination(request)?)?;
    Ok(Response::new(status))
}

fn copy_resource(resource: &dyn Resource, request: &Request, _identity: &Identity) -> Result<Response, Exception> {
    let status = resource.copy_to(&destination(request)?)?;
    Ok(Response::new(status))
}

fn post(resource: &dyn Resource, request: &Request, identity: &Identity) -> Result<Response, Exception> {
    resource.handle_post(request, identity)
}
