// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 运行参数，从 TOML 文件读取。

use std::{fs, io};

use log::warn;
use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

use crate::param::DEFAULT_DOCUMENT;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("无法读取配置文件{path}：{source}")]
    Io { path: String, source: io::Error },
    #[error("配置文件格式错误：{0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    www_root: String,
    port: u16,
    worker_threads: usize,
    local: bool,
    #[serde(default = "default_mount_prefix")]
    mount_prefix: String,
    #[serde(default = "default_document")]
    default_document: String,
    #[serde(default)]
    writable: bool,
    #[serde(default = "default_client_timeout_ms")]
    client_timeout_ms: u64,
    #[serde(default)]
    auth_realm: Option<String>,
}

fn default_mount_prefix() -> String {
    "/".to_string()
}

fn default_document() -> String {
    DEFAULT_DOCUMENT.to_string()
}

fn default_client_timeout_ms() -> u64 {
    30000
}

impl Config {
    pub fn new() -> Self {
        Self {
            www_root: ".".to_string(),
            port: 7878,
            worker_threads: num_cpus::get(),
            local: true,
            mount_prefix: default_mount_prefix(),
            default_document: default_document(),
            writable: false,
            client_timeout_ms: default_client_timeout_ms(),
            auth_realm: None,
        }
    }

    pub fn from_toml(filename: &str) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(filename).map_err(|source| ConfigError::Io {
            path: filename.to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let mut raw_config: Config = toml::from_str(text)?;
        if raw_config.worker_threads == 0 {
            raw_config.worker_threads = num_cpus::get();
        }
        if !raw_config.mount_prefix.starts_with('/') {
            warn!(
                "mount_prefix必须以/开头，{}将被改为/{}",
                raw_config.mount_prefix, raw_config.mount_prefix
            );
            raw_config.mount_prefix.insert(0, '/');
        }
        Ok(raw_config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn www_root(&self) -> &str {
        &self.www_root
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn mount_prefix(&self) -> &str {
        &self.mount_prefix
    }

    pub fn default_document(&self) -> &str {
        &self.default_document
    }

    pub fn writable(&self) -> bool {
        self.writable
    }

    pub fn client_timeout_ms(&self) -> u64 {
        self.client_timeout_ms
    }

    pub fn auth_realm(&self) -> Option<&str> {
        self.auth_realm.as_deref()
    }
}
