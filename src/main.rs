// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # WebDAV 服务器入口
//!
//! - 从 `config/development.toml` 读取运行参数，从 `config/log4rs.yaml` 初始化日志
//! - 基于 Tokio 接收连接，每个连接的同步处理循环运行在阻塞线程池中
//! - 后台管理控制台（CLI 指令交互）

use std::{
    io::{BufReader, BufWriter},
    net::{Ipv4Addr, SocketAddrV4},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use davserver::{
    register_standard_handlers, Challenge, Config, FileSystemBackend, HttpServer, NameSpace,
    ServerProfile,
};
use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncBufReadExt, BufReader as AsyncBufReader},
    net::{TcpListener, TcpStream},
    runtime::Builder,
    sync::Notify,
};

const CONFIG_FILE: &str = "config/development.toml";
const LOG_CONFIG_FILE: &str = "config/log4rs.yaml";

fn main() {
    // 1. 初始化日志系统
    if let Err(e) = log4rs::init_file(LOG_CONFIG_FILE, Default::default()) {
        eprintln!("无法从{}初始化日志系统：{}", LOG_CONFIG_FILE, e);
    }

    // 2. 载入配置，失败时使用默认配置
    let config = match Config::from_toml(CONFIG_FILE) {
        Ok(c) => {
            info!("配置文件已载入");
            c
        }
        Err(e) => {
            error!("{}，使用默认配置", e);
            Config::new()
        }
    };
    info!("www root: {}", config.www_root());

    // 3. 按配置的工作线程数构建运行时
    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
    {
        Ok(r) => r,
        Err(e) => {
            error!("无法创建Tokio运行时：{}", e);
            return;
        }
    };
    runtime.block_on(run(config));
}

/// 由配置组装挂载点与后端
fn build_server(config: &Config) -> HttpServer {
    let profile = Arc::new(ServerProfile::default());
    let mut backend = FileSystemBackend::new(config.www_root())
        .with_default_document(config.default_document())
        .writable(config.writable());
    if let Some(realm) = config.auth_realm() {
        info!("匿名请求需要认证，realm：{}", realm);
        backend = backend.with_challenge(Challenge::basic(realm));
    }
    if config.writable() {
        warn!("文档根目录{}已开启写操作", config.www_root());
    }

    let mut namespace = NameSpace::new(profile.clone(), Arc::new(backend));
    register_standard_handlers(&mut namespace);
    let mut server = HttpServer::new(profile);
    server.add_namespace(config.mount_prefix(), namespace);
    server
}

async fn run(config: Config) {
    let server = Arc::new(build_server(&config));

    // 网络层初始化：全地址监听 (0.0.0.0) 或本地回环监听 (127.0.0.1)
    let port = config.port();
    let address = match config.local() {
        true => Ipv4Addr::new(127, 0, 0, 1),
        false => Ipv4Addr::new(0, 0, 0, 0),
    };
    info!("服务端将在{}:{}上监听Socket连接", address, port);
    let listener = match TcpListener::bind(SocketAddrV4::new(address, port)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("无法绑定端口：{}，错误：{}", port, e);
            return;
        }
    };
    info!("端口{}绑定完成", port);

    let shutdown = Arc::new(Notify::new());
    let active_connection = Arc::new(Mutex::new(0u32));
    tokio::spawn(console(shutdown.clone(), active_connection.clone()));

    let timeout = Duration::from_millis(config.client_timeout_ms());
    let mut id: u128 = 0;
    loop {
        let (stream, addr) = tokio::select! {
            _ = shutdown.notified() => {
                info!("主循环接收到停机指令，正在退出...");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("接受连接失败：{}", e);
                    continue;
                }
            },
        };
        debug!("[ID{}]新的连接：{}", id, addr);

        let server = server.clone();
        let active_connection = active_connection.clone();
        tokio::task::spawn_blocking(move || {
            *lock(&active_connection) += 1;
            handle_connection(&server, stream, timeout, id);
            *lock(&active_connection) -= 1;
        });
        id += 1;
    }
}

/// 在阻塞线程上处理一个连接的全部请求
fn handle_connection(server: &HttpServer, stream: TcpStream, timeout: Duration, id: u128) {
    let stream = match stream.into_std() {
        Ok(s) => s,
        Err(e) => {
            error!("[ID{}]无法转换TcpStream：{}", id, e);
            return;
        }
    };
    if let Err(e) = stream
        .set_nonblocking(false)
        .and_then(|_| stream.set_read_timeout(Some(timeout)))
    {
        error!("[ID{}]无法设置连接参数：{}", id, e);
        return;
    }
    let read_half = match stream.try_clone() {
        Ok(s) => s,
        Err(e) => {
            error!("[ID{}]无法复制TcpStream：{}", id, e);
            return;
        }
    };

    let mut reader = BufReader::new(read_half);
    let mut writer = BufWriter::new(stream);
    if let Err(e) = server.serve_connection(&mut reader, &mut writer, id) {
        warn!("[ID{}]写回响应时出错：{}", id, e);
    }
    debug!("[ID{}]连接已关闭", id);
}

/// 交互式管理控制台
async fn console(shutdown: Arc<Notify>, active_connection: Arc<Mutex<u32>>) {
    let mut reader = AsyncBufReader::new(tokio::io::stdin());
    let mut input = String::new();
    loop {
        input.clear();
        match reader.read_line(&mut input).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        match input.trim() {
            "stop" => {
                println!("停机指令已激活，服务器将停止接受新连接...");
                shutdown.notify_one();
                break;
            }
            "help" => {
                println!("== WebDAV Server Help ==");
                println!("stop   - 发出停机信号");
                println!("status - 查看当前服务器运行状态");
                println!("help   - 显示此帮助信息");
                println!("========================");
            }
            "status" => {
                println!("== WebDAV Server 状态 ==");
                println!("当前活跃连接数: {}", *lock(&active_connection));
                println!("========================");
            }
            "" => {}
            cmd => println!("无效的命令：{}", cmd),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("连接计数锁被污染，恢复并继续");
            poisoned.into_inner()
        }
    }
}
