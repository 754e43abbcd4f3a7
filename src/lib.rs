pub mod backend;
pub mod config;
pub mod exception;
pub mod filesystem;
pub mod handlers;
pub mod message;
pub mod namespace;
pub mod options;
pub mod param;
pub mod request;
pub mod response;
pub mod server;
pub mod util;

pub use backend::{Backend, Challenge, Identity, Resource};
pub use config::Config;
pub use exception::{Exception, ReadError};
pub use filesystem::{FileSystemBackend, FileSystemResource};
pub use handlers::register_standard_handlers;
pub use message::Message;
pub use namespace::{MethodHandler, NameSpace};
pub use options::OptionsHandler;
pub use param::HttpRequestMethod;
pub use request::Request;
pub use response::Response;
pub use server::{HttpServer, ServerProfile};
pub use util::HtmlBuilder;
