pub mod service;
pub mod settings;

pub use service::{describe_content, Request, Response, Service};
pub use settings::{Settings, SettingsError};
