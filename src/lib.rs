mod routes;

pub mod app;
pub mod camera;
pub mod capture_loop;
pub mod config;
pub mod device_selector;
pub mod letterbox;
pub mod response;
pub mod server;
pub mod session;
pub mod stream;
pub mod telemetry;
pub mod uploader;

pub use app::start_app;
