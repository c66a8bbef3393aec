use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    pub upload: UploadConfig,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct CameraConfig {
    /// Device index opened at startup, before anything is selected.
    #[serde(default)]
    pub default_index: i32,
    /// Number of capture indices probed when listing devices.
    #[serde(default = "default_max_devices")]
    pub max_devices: i32,
    #[serde(default = "default_stream_fps")]
    pub stream_fps: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            default_index: 0,
            max_devices: default_max_devices(),
            stream_fps: default_stream_fps(),
        }
    }
}

fn default_max_devices() -> i32 {
    10
}

fn default_stream_fps() -> u64 {
    30
}

fn fps_to_delay_ms(fps: u64) -> u64 {
    (1000.0 / fps.max(1) as f64).round() as u64
}

impl CameraConfig {
    pub fn get_stream_delay_ms(&self) -> u64 {
        fps_to_delay_ms(self.stream_fps)
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct DisplayConfig {
    #[serde(default = "default_display_width")]
    pub width: u32,
    #[serde(default = "default_display_height")]
    pub height: u32,
    /// RGB fill for the letterbox margins.
    #[serde(default)]
    pub background: [u8; 3],
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: default_display_width(),
            height: default_display_height(),
            background: [0, 0, 0],
        }
    }
}

fn default_display_width() -> u32 {
    640
}

fn default_display_height() -> u32 {
    480
}

#[derive(Clone, Deserialize, Debug)]
pub struct UploadConfig {
    pub endpoints: Vec<String>,
    #[serde(default = "default_interval_secs")]
    pub default_interval_secs: f32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default = "default_max_log_lines")]
    pub max_log_lines: usize,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_interval_secs() -> f32 {
    3.0
}

fn default_jpeg_quality() -> u8 {
    75
}

fn default_max_log_lines() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            other => Err(format!(
                "{} is not a supported minimum log level. Use either `debug` or `info`.",
                other
            )),
        }
    }
}

/// `WU_SECTION__KEY` overrides; `WU_UPLOAD__ENDPOINTS` is a comma-separated list.
fn environment_source() -> config::Environment {
    config::Environment::with_prefix("WU")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("upload.endpoints")
}

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("no current directory: {}", e)))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

    let config = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(config::File::from(
            configuration_directory.join(format!("{}.yaml", environment.as_str())),
        ))
        .add_source(environment_source())
        .build()?;

    let config: Config = config.try_deserialize::<Config>()?;

    Ok(config)
}
