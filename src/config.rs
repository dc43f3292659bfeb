use ::config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// A `memory:` URL keeps everything in process.
    pub database_url: String,
    #[serde(default)]
    pub run_migrations: bool,
    #[serde(default = "default_server_addr")]
    pub server_addr: String,
    /// Header the authenticating proxy fills with the username.
    #[serde(default = "default_identity_header")]
    pub identity_header: String,
    #[serde(default = "default_login_url")]
    pub login_url: String,
}

fn default_server_addr() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_identity_header() -> String {
    "x-remote-user".to_string()
}

fn default_login_url() -> String {
    "/api/login".to_string()
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::default())
            .build()?;

        s.try_deserialize()
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with("memory:")
    }
}
