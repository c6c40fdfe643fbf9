// Server configuration

#[derive(Clone)]
pub struct ServerConfig {
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: crate::constants::VERSION.to_string(),
        }
    }
}
