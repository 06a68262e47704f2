use crate::config::toml_config::ServiceConfig;
use crate::utils::error::Result;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "nutriscan")]
#[command(about = "Malnutrition screening API: image + biometric classifiers")]
pub struct ServerArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(short, long)]
    pub port: Option<u16>,

    /// ONNX image classifier
    #[arg(long)]
    pub image_model: Option<String>,

    /// ONNX tabular classifier
    #[arg(long)]
    pub tabular_model: Option<String>,

    /// Use 422/500 instead of 200 for failed predictions
    #[arg(long)]
    pub strict_status_codes: bool,

    /// Emit JSON log lines
    #[arg(long)]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl ServerArgs {
    /// Loads the config file (if any) and applies command-line overrides.
    pub fn load_config(&self) -> Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::from_file(path)?,
            None => ServiceConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut ServiceConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(path) = &self.image_model {
            config.models.image_model = path.clone();
        }
        if let Some(path) = &self.tabular_model {
            config.models.tabular_model = path.clone();
        }
        if self.strict_status_codes {
            config.server.strict_status_codes = true;
        }
        if self.json_logs {
            config.logging.json = true;
        }
    }
}
