use crate::core::preprocessing::{ImagePreprocessor, TensorLayout, DEFAULT_IMAGE_SIZE};
use crate::utils::error::{AppError, Result};
use crate::utils::validation::{
    validate_existing_file, validate_path, validate_positive_number, validate_range, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_mb: usize,
    /// Answer validation failures with 422 and internal faults with 500.
    pub strict_status_codes: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_mb: 10,
            strict_status_codes: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub image_model: String,
    pub tabular_model: String,
    pub image_size: u32,
    pub layout: TensorLayout,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            image_model: "models/image_model.onnx".to_string(),
            tabular_model: "models/rf_numeric_demo.onnx".to_string(),
            image_size: DEFAULT_IMAGE_SIZE,
            layout: TensorLayout::Nhwc,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: bool,
}

impl ServiceConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AppError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AppError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${MODEL_DIR})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AppError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Checks values only; model files are checked by [`ServiceConfig::validate_models_exist`].
    pub fn validate_config(&self) -> Result<()> {
        crate::utils::validation::validate_non_empty_string("server.host", &self.server.host)?;
        validate_positive_number("server.port", self.server.port as usize, 1)?;
        validate_range("server.max_upload_mb", self.server.max_upload_mb, 1, 512)?;
        validate_path("models.image_model", &self.models.image_model)?;
        validate_path("models.tabular_model", &self.models.tabular_model)?;
        validate_range("models.image_size", self.models.image_size, 16, 1024)?;

        if let Some(level) = &self.logging.level {
            let valid_levels = ["trace", "debug", "info", "warn", "error"];
            if !valid_levels.contains(&level.as_str()) {
                return Err(AppError::InvalidConfigValueError {
                    field: "logging.level".to_string(),
                    value: level.clone(),
                    reason: format!("Valid levels: {}", valid_levels.join(", ")),
                });
            }
        }

        Ok(())
    }

    /// Missing model artifacts are fatal at startup.
    pub fn validate_models_exist(&self) -> Result<()> {
        validate_existing_file("image", &self.models.image_model)?;
        validate_existing_file("tabular", &self.models.tabular_model)?;
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.server.max_upload_mb * 1024 * 1024
    }

    pub fn preprocessor(&self) -> ImagePreprocessor {
        ImagePreprocessor::new(self.models.image_size, self.models.layout)
    }
}

impl Validate for ServiceConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[server]
host = "127.0.0.1"
port = 9000
max_upload_mb = 4
strict_status_codes = true

[models]
image_model = "/srv/models/cnn.onnx"
tabular_model = "/srv/models/rf.onnx"
image_size = 128
layout = "nchw"

[logging]
level = "debug"
json = true
"#;

        let config = ServiceConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.max_upload_bytes(), 4 * 1024 * 1024);
        assert!(config.server.strict_status_codes);
        assert_eq!(config.models.layout, TensorLayout::Nchw);
        assert_eq!(config.preprocessor().size(), 128);
        assert!(config.logging.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_for_empty_file() {
        let config = ServiceConfig::from_toml_str("").unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.models.image_size, 224);
        assert_eq!(config.models.layout, TensorLayout::Nhwc);
        assert!(!config.server.strict_status_codes);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("NUTRISCAN_TEST_MODEL_DIR", "/opt/models");

        let toml_content = r#"
[models]
image_model = "${NUTRISCAN_TEST_MODEL_DIR}/image.onnx"
tabular_model = "${NUTRISCAN_TEST_UNSET_VAR}/rf.onnx"
"#;

        let config = ServiceConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.models.image_model, "/opt/models/image.onnx");
        // 未設定的變數保持原樣
        assert_eq!(config.models.tabular_model, "${NUTRISCAN_TEST_UNSET_VAR}/rf.onnx");

        std::env::remove_var("NUTRISCAN_TEST_MODEL_DIR");
    }

    #[test]
    fn test_config_validation() {
        let config = ServiceConfig::from_toml_str("[models]\nimage_size = 4\n").unwrap();
        assert!(config.validate().is_err());

        let config = ServiceConfig::from_toml_str("[logging]\nlevel = \"loud\"\n").unwrap();
        assert!(config.validate().is_err());

        assert!(ServiceConfig::from_toml_str("[server]\nport = \"eighty\"\n").is_err());
    }

    #[test]
    fn test_missing_models_are_reported() {
        let config = ServiceConfig::default();
        let err = config.validate_models_exist().unwrap_err();
        assert!(matches!(err, AppError::ModelLoadError { ref model, .. } if model == "image"));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[server]\nport = 8080\n")
            .unwrap();

        let config = ServiceConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
    }
}
