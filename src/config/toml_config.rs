use crate::config::configurator::ConfiguratorOptions;
use crate::utils::error::{Result, ScaffoldError};
use crate::utils::validation::{validate_path, Validate};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static ENV_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env reference pattern is valid"));

impl ConfiguratorOptions {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    ///
    /// ```toml
    /// file = ".env.local"
    /// strict = true
    ///
    /// [validators.PORT]
    /// type = "port"
    /// default = 8080
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = substitute_env_vars(content);

        let options: Self =
            toml::from_str(&processed_content).map_err(|e| ScaffoldError::ConfigError {
                message: format!("TOML parsing error: {}", e),
            })?;
        options.validate()?;
        Ok(options)
    }
}

/// 替換環境變數 (例如 ${API_KEY})；未設定的變數保持原樣
fn substitute_env_vars(content: &str) -> String {
    ENV_REFERENCE
        .replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
}

impl Validate for ConfiguratorOptions {
    fn validate(&self) -> Result<()> {
        if let Some(file) = &self.file {
            validate_path("file", &file.to_string_lossy())?;
        }

        // 預設值必須能通過自己的驗證器
        for (name, validator) in &self.validators {
            if validator.default.is_some() {
                validator
                    .resolve(name, None)
                    .map_err(|e| ScaffoldError::InvalidConfigValueError {
                        field: format!("validators.{}.default", name),
                        value: validator
                            .default
                            .as_ref()
                            .map(ToString::to_string)
                            .unwrap_or_default(),
                        reason: e.to_string(),
                    })?;
            }
        }

        Ok(())
    }
}
