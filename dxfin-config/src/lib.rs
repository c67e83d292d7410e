use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use dxfin_core::settings::{ImportSettings, LengthUnit, PlacementMode, UnitSelection};
use serde::Deserialize;
use thiserror::Error;

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV: &str = "DXFIN_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub import: ImportDefaults,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 自动发现配置文件：优先读取环境变量 `DXFIN_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 导入对话框各选项的默认值，命令行参数可逐项覆盖。
#[derive(Debug, Clone, Deserialize)]
pub struct ImportDefaults {
    #[serde(default)]
    pub unit: UnitSelection,
    #[serde(default)]
    pub host_unit: LengthUnit,
    #[serde(default)]
    pub move_to_center: bool,
    #[serde(default = "ImportDefaults::default_import_text")]
    pub import_text: bool,
    #[serde(default)]
    pub fix_font_heights: bool,
    #[serde(default = "ImportDefaults::default_drawing_name")]
    pub drawing_name: String,
}

impl ImportDefaults {
    fn default_import_text() -> bool {
        true
    }

    fn default_drawing_name() -> String {
        "Drawing".to_string()
    }

    /// 以这些默认值为指定文件生成导入设置。
    pub fn settings_for(&self, path: impl AsRef<Path>) -> ImportSettings {
        let placement = if self.move_to_center {
            PlacementMode::CenterOfDrawing
        } else {
            PlacementMode::None
        };
        ImportSettings::new(path, self.drawing_name.clone())
            .with_unit(self.unit)
            .with_placement(placement)
            .with_import_text(self.import_text)
            .with_fix_font_heights(self.fix_font_heights)
            .with_host_unit(self.host_unit)
    }
}

impl Default for ImportDefaults {
    fn default() -> Self {
        Self {
            unit: UnitSelection::Auto,
            host_unit: LengthUnit::Millimeter,
            move_to_center: false,
            import_text: Self::default_import_text(),
            fix_font_heights: false,
            drawing_name: Self::default_drawing_name(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
