//! Configuration
//!
//! Explicit configuration structs passed into the bootstrap instead of
//! process-wide state. The diagnostics toggle defaults from the build
//! type (development builds get validation, production builds don't) but
//! can always be overridden per context.

use ash::vk;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diagnostics::DiagnosticsConfig;
use crate::physical::DeviceRequirements;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Configuration file support, keyed on file extension
pub trait FileConfig: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from a TOML or RON file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to a TOML or RON file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, Default::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Everything the bootstrap needs to know, passed in explicitly
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Application name reported to the backend
    pub application_name: String,
    /// Application version (major, minor, patch)
    pub application_version: (u32, u32, u32),
    /// Engine name reported to the backend
    pub engine_name: String,
    /// Engine version (major, minor, patch)
    pub engine_version: (u32, u32, u32),
    /// Vulkan API version hint as (major, minor)
    pub api_version: (u32, u32),
    /// Diagnostics toggle; `None` auto-detects from the build type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<bool>,
    /// Severity and category filters for the diagnostic channel
    pub diagnostics_config: DiagnosticsConfig,
    /// Predicates for physical device selection
    pub device_requirements: DeviceRequirements,
}

impl ContextConfig {
    /// Create a configuration with defaults for everything but the name
    pub fn new(application_name: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            application_version: (1, 0, 0),
            engine_name: "vulkan_context".to_string(),
            engine_version: (1, 0, 0),
            api_version: (1, 3),
            diagnostics: None,
            diagnostics_config: DiagnosticsConfig::default(),
            device_requirements: DeviceRequirements::default(),
        }
    }

    /// Set the application version
    pub fn with_version(mut self, major: u32, minor: u32, patch: u32) -> Self {
        self.application_version = (major, minor, patch);
        self
    }

    /// Set the Vulkan API version hint
    pub fn with_api_version(mut self, major: u32, minor: u32) -> Self {
        self.api_version = (major, minor);
        self
    }

    /// Force diagnostics on or off regardless of build type
    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = Some(enabled);
        self
    }

    /// Auto-detect diagnostics from the build type
    ///
    /// Development builds enable the validation layer and the diagnostic
    /// channel; production builds leave both out.
    pub fn with_auto_diagnostics(mut self) -> Self {
        self.diagnostics = None;
        self
    }

    /// Set the diagnostic channel filters
    pub fn with_diagnostics_config(mut self, config: DiagnosticsConfig) -> Self {
        self.diagnostics_config = config;
        self
    }

    /// Set the device selection predicates
    pub fn with_device_requirements(mut self, requirements: DeviceRequirements) -> Self {
        self.device_requirements = requirements;
        self
    }

    /// Resolved diagnostics toggle
    pub fn diagnostics_enabled(&self) -> bool {
        self.diagnostics.unwrap_or(cfg!(debug_assertions))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.application_name.is_empty() {
            return Err("Application name cannot be empty".to_string());
        }

        if self.api_version.0 != 1 {
            return Err(format!(
                "Unsupported Vulkan API major version: {}",
                self.api_version.0
            ));
        }

        Ok(())
    }

    pub(crate) fn vk_application_version(&self) -> u32 {
        let (major, minor, patch) = self.application_version;
        vk::make_api_version(0, major, minor, patch)
    }

    pub(crate) fn vk_engine_version(&self) -> u32 {
        let (major, minor, patch) = self.engine_version;
        vk::make_api_version(0, major, minor, patch)
    }

    pub(crate) fn vk_api_version(&self) -> u32 {
        let (major, minor) = self.api_version;
        vk::make_api_version(0, major, minor, 0)
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self::new("Vulkan Application")
    }
}

/// Window parameters for the demo application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSettings {
    /// Window title
    pub title: String,
    /// Window width in screen coordinates
    pub width: u32,
    /// Window height in screen coordinates
    pub height: u32,
    /// Whether the window is resizable
    pub resizable: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Vulkan Render Window".to_string(),
            width: 800,
            height: 600,
            resizable: false,
        }
    }
}

/// Complete demo application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppSettings {
    /// Window parameters
    pub window: WindowSettings,
    /// Graphics context configuration
    pub context: ContextConfig,
}

impl FileConfig for AppSettings {}
impl FileConfig for ContextConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physical::DeviceClass;

    #[test]
    fn test_defaults_follow_build_type() {
        let config = ContextConfig::default();
        assert_eq!(config.diagnostics, None);
        assert_eq!(config.diagnostics_enabled(), cfg!(debug_assertions));
    }

    #[test]
    fn test_explicit_diagnostics_override() {
        assert!(ContextConfig::default().with_diagnostics(true).diagnostics_enabled());
        assert!(!ContextConfig::default().with_diagnostics(false).diagnostics_enabled());
    }

    #[test]
    fn test_api_version_encoding() {
        let config = ContextConfig::default().with_api_version(1, 3);
        assert_eq!(config.vk_api_version(), vk::make_api_version(0, 1, 3, 0));

        let config = ContextConfig::default().with_version(2, 1, 7);
        assert_eq!(
            config.vk_application_version(),
            vk::make_api_version(0, 2, 1, 7)
        );
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        assert!(ContextConfig::new("").validate().is_err());
        assert!(ContextConfig::new("demo").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_api_major() {
        let config = ContextConfig::new("demo").with_api_version(2, 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_settings_toml_round_trip() {
        let settings = AppSettings {
            window: WindowSettings::default(),
            context: ContextConfig::new("round-trip").with_diagnostics(false),
        };

        let serialized = toml::to_string_pretty(&settings).unwrap();
        let parsed: AppSettings = toml::from_str(&serialized).unwrap();

        assert_eq!(parsed.window.width, 800);
        assert_eq!(parsed.window.height, 600);
        assert_eq!(parsed.context.diagnostics, Some(false));
        assert_eq!(
            parsed.context.device_requirements.class,
            Some(DeviceClass::Discrete)
        );
        assert_eq!(parsed.context.api_version, (1, 3));
    }
}
