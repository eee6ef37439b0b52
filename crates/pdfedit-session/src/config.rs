//! Session configuration
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration.

use anyhow::Context;
use pdfedit_ops::TextStyle;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Smallest width/height, in pixels, a drawn or resized rectangle may have
    #[serde(default = "default_min_size_px")]
    pub min_size_px: f64,
    /// Size of a text box placed by a click rather than a drag
    #[serde(default)]
    pub default_text_box: BoxSize,
    #[serde(default = "default_checkbox_size_px")]
    pub checkbox_size_px: f64,
    #[serde(default = "default_redaction_color")]
    pub redaction_color: String,
    #[serde(default = "default_highlight_color")]
    pub highlight_color: String,
    #[serde(default = "default_highlight_opacity")]
    pub highlight_opacity: f64,
    /// Style of new text boxes
    #[serde(default)]
    pub default_style: TextStyle,
    /// Delay between an editor losing focus and its commit
    #[serde(default = "default_blur_commit_delay_ms")]
    pub blur_commit_delay_ms: u64,
    #[serde(default = "default_notice_ttl_ms")]
    pub notice_ttl_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxSize {
    pub width: f64,
    pub height: f64,
}

impl Default for BoxSize {
    fn default() -> Self {
        Self {
            width: 150.0,
            height: 24.0,
        }
    }
}

fn default_min_size_px() -> f64 {
    10.0
}

fn default_checkbox_size_px() -> f64 {
    20.0
}

fn default_redaction_color() -> String {
    "#000000".to_string()
}

fn default_highlight_color() -> String {
    "#FFFF00".to_string()
}

fn default_highlight_opacity() -> f64 {
    0.35
}

fn default_blur_commit_delay_ms() -> u64 {
    150
}

fn default_notice_ttl_ms() -> u64 {
    4000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_size_px: default_min_size_px(),
            default_text_box: BoxSize::default(),
            checkbox_size_px: default_checkbox_size_px(),
            redaction_color: default_redaction_color(),
            highlight_color: default_highlight_color(),
            highlight_opacity: default_highlight_opacity(),
            default_style: TextStyle::default(),
            blur_commit_delay_ms: default_blur_commit_delay_ms(),
            notice_ttl_ms: default_notice_ttl_ms(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(s).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !(self.min_size_px.is_finite() && self.min_size_px > 0.0) {
            anyhow::bail!("min_size_px must be positive, got {}", self.min_size_px);
        }
        let box_sizes = [
            ("default_text_box.width", self.default_text_box.width),
            ("default_text_box.height", self.default_text_box.height),
            ("checkbox_size_px", self.checkbox_size_px),
        ];
        for (name, size) in box_sizes {
            if !(size.is_finite() && size >= self.min_size_px) {
                anyhow::bail!(
                    "{} must be at least min_size_px ({}), got {}",
                    name,
                    self.min_size_px,
                    size
                );
            }
        }
        if !(0.0..=1.0).contains(&self.highlight_opacity) {
            anyhow::bail!(
                "highlight_opacity must be within 0..=1, got {}",
                self.highlight_opacity
            );
        }
        Ok(())
    }

    pub fn blur_commit_delay(&self) -> Duration {
        Duration::from_millis(self.blur_commit_delay_ms)
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.notice_ttl_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(SessionConfig::from_str("").unwrap(), SessionConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = SessionConfig::from_str(
            r##"
            min_size_px = 16.0
            redaction_color = "#FFFFFF"

            [default_text_box]
            width = 200.0
            height = 30.0

            [default_style]
            font_size = 14.0
            color = "#333333"
            is_bold = true
            "##,
        )
        .unwrap();

        assert_eq!(config.min_size_px, 16.0);
        assert_eq!(config.redaction_color, "#FFFFFF");
        assert_eq!(config.default_text_box, BoxSize { width: 200.0, height: 30.0 });
        assert!(config.default_style.is_bold);
        assert_eq!(config.checkbox_size_px, 20.0);
        assert_eq!(config.blur_commit_delay(), Duration::from_millis(150));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(SessionConfig::from_str("min_size_px = 0.0").is_err());
        assert!(SessionConfig::from_str("highlight_opacity = 1.5").is_err());
        assert!(SessionConfig::from_str("min_size_px = \"big\"").is_err());
    }

    #[test]
    fn test_rejects_default_boxes_below_min_size() {
        let err = SessionConfig::from_str("min_size_px = 30.0").unwrap_err();
        assert!(format!("{:#}", err).contains("default_text_box.height"));

        let err = SessionConfig::from_str(
            r#"
            min_size_px = 12.0
            checkbox_size_px = 8.0
            "#,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("checkbox_size_px"));

        let config = SessionConfig::from_str(
            r#"
            min_size_px = 24.0
            checkbox_size_px = 24.0
            "#,
        )
        .unwrap();
        assert_eq!(config.default_text_box.height, 24.0);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = SessionConfig::from_file("/nonexistent/pdfedit.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/pdfedit.toml"));
    }
}
