/// Errors raised while turning user configuration into detector inputs.
///
/// These are reported before any frame is processed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unsupported color band `{0}` (expected one of: red, blue)")]
    UnsupportedColorBand(String),

    #[error("unsupported target shape `{0}` (expected one of: triangle, hexagon)")]
    UnsupportedShape(String),

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
