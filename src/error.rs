use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayerError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("IO failure: {0}")]
    IoFailure(String),

    #[error("Malformed instructions: {0}")]
    MalformedInstructions(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Encode error: {0}")]
    EncodeError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Generates factory methods for [`LayerError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl LayerError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create an invalid geometry error.
    geometry => InvalidGeometry,
    /// Create an unsupported encoding error.
    unsupported_encoding => UnsupportedEncoding,
    /// Create an IO failure (source read, layer write, document write).
    io_failure => IoFailure,
    /// Create a malformed instructions error.
    instructions => MalformedInstructions,
    /// Create a configuration error.
    config => ConfigError,
    /// Create a codec error.
    encode => EncodeError,
}

impl LayerError {
    /// ページ単位で回復可能なエラーかどうか。
    ///
    /// Geometry and instruction errors are raised before any raster work on a
    /// page, so the page can be skipped while the rest of the document
    /// continues. Everything else aborts the document.
    pub fn is_page_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidGeometry(_) | Self::MalformedInstructions(_)
        )
    }

    /// Prefix the message with the page identifier it belongs to.
    pub fn in_page(self, page_id: &str) -> Self {
        let prefix = |msg: String| format!("page '{page_id}': {msg}");
        match self {
            Self::InvalidGeometry(m) => Self::InvalidGeometry(prefix(m)),
            Self::UnsupportedEncoding(m) => Self::UnsupportedEncoding(prefix(m)),
            Self::IoFailure(m) => Self::IoFailure(prefix(m)),
            Self::MalformedInstructions(m) => Self::MalformedInstructions(prefix(m)),
            Self::ConfigError(m) => Self::ConfigError(prefix(m)),
            Self::EncodeError(m) => Self::EncodeError(prefix(m)),
            Self::IoError(e) => Self::IoFailure(prefix(e.to_string())),
        }
    }
}

impl From<lopdf::Error> for LayerError {
    fn from(e: lopdf::Error) -> Self {
        Self::IoFailure(e.to_string())
    }
}

impl From<serde_json::Error> for LayerError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedInstructions(e.to_string())
    }
}

impl From<serde_yml::Error> for LayerError {
    fn from(e: serde_yml::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

impl From<image::ImageError> for LayerError {
    fn from(e: image::ImageError) -> Self {
        Self::IoFailure(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LayerError>;
