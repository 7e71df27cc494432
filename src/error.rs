use thiserror::Error;

#[derive(Error, Debug)]
pub enum OwlError {
    #[error("Invalid input: {0}")]
    Input(String),
    #[error("Marshalling failed: {0}")]
    Marshal(String),
    #[error("Unmarshalling failed: {0}")]
    Unmarshal(String),
    #[error("Property access failed: {message}")]
    Access {
        message: String,
        property: Option<String>,
    },
    #[error("Ontology storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, OwlError>;

// Helper conversions
impl From<serde_json::Error> for OwlError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage(e.to_string())
    }
}
impl From<std::io::Error> for OwlError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}
