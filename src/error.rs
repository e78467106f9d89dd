use crate::io::dataset::DatasetError;

/// Main error type for the library.
#[derive(Debug)]
pub enum Error {
    /// Used when the user pass a logical invalid parameter to a function.
    InvalidParameter(String),
    Io(std::io::Error),
    Dataset(DatasetError),
    Image(image::ImageError),
    Json(serde_json::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {err}"),
            Error::InvalidParameter(err) => write!(f, "Parameter error: {err}"),
            Error::Dataset(err) => write!(f, "Dataset error: {err}"),
            Error::Image(err) => write!(f, "Image error: {err}"),
            Error::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl Error {
    /// Create a error with the kind `InvalidParameter`.
    /// # Arguments
    /// * `msg` - The error message.
    pub fn invalid_parameter<T: ToString>(msg: T) -> Self {
        Error::InvalidParameter(msg.to_string())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Dataset(err) => Some(err),
            Error::Image(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::InvalidParameter(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<DatasetError> for Error {
    fn from(err: DatasetError) -> Self {
        Error::Dataset(err)
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
