use std::fmt;

use crate::utils::unpack::packerjs::UnpackError;

/// Reasons a single mirror failed to resolve. None of them is fatal for a batch.
#[derive(Debug)]
pub enum ExtractError {
    /// Transport failure or error status reaching a mirror page or a secondary resource.
    Fetch(String),
    /// No packed script and nothing else to work with. Common for plain mirrors.
    PayloadNotFound,
    Unpack(UnpackError),
    /// Extraction patterns found nothing after all unpack passes.
    NoMatch,
}

impl ExtractError {
    pub fn fetch(err: impl fmt::Display) -> Self {
        ExtractError::Fetch(err.to_string())
    }

    /// Expected failures that are not worth a warning.
    pub fn is_expected(&self) -> bool {
        matches!(self, ExtractError::PayloadNotFound | ExtractError::NoMatch)
    }
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExtractError::Fetch(message) => write!(f, "fetch error: {message}"),
            ExtractError::PayloadNotFound => write!(f, "packed payload not found"),
            ExtractError::Unpack(err) => write!(f, "{err}"),
            ExtractError::NoMatch => write!(f, "no media url found"),
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtractError::Unpack(err) => Some(err),
            _ => None,
        }
    }
}

impl From<UnpackError> for ExtractError {
    fn from(err: UnpackError) -> Self {
        ExtractError::Unpack(err)
    }
}
