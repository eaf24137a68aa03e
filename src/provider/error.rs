// ABOUTME: Errors returned across the control-plane boundary.
// ABOUTME: Separates the "does not exist yet" signal from every other failure.

/// Failure of a single control-plane call.
///
/// `NotFound` is the provider telling us a resource does not exist (yet); the
/// reconcilers treat it as the trigger for their create path. Anything else is
/// a `Request` failure and is fatal to the region that issued it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Request(String),
}

impl ProviderError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ProviderError::NotFound(what.into())
    }

    pub fn request(message: impl Into<String>) -> Self {
        ProviderError::Request(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound(_))
    }
}

/// Folds the "does not exist" signal into an empty value.
pub trait NotFoundExt<T> {
    /// `Err(NotFound)` becomes `Ok(T::default())`; other results pass through.
    fn or_absent(self) -> Result<T, ProviderError>;
}

impl<T: Default> NotFoundExt<T> for Result<T, ProviderError> {
    fn or_absent(self) -> Result<T, ProviderError> {
        match self {
            Err(e) if e.is_not_found() => Ok(T::default()),
            other => other,
        }
    }
}
