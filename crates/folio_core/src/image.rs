//! Opaque references to rendered or uploaded artwork.

use serde::{Deserialize, Serialize};

/// Reference to an image held by the provider or the persistence layer.
///
/// The engine never inspects the contents; it only threads references from
/// one stage to the next (reference art into renders, renders into pages).
///
/// # Examples
///
/// ```
/// use folio_core::ImageRef;
///
/// let art = ImageRef::from("data:image/png;base64,AAAA");
/// assert_eq!(art.as_str(), "data:image/png;base64,AAAA");
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    /// Wrap a reference string.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Borrow the underlying reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ImageRef {
    fn from(reference: &str) -> Self {
        Self(reference.to_string())
    }
}
