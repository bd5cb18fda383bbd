//! Response types returned by the HTTP surface.

use serde::Serialize;

pub const MSG_UNDECODABLE: &str = "Could not decode image.";
pub const MSG_NOT_FOUND: &str = "No QR code found in the image.";

/// Outcome of scanning one uploaded image.
///
/// `success` is true iff `all_ids` is non-empty, and `id` mirrors the first
/// element of `all_ids`. Fields are private so the only way to build one is
/// through the constructors below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    success: bool,
    id: Option<String>,
    all_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl ScanResult {
    /// Build a result from decoded identifiers. An empty list is "not found".
    pub fn from_ids(ids: Vec<String>) -> Self {
        match ids.first().cloned() {
            Some(first) => Self {
                success: true,
                id: Some(first),
                all_ids: ids,
                message: None,
            },
            None => Self::not_found(),
        }
    }

    /// The upload could not be decoded as an image.
    pub fn undecodable() -> Self {
        Self::failure(MSG_UNDECODABLE)
    }

    /// The image decoded but neither decoder found a code.
    pub fn not_found() -> Self {
        Self::failure(MSG_NOT_FOUND)
    }

    fn failure(message: &str) -> Self {
        Self {
            success: false,
            id: None,
            all_ids: Vec::new(),
            message: Some(message.to_string()),
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn all_ids(&self) -> &[String] {
        &self.all_ids
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Static payload for the health check.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub message: &'static str,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            status: "OK",
            message: "Medi-Verify Scanner API is running.",
        }
    }
}
