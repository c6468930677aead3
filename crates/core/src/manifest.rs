//! Installable-app descriptor.
//!
//! The descriptor is the JSON document whose `name` field is the identity
//! the detector tracks. Synthesized descriptors are immutable: a new
//! identity produces a new document, never a mutation of the old one.

use crate::Error;
use serde::{Deserialize, Serialize};
use url::Url;

/// Icon ladder derived from the base origin; the 152px entry is the one
/// marked maskable.
const ICON_SIZES: &[(u32, bool)] = &[
    (48, false),
    (72, false),
    (96, false),
    (128, false),
    (142, false),
    (152, true),
    (192, false),
    (512, false),
];

const THEME_COLOR: &str = "#000000";
const DISPLAY_STANDALONE: &str = "standalone";

/// One icon entry in the descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Icon {
    pub src: String,
    pub sizes: String,
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
}

/// The installable-app descriptor document.
///
/// Only `name` is required on parse; the cosmetic fields default so the
/// detector's comparison never fails on a sparse but well-formed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub theme_color: String,
    #[serde(default)]
    pub display: String,
    #[serde(default)]
    pub start_url: String,
    #[serde(default)]
    pub icons: Vec<Icon>,
}

impl Descriptor {
    /// Synthesize the descriptor for an identity, deriving every icon URL
    /// from a single base origin. `name` and `short_name` are kept equal.
    pub fn for_identity(identity: &str, base: &Url) -> Self {
        let origin = base.origin().ascii_serialization();

        let icons = ICON_SIZES
            .iter()
            .map(|&(px, maskable)| Icon {
                src: format!("{origin}/{px}.png"),
                sizes: format!("{px}x{px}"),
                content_type: "image/png".to_string(),
                purpose: maskable.then(|| "maskable".to_string()),
            })
            .collect();

        Self {
            name: identity.to_string(),
            short_name: identity.to_string(),
            theme_color: THEME_COLOR.to_string(),
            display: DISPLAY_STANDALONE.to_string(),
            start_url: origin,
            icons,
        }
    }

    /// Parse a descriptor payload.
    ///
    /// Unknown fields are ignored and cosmetic fields default; a payload
    /// that is not JSON or has no string `name` fails.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(bytes).map_err(|e| Error::Descriptor(e.to_string()))
    }

    /// Serialize the descriptor for storage or publishing.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(self).map_err(|e| Error::Descriptor(e.to_string()))
    }

    /// The identity the detector tracks.
    pub fn identity(&self) -> &str {
        &self.name
    }
}
