//! ERC-721 metadata documents and the URIs that point at them

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::constants::{BMP_DATA_URI_PREFIX, JSON_DATA_URI_PREFIX};
use crate::{Error, Result};

/// Standard ERC-721 metadata document
///
/// Missing or `null` string fields read as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenMetadata {
    #[serde(default, deserialize_with = "nullable_string")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
    #[serde(default, deserialize_with = "nullable_string", skip_serializing_if = "String::is_empty")]
    pub external_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(default)]
    pub trait_type: String,
    #[serde(default)]
    pub value: Value,
}

fn nullable_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl TokenMetadata {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Where a token URI says the metadata document lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataUri {
    /// `data:application/json;base64,` payload, already decoded
    Inline(Vec<u8>),
    /// HTTP(S) location, with IPFS references rewritten to a gateway
    Remote(String),
}

impl MetadataUri {
    /// Classify a token URI
    ///
    /// `ipfs://CID/path` and `ipfs/CID/path` are rewritten onto `ipfs_gateway`.
    pub fn parse(uri: &str, ipfs_gateway: &str) -> Result<Self> {
        if let Some(payload) = uri.strip_prefix(JSON_DATA_URI_PREFIX) {
            return Ok(MetadataUri::Inline(STANDARD.decode(payload)?));
        }

        let gateway = ipfs_gateway.trim_end_matches('/');
        if let Some(rest) = uri.strip_prefix("ipfs://") {
            return Ok(MetadataUri::Remote(format!("{}/ipfs/{}", gateway, rest)));
        }
        if uri.starts_with("ipfs/") {
            return Ok(MetadataUri::Remote(format!("{}/{}", gateway, uri)));
        }

        Ok(MetadataUri::Remote(uri.to_string()))
    }
}

/// Content of an `image` / `external_url` field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageField<'a> {
    /// Embedded bitmap, base64 already decoded
    Bitmap(Vec<u8>),
    /// Anything else, shown as-is
    Other(&'a str),
}

impl<'a> ImageField<'a> {
    /// A bitmap data URI with an invalid base64 payload is an error
    pub fn parse(value: &'a str) -> Result<Self> {
        match value.strip_prefix(BMP_DATA_URI_PREFIX) {
            Some(payload) => Ok(ImageField::Bitmap(STANDARD.decode(payload)?)),
            None => Ok(ImageField::Other(value)),
        }
    }
}
