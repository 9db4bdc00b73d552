//! glyph-core: token metadata types and the bitmap text renderer
//!
//! This crate holds everything that does not touch the network:
//! - Bitmap decoding: parses an uncompressed bitmap container and renders it
//!   as rows of palette tokens
//! - Palette: the 5-slot brightness-to-text mapping supplied per request
//! - Metadata: ERC-721 metadata documents and data URI classification
//! - Config: which upstream RPC/contract pair serves which chain
//! - Format: the plain-text response body
//!
//! # Rendering
//!
//! | Bit depth | Pixel value | Palette slot |
//! |-----------|-------------|--------------|
//! | 1 | bit | `c0` for 0, `c1` for 1 |
//! | 4 | nibble * 17 | luminance bracket |
//! | 8 | raw byte | luminance bracket |
//! | 24 / 32 | `(299R + 587G + 114B) / 1000` | luminance bracket |
//!
//! Luminance brackets are `>=204`, `>=153`, `>=102`, `>=51` and the rest,
//! lightest first.

mod config;
mod error;
mod format;
mod palette;

pub mod bitmap;
pub mod metadata;

pub use bitmap::{render, BitDepth, BitmapError, DecodedImage, RowOrder};
pub use config::{parse_chain_id, parse_token_id, GatewayConfig, SourceConfig};
pub use error::Error;
pub use format::format_metadata;
pub use metadata::{Attribute, ImageField, MetadataUri, TokenMetadata};
pub use palette::{Palette, DEFAULT_GLYPHS};

pub type Result<T> = std::result::Result<T, Error>;

/// Numeric identifier of a ledger network
pub type ChainId = u64;

/// Reserved chain id: "not yet resolved", used by legacy single-source configs
pub const LEGACY_CHAIN_ID: ChainId = 0;

pub mod constants {
    /// Data URI prefix marking an embedded bitmap image
    pub const BMP_DATA_URI_PREFIX: &str = "data:image/bmp;base64,";

    /// Data URI prefix marking an inline JSON metadata document
    pub const JSON_DATA_URI_PREFIX: &str = "data:application/json;base64,";

    /// Default gateway used to rewrite `ipfs://` references
    pub const DEFAULT_IPFS_GATEWAY: &str = "https://ipfs.io/";

    /// Indent placed before every rendered bitmap row
    pub const ROW_INDENT: &str = "    ";
}
