//! Plain-text response body for a token

use std::fmt::Write;

use serde_json::Value;

use crate::bitmap::DecodedImage;
use crate::metadata::{ImageField, TokenMetadata};
use crate::palette::Palette;
use crate::ChainId;

/// Format `metadata` as the text shown to the caller
///
/// `image` and `external_url` holding an embedded bitmap are rendered with
/// `palette`; if the bitmap does not decode, the raw field is shown instead.
pub fn format_metadata(
    metadata: &TokenMetadata,
    chain_id: ChainId,
    token_id: &str,
    palette: &Palette,
) -> String {
    let mut out = String::new();

    out.push_str("ERC721 Token Metadata\n");
    out.push_str("====================\n\n");
    let _ = writeln!(out, "Chain ID: {}", chain_id);
    let _ = writeln!(out, "Token ID: {}\n", token_id);

    if !metadata.name.is_empty() {
        let _ = writeln!(out, "Name: {}", metadata.name);
    }
    if !metadata.description.is_empty() {
        let _ = writeln!(out, "Description: {}", metadata.description);
    }
    if !metadata.image.is_empty() {
        write_image_field(&mut out, "Image", &metadata.image, palette);
    }
    if !metadata.external_url.is_empty() {
        write_image_field(&mut out, "External URL", &metadata.external_url, palette);
    }

    if !metadata.properties.is_empty() {
        out.push_str("\nProperties:\n");
        for (key, value) in &metadata.properties {
            match value {
                Value::String(s) => {
                    let _ = writeln!(out, "  - {}: {}", key, s);
                }
                other => {
                    let _ = writeln!(out, "  - {}: {}", key, other);
                }
            }
        }
    }

    out
}

fn write_image_field(out: &mut String, label: &str, value: &str, palette: &Palette) {
    match render_bitmap_field(value, palette) {
        Some(bitfield) => {
            let _ = writeln!(out, "{} (BMP Bitfield):\n{}", label, bitfield);
        }
        None => {
            let _ = writeln!(out, "{}: {}", label, value);
        }
    }
}

/// `None` when the field is not an embedded bitmap or fails to decode
fn render_bitmap_field(value: &str, palette: &Palette) -> Option<String> {
    let bytes = match ImageField::parse(value) {
        Ok(ImageField::Bitmap(bytes)) => bytes,
        Ok(ImageField::Other(_)) => return None,
        Err(e) => {
            tracing::debug!(error = %e, "Bitmap data URI is not valid base64, showing raw value");
            return None;
        }
    };

    let image = match DecodedImage::decode(&bytes) {
        Ok(image) => image,
        Err(e) => {
            tracing::debug!(error = %e, "Bitmap failed to decode, showing raw value");
            return None;
        }
    };

    let mut text = String::new();
    let _ = writeln!(
        text,
        "  Dimensions: {}x{}, BPP: {}",
        image.width,
        image.height,
        image.depth.bits()
    );
    text.push_str("  Bitfield:\n");
    text.push_str(&image.render(palette));
    Some(text)
}
