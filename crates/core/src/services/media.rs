//! Image format handling for pack images.

use std::io::Cursor;

use image::codecs::gif::GifDecoder;
use image::AnimationDecoder;

use crate::IngestError;

/// Image formats stored in archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG format
    Png,
    /// GIF format
    Gif,
}

impl ImageFormat {
    /// Format of the full-size images of a pack.
    #[must_use]
    pub const fn for_pack(animated: bool) -> Self {
        if animated { Self::Gif } else { Self::Png }
    }

    /// Get file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Gif => "gif",
        }
    }
}

/// Whether GIF bytes hold more than one decodable frame.
///
/// Decoding stops after the second frame.
pub fn is_animated_gif(bytes: &[u8]) -> Result<bool, IngestError> {
    let decoder = GifDecoder::new(Cursor::new(bytes))
        .map_err(|e| IngestError::parse(format!("probe image is not a GIF: {e}")))?;

    let frames = decoder
        .into_frames()
        .take(2)
        .take_while(Result::is_ok)
        .count();

    Ok(frames > 1)
}
