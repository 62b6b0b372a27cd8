//! Truevision TGA recognition and validating passthrough (`truevision/tga`).
//!
//! TGA is already a lossless interchange format, so there is nothing to
//! transcode; `decode` only validates the header is well-formed and hands
//! the bytes through unchanged (spec.md §8 item 4).

use crate::decoder::FileDecoder;
use crate::error::{Error, Result};
use crate::file::File;

const FOOTER_SIGNATURE: &[u8] = b"TRUEVISION-XFILE.\0";
const FOOTER_LEN: u64 = 26;

pub struct TgaFileDecoder;

impl FileDecoder for TgaFileDecoder {
    /// Prefers the TGA 2.0 footer signature (18 bytes, 8 bytes before
    /// EOF-18); falls back to the TGA 1.0 heuristic (a plausible header
    /// color-map/image-type byte combination) for footerless legacy files.
    fn recognize(&self, file: &File) -> Result<bool> {
        let mut stream = file.stream.clone();
        let size = stream.size();
        if size >= FOOTER_LEN {
            let has_footer = stream.peek(size - FOOTER_LEN, |s| {
                let footer = s.read(FOOTER_LEN as usize)?;
                Ok(footer[8..].starts_with(FOOTER_SIGNATURE))
            })?;
            if has_footer {
                return Ok(true);
            }
        }
        if size < 18 {
            return Ok(false);
        }
        stream.peek(0, |s| {
            let color_map_type = s.read_u8()?;
            let image_type = s.read_u8()?;
            Ok(color_map_type <= 1 && matches!(image_type, 1 | 2 | 3 | 9 | 10 | 11))
        })
    }

    fn decode(&self, file: &File) -> Result<File> {
        let mut stream = file.stream.clone();
        stream.seek(0)?;
        if stream.size() < 18 {
            return Err(Error::CorruptData {
                path: file.path.clone().into(),
                decoder: "truevision/tga".to_string(),
                reason: "file shorter than the fixed 18-byte TGA header".to_string(),
            });
        }
        Ok(File::new(file.path.clone(), file.stream.clone()))
    }
}
