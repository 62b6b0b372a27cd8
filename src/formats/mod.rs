//! Concrete format decoders.
//!
//! Only `leaf/kcap` and `truevision/tga` are implemented end-to-end here;
//! the other formats named in the original corpus (QNT, CBG, PAK2, ACD) are
//! genuinely out of scope — see DESIGN.md.

mod kcap;
mod lzss;
mod tga;

use crate::decoder::{Decoder, DecoderId};
use crate::error::Result;
use crate::registry::Registry;

/// Registers every built-in decoder. Registration order is recognition
/// fallback order (§4.5), so `leaf/kcap` — a strongly self-identifying
/// magic — goes before the comparatively weak `truevision/tga` heuristic.
pub fn register_all(registry: &mut Registry) -> Result<()> {
    registry.register(DecoderId::from("leaf/kcap"), Decoder::Archive(Box::new(kcap::KcapArchiveDecoder)))?;
    registry.register(DecoderId::from("truevision/tga"), Decoder::File(Box::new(tga::TgaFileDecoder)))?;
    Ok(())
}
