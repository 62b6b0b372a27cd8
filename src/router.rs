//! Recognition router (C6, §4.5).

use crate::decoder::{Decoder, DecoderId};
use crate::error::Result;
use crate::file::File;
use crate::registry::Registry;

pub struct Router<'a> {
    registry: &'a Registry,
}

impl<'a> Router<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Tries only `id`, with no fallback to the rest of the registry — the
    /// bypass behavior `--format` gives the root input (§6: "the router is
    /// seeded with a single forced hint and full fallback is disabled for
    /// the root file only"). Returns `None` if `id` isn't registered or
    /// doesn't recognize `file`, exactly as if nothing in the registry
    /// matched.
    pub fn route_forced(&self, file: &File, id: &DecoderId) -> Result<Option<(DecoderId, &'a Decoder)>> {
        if let Some(decoder) = self.registry.lookup(id) {
            let mut probe = file.clone();
            probe.stream.seek(0)?;
            if decoder.recognize(&probe)? {
                return Ok(Some((id.clone(), decoder)));
            }
        }
        Ok(None)
    }

    /// Given an input file, selects the first registered decoder whose
    /// `recognize` returns true.
    ///
    /// If `hints` is non-empty, the hinted ids are tried first, in order;
    /// if every hint rejects the file, recognition falls back to the full
    /// registry in registration order (§4.7 — hints never exclude
    /// non-hint decoders). Before each `recognize` call the stream is
    /// restored to offset 0, upholding §3 invariant 3 regardless of what a
    /// misbehaving decoder's previous call might have done.
    pub fn route(&self, file: &File, hints: &[DecoderId]) -> Result<Option<(DecoderId, &'a Decoder)>> {
        for id in hints {
            if let Some(decoder) = self.registry.lookup(id) {
                let mut probe = file.clone();
                probe.stream.seek(0)?;
                if decoder.recognize(&probe)? {
                    return Ok(Some((id.clone(), decoder)));
                }
            }
        }
        for (id, decoder) in self.registry.all_decoders() {
            if hints.contains(id) {
                continue; // already tried above
            }
            let mut probe = file.clone();
            probe.stream.seek(0)?;
            if decoder.recognize(&probe)? {
                return Ok(Some((id.clone(), decoder)));
            }
        }
        Ok(None)
    }
}
