//! Decoder registry (C5).
//!
//! A process-wide mapping `DecoderId -> Decoder`, populated by an explicit
//! `register_all()` call before the driver starts (§9 "Global registry with
//! static-constructor side effects" — replacing the source's file-scope
//! side-effecting registration with an auditable, explicit call keeps
//! registration order, and therefore recognition order, a reviewable
//! property instead of a linker-order accident).

use crate::decoder::{Decoder, DecoderId};
use crate::error::{Error, Result};

#[derive(Default)]
pub struct Registry {
    order: Vec<DecoderId>,
    decoders: std::collections::HashMap<DecoderId, Decoder>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `decoder` under `id`. Registering the same id twice is a
    /// programmer error (§4.4).
    pub fn register(&mut self, id: DecoderId, decoder: Decoder) -> Result<()> {
        if self.decoders.contains_key(&id) {
            return Err(Error::InvalidRegistration(id));
        }
        self.order.push(id.clone());
        self.decoders.insert(id, decoder);
        Ok(())
    }

    pub fn lookup(&self, id: &DecoderId) -> Option<&Decoder> {
        self.decoders.get(id)
    }

    /// All ids in registration order — the order recognition falls back to
    /// and, per spec.md §4.5, a design-visible property.
    pub fn all_ids(&self) -> &[DecoderId] {
        &self.order
    }

    pub fn all_decoders(&self) -> impl Iterator<Item = (&DecoderId, &Decoder)> {
        self.order.iter().map(move |id| (id, &self.decoders[id]))
    }
}
