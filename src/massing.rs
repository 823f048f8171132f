//! Building massing: footprint + height records and the normalizer that
//! decodes them from registry payloads.

pub mod building;
pub mod normalize;
