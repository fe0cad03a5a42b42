/**
 * Error taxonomy (spec §7).
 *
 * Almost nothing in this crate returns `Err`: truncation, decompression
 * failure, schema mismatch, unknown subrecords, and decompile failure all
 * degrade to a shallow value plus a telemetry event (see `logger`). The two
 * tiers that remain:
 *
 * - `ReconError`: conditions a caller may want to match on.
 * - `anyhow::Result`: orchestration-level plumbing (`reconstruct_all` and
 *   its immediate callees), exactly as the teacher's `core/fic.rs` uses it.
 */
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    #[error("identifier index rejected construction: {0}")]
    Identifiers(#[from] crate::identifiers::IdentifierIndexError),

    #[error("requested range exceeds image length (offset {offset}, length {length}, image length {image_length})")]
    ImageTruncated {
        offset: u64,
        length: u32,
        image_length: u64,
    },

    #[error("scratch buffer pool could not satisfy a request of {requested} bytes")]
    BufferPoolExhausted { requested: usize },
}
