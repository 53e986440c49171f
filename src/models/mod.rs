//! Resources exchanged with the publisher backend.
//!
//! # Core Concepts
//!
//! ## Backend Resources
//!
//! - [`AppEdit`]: A transactional change set for one package. Uploads and
//!   track changes staged under an edit only go live when it is committed.
//! - [`Track`]: A named distribution channel (internal, alpha, beta,
//!   production, ...) holding an ordered list of releases.
//! - [`Release`]: The version codes exposed on a track, with rollout status,
//!   optional user fraction and localized release notes.
//!
//! ## Local Entities
//!
//! - [`Artifact`]: An uploaded binary and the version code the backend gave it.
//! - [`ExpansionFileSpec`]: A parsed `"<type>:<path>"` expansion file entry,
//!   attached to one artifact by version code.

mod artifact;
mod edit;
mod track;

pub use artifact::*;
pub use edit::*;
pub use track::*;
