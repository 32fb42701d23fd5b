//! Token authority metadata (data) and error classification (behavior).
//!
//! `descriptor` exposes [`AuthorityDescriptor`], the validated, HTTPS-only description of
//! the directory tenant that issues tokens. `strategy` defines [`AuthorityStrategy`], an
//! HTTP-client-agnostic hook that decorates client-credentials requests and maps token
//! endpoint failures into the crate error taxonomy.

pub mod descriptor;
pub mod strategy;

pub use descriptor::*;
pub use strategy::*;
