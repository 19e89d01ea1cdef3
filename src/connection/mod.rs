//! Connected player tracking

pub mod registry;

pub use registry::{ConnectionRegistry, Outbox, OUTBOX_CAPACITY};
