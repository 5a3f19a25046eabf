mod tracing;

pub use crate::tracing::{init, init_with_level};
