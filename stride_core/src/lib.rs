// stride_core/src/lib.rs

// This file defines the public modules of the library.
pub mod error;
pub mod estimation;
pub mod messages;
pub mod prelude;
pub mod records;
pub mod replay;
pub mod types;
