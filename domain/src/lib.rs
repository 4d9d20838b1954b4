//! Domain specific structures, implementations, and logic

#![deny(missing_docs)]
// Disable the lint for now as it has a high false-positive rate
#![allow(unknown_lints, clippy::nonstandard_macro_braces)]

pub mod catalog;
pub mod lifecycle;
pub mod notification;
