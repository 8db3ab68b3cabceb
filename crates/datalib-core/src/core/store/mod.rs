//! Storage layer: the content store, its name index, and the library that joins them.

pub(crate) mod library;
