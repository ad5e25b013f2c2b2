//! On-disk encoding of the client's own files (session and config).
//!
//! Documents are pretty-printed with 2-space indentation and end with a
//! newline, so a rewritten file only differs where its content changed.

mod document;

pub use document::*;
