//! Core of the cpp2v translator.
//!
//! Turns a resolved C++ translation unit into a Coq module. The pipeline
//! is roughly:
//!
//!   translation unit (JSON from the front-end)
//!     -> specs     (annotations collected from comments)
//!     -> filter    (one verdict per top-level declaration)
//!     -> module    (ordered name -> term mapping, via a Renderer)
//!     -> document  (preamble, entries, `nil.` terminator)
//!
//! The CLI and any other driver should depend on this crate rather than
//! reassembling the pipeline.

// ---------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------

pub mod error;

// ---------------------------------------------------------------------
// Input model
// ---------------------------------------------------------------------

pub mod ast;

// ---------------------------------------------------------------------
// Declaration selection: annotations and filters
// ---------------------------------------------------------------------

pub mod specs;
pub mod filter;

// ---------------------------------------------------------------------
// Output: layout, rendering, module building and document assembly
// ---------------------------------------------------------------------

pub mod layout;
pub mod render;
pub mod module;
pub mod document;
pub mod translate;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use ast::TranslationUnit;
pub use error::CoreError;
pub use render::{CoqRenderer, Renderer};
pub use translate::{TranslateOptions, translate_decl, translate_module, translate_stmt};
