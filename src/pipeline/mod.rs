//! Pipeline stages for document-to-blocks extraction.
//!
//! Each stage is a standalone module the driver composes:
//!
//! * [`input`] — classify the input file and derive the document stem
//! * [`native`] — read the native text layer and detect tables
//! * [`render`] — rasterise pages with on-disk memoization
//! * [`assemble`] — normalise raw items into a canonical page record

pub mod assemble;
pub mod input;
pub mod native;
pub mod render;
