//! Filesystem persistence for the Folio library.
//!
//! [`FileSystemLibrary`] implements [`folio_interface::LibraryStore`] with
//! one JSON document per entity. Every record passes through the
//! normalisation rules in [`normalize`] on the way in and on the way out,
//! so hand-edited or older files still load cleanly.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod filesystem;
pub mod normalize;

pub use filesystem::FileSystemLibrary;
