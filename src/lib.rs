//! Backtracking page reader for JSP-style template sources.
//!
//! A character-level input layer for template parsers: whole files are
//! loaded into immutable buffers, positions are cheap [`Mark`]
//! snapshots that support unlimited backtracking, and included files
//! stack on top of the current one and pop transparently when they run
//! out. On top of that sit the scanning utilities such a parser needs:
//! literal matching, escape-aware search, end-tag detection, and
//! attribute-token extraction.
//!
//! # Quick start
//!
//! ## Scan a directive out of a page
//!
//! ```
//! use jsp_scan::PageReader;
//!
//! let page = "<html><%@ include file=\"nav.jsp\" %></html>";
//! let mut reader = PageReader::from_source("page.jsp", page).unwrap();
//!
//! let start = reader.skip_until("<%@").unwrap();
//! assert_eq!((start.line(), start.column()), (1, 6));
//!
//! reader.skip_spaces();
//! assert_eq!(reader.parse_token(false).unwrap(), "include");
//! reader.skip_spaces();
//! assert_eq!(reader.parse_token(false).unwrap(), "file");
//! ```
//!
//! ## Read across an include boundary
//!
//! ```
//! use jsp_scan::{MemoryProvider, PageReader};
//!
//! let provider = MemoryProvider::new()
//!     .with_file("main.jsp", "A")
//!     .with_file("nav.jsp", "B");
//!
//! let mut reader = PageReader::new(provider, "main.jsp").unwrap();
//! assert_eq!(reader.next_char(), Some('A'));
//! reader.push_file("nav.jsp").unwrap();
//! assert_eq!(reader.next_char(), Some('B'));
//! assert_eq!(reader.next_char(), None); // both files exhausted
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod mark;
pub mod reader;
pub mod source;

pub use mark::{Location, Mark};
pub use reader::{PageReader, ScanError, ScanErrorKind};
pub use source::{FsProvider, MemoryProvider, SourceError, SourceProvider};
