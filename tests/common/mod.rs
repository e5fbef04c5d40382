#![allow(dead_code)]

use jsp_scan::{MemoryProvider, PageReader};

/// Helper: reader over a single in-memory page.
pub fn reader(source: &str) -> PageReader {
    PageReader::from_source("page.jsp", source).expect("open failed")
}

/// Helper: reader rooted at `root` over a set of named pages.
pub fn reader_over(files: &[(&str, &str)], root: &str) -> PageReader {
    let mut provider = MemoryProvider::new();
    for (name, text) in files {
        provider.insert(*name, *text);
    }
    PageReader::new(provider, root).expect("open failed")
}

/// Helper: consume everything left, returning the chars seen.
pub fn drain(reader: &mut PageReader) -> String {
    let mut out = String::new();
    while let Some(ch) = reader.next_char() {
        out.push(ch);
    }
    out
}
