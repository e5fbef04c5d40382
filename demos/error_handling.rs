//! Demonstrate error reporting for broken pages.

fn main() {
    // Unterminated quoted attribute value
    let mut reader =
        jsp_scan::PageReader::from_source("broken.jsp", "<%@ page info=\"unclosed %>")
            .expect("open failed");
    reader.skip_until("info=").expect("attribute");
    match reader.parse_token(true) {
        Ok(value) => println!("Parsed OK (unexpected): {value}"),
        Err(e) => {
            println!("Scan error: {e}");
            println!("  Kind: {:?}", e.kind);
            println!("  Location: {}", e.location);
        }
    }

    println!();

    // Include cycle
    let provider = jsp_scan::MemoryProvider::new()
        .with_file("a.jsp", "<%@ include file=\"b.jsp\" %>")
        .with_file("b.jsp", "<%@ include file=\"a.jsp\" %>");

    let mut reader = jsp_scan::PageReader::new(provider, "a.jsp").expect("open failed");
    reader.push_file("b.jsp").expect("push b.jsp");
    match reader.push_file("a.jsp") {
        Ok(()) => println!("Pushed OK (unexpected)"),
        Err(e) => {
            println!("Scan error: {e}");
            println!("  Kind: {:?}", e.kind);
        }
    }
}
