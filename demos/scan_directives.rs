//! Scan an in-memory page for directives, following its include.

use jsp_scan::source::resolve_include;

fn main() {
    let provider = jsp_scan::MemoryProvider::new()
        .with_file(
            "index.jsp",
            "\
<%@ page language=\"java\" %>
<html>
<%@ include file=\"header.jsp\" %>
<body>ok</body>
</html>
",
        )
        .with_file(
            "header.jsp",
            "<%@ taglib prefix=\"c\" uri=\"jakarta.tags.core\" %>\n<h1>hi</h1>\n",
        );

    let mut reader = jsp_scan::PageReader::new(provider, "index.jsp").expect("open failed");

    while let Some(start) = reader.skip_until("<%@") {
        reader.skip_spaces();
        let name = reader.parse_token(false).expect("directive name");
        println!("{start}: {name}");

        let mut include = None;
        while !reader.matches_optional_spaces_followed_by("%>") {
            let attribute = reader.parse_token(false).expect("attribute name");
            reader.skip_spaces();
            reader.next_char(); // '='
            let value = reader.parse_token(true).expect("attribute value");
            println!("  {attribute} = {value}");

            if name == "include" && attribute == "file" {
                include = Some(value);
            }
        }

        // Descend into the included file; the reader pops back to the
        // enclosing page on its own once it runs out.
        if let Some(file) = include {
            let resolved = resolve_include(start.base_dir(), &file);
            reader.push_file(&resolved).expect("include failed");
        }
    }
}
