//! CLI tool to list directives in JSP-style pages and check that
//! their scripting elements and directive attributes are well formed.

use std::path::Path;
use std::process::ExitCode;

use jsp_scan::source::resolve_include;
use jsp_scan::{FsProvider, Mark, PageReader, ScanError};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        eprintln!("Usage: jspscan <command> [files...]");
        eprintln!();
        eprintln!("Commands:");
        eprintln!("  directives  List page directives, following includes");
        eprintln!("  check       Check scripting elements and directive attributes");
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  jspscan directives index.jsp");
        eprintln!("  jspscan check index.jsp");
        return ExitCode::from(2);
    }

    let command = args[1].as_str();
    let files = &args[2..];

    if files.is_empty() {
        eprintln!("Error: no files specified");
        return ExitCode::from(2);
    }

    let mut had_error = false;

    for path in files {
        match command {
            "directives" => match scan_directives(path) {
                Ok(lines) => {
                    for line in lines {
                        println!("{line}");
                    }
                }
                Err(e) => {
                    eprintln!("{path}: {e}");
                    had_error = true;
                }
            },
            "check" => match check_page(path) {
                Ok(()) => {
                    eprintln!("{path}: ok");
                }
                Err(e) => {
                    eprintln!("{path}: {e}");
                    had_error = true;
                }
            },
            _ => {
                eprintln!("Unknown command: {command}");
                return ExitCode::from(2);
            }
        }
    }

    if had_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn open_reader(path: &str) -> Result<PageReader, ScanError> {
    let provider = if Path::new(path).is_absolute() {
        FsProvider::new("/")
    } else {
        FsProvider::new(".")
    };
    PageReader::new(provider, path)
}

/// Collect every `<%@ ... %>` directive, descending into the files
/// that `include` directives name.
fn scan_directives(path: &str) -> Result<Vec<String>, ScanError> {
    let mut reader = open_reader(path)?;
    let mut lines = Vec::new();

    while let Some(start) = reader.skip_until("<%@") {
        reader.skip_spaces();
        let name = reader.parse_token(false)?;

        let mut attributes: Vec<(String, String)> = Vec::new();
        while !reader.matches_optional_spaces_followed_by("%>") {
            if !reader.has_more_input() {
                break;
            }
            let attribute = reader.parse_token(false)?;
            if attribute.is_empty() {
                // Sitting on a delimiter that is not the closer.
                reader.next_char();
                continue;
            }
            reader.skip_spaces();
            let value = if reader.peek_char() == Some('=') {
                reader.next_char();
                reader.parse_token(true)?
            } else {
                String::new()
            };
            attributes.push((attribute, value));
        }

        let rendered: String = attributes
            .iter()
            .map(|(attribute, value)| format!(" {attribute}=\"{value}\""))
            .collect();
        lines.push(format!("{start}: {name}{rendered}"));

        if name == "include" {
            if let Some((_, target)) = attributes.iter().find(|(a, _)| a == "file") {
                let resolved = resolve_include(start.base_dir(), target);
                reader.push_file(&resolved)?;
            }
        }
    }

    Ok(lines)
}

/// Verify that every scripting element opened with `<%` is closed and
/// that directive attributes are well formed.
fn check_page(path: &str) -> Result<(), String> {
    let mut reader = open_reader(path).map_err(|e| e.to_string())?;

    while let Some(open) = reader.skip_until("<%") {
        if reader.matches("--") {
            // Comments close with --%>; an escaped closer does not count.
            if reader.skip_until_ignore_esc("--%>").is_none() {
                return Err(format!("unclosed comment at {}", open.location()));
            }
        } else if reader.matches("@") {
            check_directive(&mut reader, &open)?;
        } else if reader.skip_until_ignore_esc("%>").is_none() {
            return Err(format!("unclosed scripting element at {}", open.location()));
        }
    }

    Ok(())
}

/// Walk one directive's attributes, reporting a malformed value or a
/// missing closer.
fn check_directive(reader: &mut PageReader, open: &Mark) -> Result<(), String> {
    reader.skip_spaces();
    reader.parse_token(false).map_err(|e| e.to_string())?;

    while !reader.matches_optional_spaces_followed_by("%>") {
        if !reader.has_more_input() {
            return Err(format!("unclosed directive at {}", open.location()));
        }
        let attribute = reader.parse_token(false).map_err(|e| e.to_string())?;
        if attribute.is_empty() {
            reader.next_char();
            continue;
        }
        reader.skip_spaces();
        if reader.peek_char() == Some('=') {
            reader.next_char();
            reader.parse_token(true).map_err(|e| e.to_string())?;
        }
    }

    Ok(())
}
