use std::fmt;
use std::rc::Rc;

use crate::mark::{FileCursor, Location, Mark};
use crate::source::{MemoryProvider, SourceError, SourceProvider, base_dir_of};

/// Classifies a fatal scan error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanErrorKind {
    /// Quoted attribute value never closed before end of input.
    UnterminatedQuotes,
    /// Attribute value expected to start with a quote.
    AttributeNotQuoted,
    /// File pushed while still open on the include stack.
    RecursiveInclude { name: String },
    /// Include target did not resolve to a file.
    FileNotFound { name: String },
    /// Include target resolved but could not be read.
    FileRead { name: String, reason: String },
}

impl fmt::Display for ScanErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedQuotes => {
                write!(f, "unterminated quoted value")
            }
            Self::AttributeNotQuoted => {
                write!(f, "attribute value must be quoted")
            }
            Self::RecursiveInclude { name } => {
                write!(f, "recursive include of file '{name}'")
            }
            Self::FileNotFound { name } => {
                write!(f, "file '{name}' not found")
            }
            Self::FileRead { name, reason } => {
                write!(f, "file '{name}' could not be read: {reason}")
            }
        }
    }
}

/// Fatal error produced during scanning.
///
/// Scanning does not continue after a fatal error; the location names
/// the file, line, and column the reader had reached.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at {location}")]
pub struct ScanError {
    pub kind: ScanErrorKind,
    pub location: Location,
}

/// Backtracking reader over a stack of template source files.
///
/// The reader is an input buffer for a template parser: it allows
/// unlimited lookahead and pushback, hands out [`Mark`] snapshots for
/// arbitrary backtracking, and carries the scanning utilities the
/// parser needs for htmlesque syntax (literal and escape-aware search,
/// end-tag matching, attribute-token extraction).
///
/// Files are loaded whole into shared immutable buffers, which is what
/// makes mark/reset and unbounded lookahead cheap. Included files are
/// pushed on top of the current one and popped transparently when they
/// run out, so the enclosing parser never sees the file boundary
/// unless it asks a mark.
///
/// One reader serves one compilation unit on one thread.
pub struct PageReader {
    provider: Box<dyn SourceProvider>,
    /// The current spot in the current file.
    current: Mark,
    /// Logical names of the files open on the include stack.
    source_files: Vec<Rc<str>>,
    /// When set, end of the current file is end of input: no popping.
    single_file: bool,
}

impl fmt::Debug for PageReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageReader")
            .field("current", &self.current)
            .field("source_files", &self.source_files)
            .field("single_file", &self.single_file)
            .finish_non_exhaustive()
    }
}

impl PageReader {
    /// Create a reader rooted at `name`, loading it through `provider`.
    pub fn new(
        provider: impl SourceProvider + 'static,
        name: &str,
    ) -> Result<Self, ScanError> {
        let provider: Box<dyn SourceProvider> = Box::new(provider);
        let stream = load_stream(provider.as_ref(), name).map_err(|kind| ScanError {
            kind,
            location: Location {
                file: name.to_string(),
                line: 1,
                column: 0,
            },
        })?;

        let file_name: Rc<str> = Rc::from(name);
        let base_dir: Rc<str> = Rc::from(base_dir_of(name));
        let current = Mark::root(FileCursor::start(stream, 0, Rc::clone(&file_name), base_dir));

        Ok(Self {
            provider,
            current,
            source_files: vec![file_name],
            single_file: false,
        })
    }

    /// Create a reader over a single in-memory source.
    pub fn from_source(name: &str, text: &str) -> Result<Self, ScanError> {
        Self::new(MemoryProvider::new().with_file(name, text), name)
    }

    /// Logical name registered under `file_id`, if that file is still
    /// open on the include stack.
    #[must_use]
    pub fn file_name(&self, file_id: usize) -> Option<&str> {
        self.source_files.get(file_id).map(Rc::as_ref)
    }

    /// Toggle single-file mode.
    ///
    /// When on, end of the current file is end of input and no
    /// enclosing files are popped; used for bounded lookahead passes
    /// over one buffer.
    pub const fn set_single_file(&mut self, val: bool) {
        self.single_file = val;
    }

    /// Whether at least one more char is available.
    ///
    /// When the current file is exhausted, enclosing files are popped
    /// transparently until one has remaining input (unless single-file
    /// mode is on). Returns false only at true end of input.
    pub fn has_more_input(&mut self) -> bool {
        if self.current.at_end() {
            if self.single_file {
                return false;
            }
            while self.pop_file() {
                if !self.current.at_end() {
                    return true;
                }
            }
            return false;
        }
        true
    }

    /// Consume and return the next char, or `None` at end of input.
    ///
    /// A newline bumps the line counter and resets the column to 0;
    /// any other char bumps the column.
    pub fn next_char(&mut self) -> Option<char> {
        if !self.has_more_input() {
            return None;
        }
        let ch = self.current.cursor.stream[self.current.cursor.pos];
        self.advance(ch);
        Some(ch)
    }

    /// Like [`Self::next_char`], but first refreshes `mark` to the
    /// position of the returned char. Cheaper than a full [`Self::mark`]
    /// before every char when scanning long stretches.
    fn next_char_tracked(&mut self, mark: &mut Mark) -> Option<char> {
        if !self.has_more_input() {
            return None;
        }
        mark.clone_from(&self.current);
        let ch = self.current.cursor.stream[self.current.cursor.pos];
        self.advance(ch);
        Some(ch)
    }

    const fn advance(&mut self, ch: char) {
        self.current.cursor.pos += 1;
        if ch == '\n' {
            self.current.cursor.line += 1;
            self.current.cursor.col = 0;
        } else {
            self.current.cursor.col += 1;
        }
    }

    /// Return the next char without consuming it, or `None` at end of
    /// input.
    pub fn peek_char(&mut self) -> Option<char> {
        if !self.has_more_input() {
            return None;
        }
        Some(self.current.cursor.stream[self.current.cursor.pos])
    }

    /// Back up the cursor by one char.
    ///
    /// The caller must guarantee the cursor is past the start of the
    /// current file and that the char being unread is not a newline;
    /// the column bookkeeping would be wrong otherwise.
    pub fn push_char(&mut self) {
        debug_assert!(self.current.cursor.pos > 0, "push_char at start of file");
        debug_assert_ne!(
            self.current.cursor.stream[self.current.cursor.pos - 1],
            '\n',
            "push_char across a newline"
        );
        self.current.cursor.pos -= 1;
        self.current.cursor.col -= 1;
    }

    /// Snapshot the current position.
    #[must_use]
    pub fn mark(&self) -> Mark {
        self.current.clone()
    }

    /// Restore a previously captured position.
    ///
    /// The mark's include-stack state is restored with it, so
    /// resetting across an include boundary leaves subsequent popping
    /// consistent.
    pub fn reset(&mut self, mark: &Mark) {
        self.current = mark.clone();
    }

    /// Collect the text between two marks.
    ///
    /// `stop` must be reachable by scanning forward from `start`; the
    /// current position is saved and restored around the walk.
    /// Collection stops early if end of input arrives before `stop`.
    pub fn get_text(&mut self, start: &Mark, stop: &Mark) -> String {
        let saved = self.mark();
        self.reset(start);
        let mut text = String::new();
        while self.current != *stop {
            let Some(ch) = self.next_char() else {
                break;
            };
            text.push(ch);
        }
        self.current = saved;
        text
    }

    /// Consume consecutive whitespace, returning how many chars were
    /// skipped. Any char `<= ' '` counts as whitespace.
    pub fn skip_spaces(&mut self) -> usize {
        let mut count = 0;
        while self.has_more_input() && self.is_space() {
            count += 1;
            self.next_char();
        }
        count
    }

    fn is_space(&mut self) -> bool {
        // End of input classifies as a space, like any control char.
        self.peek_char().is_none_or(|ch| ch <= ' ')
    }

    /// Try to match `literal` at the current position.
    ///
    /// On success the cursor moves past the matched text with
    /// line/column updated exactly as if the chars had been consumed
    /// one by one (newlines included); on failure the position is
    /// unchanged.
    pub fn matches(&mut self, literal: &str) -> bool {
        let len = literal.chars().count();
        let pos = self.current.cursor.pos;
        if pos + len < self.current.cursor.stream.len() {
            // Enough buffer left to compare in place.
            let mut line = self.current.cursor.line;
            let mut col = self.current.cursor.col;
            let mut i = pos;
            for expected in literal.chars() {
                let ch = self.current.cursor.stream[i];
                if ch != expected {
                    return false;
                }
                i += 1;
                if ch == '\n' {
                    line += 1;
                    col = 0;
                } else {
                    col += 1;
                }
            }
            self.current.update_position(i, line, col);
        } else {
            // The literal may run past this buffer into an enclosing
            // file; consume char by char instead.
            let saved = self.mark();
            for expected in literal.chars() {
                if self.next_char() != Some(expected) {
                    self.current = saved;
                    return false;
                }
            }
        }
        true
    }

    /// Match `</tag`, optional whitespace, and `>`; restore the
    /// position on failure.
    pub fn matches_etag(&mut self, tag_name: &str) -> bool {
        let saved = self.mark();
        if !self.matches(&format!("</{tag_name}")) {
            return false;
        }
        self.skip_spaces();
        if self.next_char() == Some('>') {
            return true;
        }
        self.current = saved;
        false
    }

    /// Variant of [`Self::matches_etag`] for when the caller has
    /// already consumed the leading `<`.
    pub fn matches_etag_without_less_than(&mut self, tag_name: &str) -> bool {
        let saved = self.mark();
        if !self.matches(&format!("/{tag_name}")) {
            return false;
        }
        self.skip_spaces();
        if self.next_char() == Some('>') {
            return true;
        }
        self.current = saved;
        false
    }

    /// Skip whitespace, then try `literal`; on failure restore the
    /// position from before the whitespace was skipped.
    pub fn matches_optional_spaces_followed_by(&mut self, literal: &str) -> bool {
        let saved = self.mark();
        self.skip_spaces();
        let matched = self.matches(literal);
        if !matched {
            self.current = saved;
        }
        matched
    }

    /// Fast scan for `target` in the current buffer.
    ///
    /// `Some(true)`: found; `mark` is refreshed to the char's position
    /// and the cursor sits just past it. `Some(false)`: the current
    /// buffer ran out without a match, cursor parked at its end.
    /// `None`: end of all input.
    fn index_of(&mut self, target: char, mark: &mut Mark) -> Option<bool> {
        if !self.has_more_input() {
            return None;
        }
        let stream = Rc::clone(&self.current.cursor.stream);
        let end = stream.len();
        let mut line = self.current.cursor.line;
        let mut col = self.current.cursor.col;
        let mut i = self.current.cursor.pos;
        while i < end {
            let ch = stream[i];
            if ch == target {
                mark.update_position(i, line, col);
            }
            if ch == '\n' {
                line += 1;
                col = 0;
            } else {
                col += 1;
            }
            if ch == target {
                self.current.update_position(i + 1, line, col);
                return Some(true);
            }
            i += 1;
        }
        self.current.update_position(i, line, col);
        Some(false)
    }

    /// Scan forward to the next occurrence of `limit`.
    ///
    /// Returns a mark positioned at the start of the matched text,
    /// leaving the cursor just past it, or `None` when the limit never
    /// occurs before end of input. Only the first char of the limit is
    /// probed while skipping; a failed partial match resumes just
    /// after the char that started it, so skipped text is never
    /// rescanned.
    pub fn skip_until(&mut self, limit: &str) -> Option<Mark> {
        let mut chars = limit.chars();
        let first = chars.next()?;
        let rest: Vec<char> = chars.collect();

        let mut ret = self.mark();
        'skip: while let Some(found) = self.index_of(first, &mut ret) {
            if found {
                let restart = self.mark();
                for &expected in &rest {
                    if self.peek_char() == Some(expected) {
                        self.next_char();
                    } else {
                        self.current = restart;
                        continue 'skip;
                    }
                }
                return Some(ret);
            }
        }
        None
    }

    /// Like [`Self::skip_until`], but a limit occurrence whose first
    /// char is escaped by a single `\` is passed over. A double
    /// backslash cancels the escape, so alternating pairs behave as
    /// literal backslashes.
    pub fn skip_until_ignore_esc(&mut self, limit: &str) -> Option<Mark> {
        let mut chars = limit.chars();
        let first = chars.next()?;
        let rest: Vec<char> = chars.collect();

        let mut ret = self.mark();
        let mut prev = 'x'; // anything but a backslash
        'skip: while let Some(mut ch) = self.next_char_tracked(&mut ret) {
            if ch == '\\' && prev == '\\' {
                ch = '\0'; // a double backslash no longer escapes
            } else if ch == first && prev != '\\' {
                for &expected in &rest {
                    if self.peek_char() == Some(expected) {
                        self.next_char();
                    } else {
                        prev = ch;
                        continue 'skip;
                    }
                }
                return Some(ret);
            }
            prev = ch;
        }
        None
    }

    /// Locate `</tag` followed by optional whitespace and `>`.
    ///
    /// Returns a mark at the start of the end tag with the cursor past
    /// its `>`. There is no backtracking past a `</tag` whose trailing
    /// `>` check fails: such a document reports "not found" even if a
    /// well-formed end tag occurs later.
    pub fn skip_until_etag(&mut self, tag: &str) -> Option<Mark> {
        let ret = self.skip_until(&format!("</{tag}"))?;
        self.skip_spaces();
        if self.next_char() == Some('>') {
            Some(ret)
        } else {
            None
        }
    }

    /// Extract an attribute-style token.
    ///
    /// Leading whitespace is skipped first. With `quoted`, the token
    /// must be wrapped in matching single or double quotes and a
    /// backslash takes the following char literally. Without, chars
    /// are read up to the next delimiter, unescaping `\"`, `\'`, `\>`
    /// and `\%` along the way; any other backslash is kept as is.
    ///
    /// Returns the accumulated text, possibly empty when no input
    /// remains.
    pub fn parse_token(&mut self, quoted: bool) -> Result<String, ScanError> {
        let mut text = String::new();
        self.skip_spaces();

        if !self.has_more_input() {
            return Ok(text);
        }

        if quoted {
            let Some(quote @ ('"' | '\'')) = self.peek_char() else {
                return Err(self.scan_error(ScanErrorKind::AttributeNotQuoted));
            };
            self.next_char(); // consume the opening quote

            let mut closed = false;
            while let Some(ch) = self.next_char() {
                if ch == quote {
                    closed = true;
                    break;
                }
                if ch == '\\' {
                    let Some(escaped) = self.next_char() else {
                        break;
                    };
                    text.push(escaped);
                } else {
                    text.push(ch);
                }
            }
            if !closed {
                return Err(self.scan_error(ScanErrorKind::UnterminatedQuotes));
            }
        } else {
            while !self.is_delimiter() {
                let Some(mut ch) = self.next_char() else {
                    break;
                };
                if ch == '\\' {
                    if let Some(escaped @ ('"' | '\'' | '>' | '%')) = self.peek_char() {
                        self.next_char();
                        ch = escaped;
                    }
                }
                text.push(ch);
            }
        }

        Ok(text)
    }

    /// Whether the next char ends an unquoted token.
    ///
    /// Delimiters are whitespace, one of `= > " ' /`, or an
    /// end-of-tag arrow; probing for the arrow consumes up to two
    /// chars speculatively and restores the position exactly,
    /// whatever the outcome.
    fn is_delimiter(&mut self) -> bool {
        if self.is_space() {
            return true;
        }
        match self.peek_char() {
            Some('=' | '>' | '"' | '\'' | '/') => true,
            Some('-') => {
                let saved = self.mark();
                let ch = self.next_char();
                let delim =
                    ch == Some('>') || (ch == Some('-') && self.next_char() == Some('>'));
                self.current = saved;
                delim
            }
            _ => false,
        }
    }

    /// Suspend the current file and continue scanning in `name`.
    ///
    /// The current position is remembered; once the included file is
    /// exhausted, scanning resumes in the enclosing file exactly where
    /// it left off. Pushing a file that is still open on the include
    /// stack is a fatal error: includes must not recurse.
    pub fn push_file(&mut self, name: &str) -> Result<(), ScanError> {
        let Some(file_id) = self.register_source_file(name) else {
            return Err(self.scan_error(ScanErrorKind::RecursiveInclude {
                name: name.to_string(),
            }));
        };

        let stream = match load_stream(self.provider.as_ref(), name) {
            Ok(stream) => stream,
            Err(kind) => {
                self.unregister_source_file(name);
                return Err(self.scan_error(kind));
            }
        };

        let file_name = Rc::clone(&self.source_files[file_id]);
        let base_dir = Rc::from(base_dir_of(name));
        self.current.push_stream(stream, file_id, file_name, base_dir);
        Ok(())
    }

    /// Return to the enclosing file, or report that there is none.
    fn pop_file(&mut self) -> bool {
        // The registry entry may already be gone: the reader keeps
        // probing for input after the root file has been released.
        let file_id = self.current.file_id();
        let still_registered = self
            .source_files
            .get(file_id)
            .is_some_and(|name| name.as_ref() == self.current.file_name());
        if still_registered {
            let name = Rc::clone(&self.current.cursor.file_name);
            self.unregister_source_file(&name);
        }
        self.current.pop_stream()
    }

    /// Register an open file, or `None` when the name is already open.
    fn register_source_file(&mut self, name: &str) -> Option<usize> {
        if self.source_files.iter().any(|f| f.as_ref() == name) {
            return None;
        }
        self.source_files.push(Rc::from(name));
        Some(self.source_files.len() - 1)
    }

    fn unregister_source_file(&mut self, name: &str) {
        let removed = self
            .source_files
            .iter()
            .position(|f| f.as_ref() == name)
            .map(|i| self.source_files.remove(i));
        debug_assert!(removed.is_some(), "pop of unregistered file '{name}'");
    }

    fn scan_error(&self, kind: ScanErrorKind) -> ScanError {
        ScanError {
            kind,
            location: self.current.location(),
        }
    }
}

/// Load a file through the provider into a shared char buffer.
fn load_stream(
    provider: &dyn SourceProvider,
    name: &str,
) -> Result<Rc<[char]>, ScanErrorKind> {
    provider
        .load(name)
        .map(|text| text.chars().collect())
        .map_err(|err| {
            log::debug!("failed to load '{name}': {err}");
            match err {
                SourceError::NotFound(name) => ScanErrorKind::FileNotFound { name },
                SourceError::Read { name, reason } => ScanErrorKind::FileRead { name, reason },
            }
        })
}
