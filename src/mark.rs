use std::fmt;
use std::rc::Rc;

/// One cursor position inside one loaded source file.
///
/// The buffer is shared and never mutated after loading, so cursors can
/// be cloned freely without copying file contents.
#[derive(Debug, Clone)]
pub(crate) struct FileCursor {
    /// Full contents of the file, loaded up front.
    pub(crate) stream: Rc<[char]>,
    /// Index into the reader's registered-file list.
    pub(crate) file_id: usize,
    /// Logical name the file was registered under.
    pub(crate) file_name: Rc<str>,
    /// Directory component of the logical name.
    pub(crate) base_dir: Rc<str>,
    /// Char offset into `stream`; `stream.len()` means end of input.
    pub(crate) pos: usize,
    /// 1-based line number.
    pub(crate) line: usize,
    /// 0-based column, reset to 0 after a newline.
    pub(crate) col: usize,
}

impl FileCursor {
    pub(crate) const fn start(
        stream: Rc<[char]>,
        file_id: usize,
        file_name: Rc<str>,
        base_dir: Rc<str>,
    ) -> Self {
        Self {
            stream,
            file_id,
            file_name,
            base_dir,
            pos: 0,
            line: 1,
            col: 0,
        }
    }
}

/// Snapshot of a scan position.
///
/// A mark pins a char offset in a specific file together with its
/// line/column and the stack of enclosing files that were open when the
/// snapshot was taken. Feeding a mark back into
/// [`PageReader::reset`](crate::PageReader::reset) restores all of it,
/// so the enclosing parser can backtrack across include boundaries.
///
/// Two marks are equal when they reference the same file id, the same
/// buffer, and the same offset; line, column, and the include stack do
/// not participate in equality.
#[derive(Debug, Clone)]
pub struct Mark {
    pub(crate) cursor: FileCursor,
    /// Enclosing files, innermost last. Cloned into every snapshot.
    pub(crate) include_stack: Vec<FileCursor>,
}

impl Mark {
    pub(crate) const fn root(cursor: FileCursor) -> Self {
        Self {
            cursor,
            include_stack: Vec::new(),
        }
    }

    /// Suspend the current file and continue in `stream`.
    pub(crate) fn push_stream(
        &mut self,
        stream: Rc<[char]>,
        file_id: usize,
        file_name: Rc<str>,
        base_dir: Rc<str>,
    ) {
        let next = FileCursor::start(stream, file_id, file_name, base_dir);
        let prev = std::mem::replace(&mut self.cursor, next);
        self.include_stack.push(prev);
    }

    /// Return to the enclosing file, or report that there is none.
    pub(crate) fn pop_stream(&mut self) -> bool {
        let Some(prev) = self.include_stack.pop() else {
            return false;
        };
        self.cursor = prev;
        true
    }

    /// Refresh offset/line/column only; the buffer reference stays.
    pub(crate) const fn update_position(&mut self, pos: usize, line: usize, col: usize) {
        self.cursor.pos = pos;
        self.cursor.line = line;
        self.cursor.col = col;
    }

    pub(crate) fn at_end(&self) -> bool {
        self.cursor.pos >= self.cursor.stream.len()
    }

    /// Id of the file this mark points into.
    #[must_use]
    pub const fn file_id(&self) -> usize {
        self.cursor.file_id
    }

    /// Logical name of the file this mark points into.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.cursor.file_name
    }

    /// Directory component of the file's logical name, for resolving
    /// relative includes.
    #[must_use]
    pub fn base_dir(&self) -> &str {
        &self.cursor.base_dir
    }

    /// Char offset into the file, in `[0, len]`; `len` is end of input.
    #[must_use]
    pub const fn pos(&self) -> usize {
        self.cursor.pos
    }

    /// 1-based line number.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.cursor.line
    }

    /// 0-based column number.
    #[must_use]
    pub const fn column(&self) -> usize {
        self.cursor.col
    }

    /// Source location of this mark, for error reporting.
    #[must_use]
    pub fn location(&self) -> Location {
        Location {
            file: self.cursor.file_name.to_string(),
            line: self.cursor.line,
            column: self.cursor.col,
        }
    }
}

impl PartialEq for Mark {
    fn eq(&self, other: &Self) -> bool {
        self.cursor.file_id == other.cursor.file_id
            && Rc::ptr_eq(&self.cursor.stream, &other.cursor.stream)
            && self.cursor.pos == other.cursor.pos
    }
}

impl Eq for Mark {}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.cursor.file_name, self.cursor.line, self.cursor.col
        )
    }
}

/// Source location for error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, line {}, column {}", self.file, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(stream: Rc<[char]>, file_id: usize, name: &str) -> FileCursor {
        FileCursor::start(stream, file_id, Rc::from(name), Rc::from(""))
    }

    #[test]
    fn equal_when_same_file_buffer_and_offset() {
        let stream: Rc<[char]> = "hello".chars().collect();
        let a = Mark::root(cursor(Rc::clone(&stream), 0, "a.jsp"));
        let mut b = Mark::root(cursor(Rc::clone(&stream), 0, "a.jsp"));
        assert_eq!(a, b);

        b.update_position(3, 1, 3);
        assert_ne!(a, b);
    }

    #[test]
    fn not_equal_across_buffers() {
        let one: Rc<[char]> = "hello".chars().collect();
        let two: Rc<[char]> = "hello".chars().collect();
        let a = Mark::root(cursor(one, 0, "a.jsp"));
        let b = Mark::root(cursor(two, 0, "a.jsp"));
        assert_ne!(a, b);
    }

    #[test]
    fn line_and_column_do_not_affect_equality() {
        let stream: Rc<[char]> = "a\nb".chars().collect();
        let a = Mark::root(cursor(Rc::clone(&stream), 0, "a.jsp"));
        let mut b = Mark::root(cursor(stream, 0, "a.jsp"));
        // Same offset, deliberately inconsistent line/col.
        b.update_position(0, 7, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn push_and_pop_restore_the_enclosing_cursor() {
        let outer: Rc<[char]> = "outer".chars().collect();
        let inner: Rc<[char]> = "inner".chars().collect();
        let mut mark = Mark::root(cursor(outer, 0, "outer.jsp"));
        mark.update_position(3, 1, 3);

        mark.push_stream(inner, 1, Rc::from("inner.jspf"), Rc::from(""));
        assert_eq!(mark.file_id(), 1);
        assert_eq!(mark.pos(), 0);

        assert!(mark.pop_stream());
        assert_eq!(mark.file_id(), 0);
        assert_eq!(mark.pos(), 3);
        assert!(!mark.pop_stream());
    }

    #[test]
    fn snapshots_do_not_share_include_state() {
        let outer: Rc<[char]> = "outer".chars().collect();
        let inner: Rc<[char]> = "inner".chars().collect();
        let mut live = Mark::root(cursor(outer, 0, "outer.jsp"));
        let snapshot = live.clone();

        live.push_stream(inner, 1, Rc::from("inner.jspf"), Rc::from(""));
        assert_eq!(snapshot.file_id(), 0);
        assert!(snapshot.include_stack.is_empty());
        assert_eq!(live.include_stack.len(), 1);
    }

    #[test]
    fn display_is_name_line_column() {
        let stream: Rc<[char]> = "x".chars().collect();
        let mut mark = Mark::root(cursor(stream, 0, "page.jsp"));
        mark.update_position(1, 2, 5);
        assert_eq!(mark.to_string(), "page.jsp:2:5");
    }

    #[test]
    fn location_display() {
        let loc = Location {
            file: "page.jsp".to_string(),
            line: 3,
            column: 7,
        };
        assert_eq!(loc.to_string(), "page.jsp, line 3, column 7");
    }
}
