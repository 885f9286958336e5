//! String-aware brace/bracket scanner.
//!
//! Walks source text one character at a time and reports, for every
//! position, the nesting depth before and after that character together
//! with whether it sits inside a string literal. Three quote styles are
//! recognised (`"`, `'` and `` ` ``); the first quote opens a string and only
//! an unescaped occurrence of the same character closes it.
//!
//! `//` and `/* */` comments are skipped: nothing inside them opens a
//! string or changes depth. An apostrophe that directly follows a letter or
//! digit is read as prose, so `don't` does not open a string.
//!
//! The scanner never fails. An unterminated string simply runs to the end of
//! input, and closing characters at depth zero are ignored instead of
//! driving the depth negative.

/// Quote characters that open a string literal.
pub const QUOTES: [char; 3] = ['"', '\'', '`'];

pub fn is_quote(ch: char) -> bool {
    QUOTES.contains(&ch)
}

/// Nesting depth, tracked separately for `{}` and `[]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Depth {
    pub braces: usize,
    pub brackets: usize,
}

/// One scanned character and the state around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Byte offset of `ch` in the full text.
    pub offset: usize,
    pub ch: char,
    pub before: Depth,
    pub after: Depth,
    /// True when `ch` belongs to a string literal, delimiters included.
    pub in_string: bool,
    /// True when `ch` belongs to a `//` or `/* */` comment, markers included.
    pub in_comment: bool,
}

impl Step {
    /// Byte offset just past this character.
    pub fn end(&self) -> usize {
        self.offset + self.ch.len_utf8()
    }

    /// Neither quoted nor commented out.
    pub fn is_code(&self) -> bool {
        !self.in_string && !self.in_comment
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comment {
    Line,
    /// Just saw `/`; the next char is the `*` of the opener.
    BlockOpen,
    Block,
    /// Inside a block comment, right after a `*`.
    BlockStar,
}

/// Iterator over [`Step`]s starting at a byte offset.
pub struct Scanner<'a> {
    chars: std::str::CharIndices<'a>,
    base: usize,
    depth: Depth,
    quote: Option<char>,
    comment: Option<Comment>,
    escaped: bool,
    prev: Option<char>,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self::starting_at(text, 0)
    }

    /// Start scanning at `offset` with zero depth, outside any string or
    /// comment.
    ///
    /// Offsets past the end or inside a multi-byte character are moved
    /// forward to the next character boundary.
    pub fn starting_at(text: &'a str, offset: usize) -> Self {
        let mut base = offset.min(text.len());
        while !text.is_char_boundary(base) {
            base += 1;
        }
        Self {
            chars: text[base..].char_indices(),
            base,
            depth: Depth::default(),
            quote: None,
            comment: None,
            escaped: false,
            prev: None,
        }
    }

    pub fn depth(&self) -> Depth {
        self.depth
    }

    /// The delimiter of the string currently open, if any.
    ///
    /// Once the iterator is exhausted this reports whether the input ended
    /// inside an unterminated string.
    pub fn open_quote(&self) -> Option<char> {
        self.quote
    }

    /// An apostrophe directly after a letter or digit (`don't`, `Europe's`)
    /// is prose, not the start of a string.
    fn opens_string(&self, ch: char) -> bool {
        is_quote(ch) && !(ch == '\'' && self.prev.is_some_and(char::is_alphanumeric))
    }
}

impl Iterator for Scanner<'_> {
    type Item = Step;

    fn next(&mut self) -> Option<Step> {
        let (i, ch) = self.chars.next()?;
        let before = self.depth;
        let mut in_string = false;
        let mut in_comment = false;

        if let Some(q) = self.quote {
            if self.escaped {
                self.escaped = false;
            } else if ch == '\\' {
                self.escaped = true;
            } else if ch == q {
                self.quote = None;
            }
            in_string = true;
        } else if let Some(comment) = self.comment {
            self.comment = match (comment, ch) {
                (Comment::Line, '\n') => None,
                (Comment::Line, _) => Some(Comment::Line),
                (Comment::BlockOpen, _) => Some(Comment::Block),
                (Comment::BlockStar, '/') => None,
                (_, '*') => Some(Comment::BlockStar),
                _ => Some(Comment::Block),
            };
            // The newline ending a line comment is ordinary text again.
            in_comment = !(comment == Comment::Line && ch == '\n');
        } else if ch == '/' {
            self.comment = match self.chars.clone().next() {
                Some((_, '/')) => Some(Comment::Line),
                Some((_, '*')) => Some(Comment::BlockOpen),
                _ => None,
            };
            in_comment = self.comment.is_some();
        } else if self.opens_string(ch) {
            self.quote = Some(ch);
            in_string = true;
        } else {
            match ch {
                '{' => self.depth.braces += 1,
                '}' => self.depth.braces = self.depth.braces.saturating_sub(1),
                '[' => self.depth.brackets += 1,
                ']' => self.depth.brackets = self.depth.brackets.saturating_sub(1),
                _ => {}
            }
        }
        self.prev = Some(ch);

        Some(Step {
            offset: self.base + i,
            ch,
            before,
            after: self.depth,
            in_string,
            in_comment,
        })
    }
}

/// First offset at or after `at` that is neither whitespace nor comment.
pub fn skip_trivia(text: &str, mut at: usize) -> usize {
    loop {
        let Some(rest) = text.get(at..) else {
            return text.len();
        };
        let trimmed = rest.trim_start();
        at += rest.len() - trimmed.len();
        if trimmed.starts_with("//") {
            at = trimmed.find('\n').map_or(text.len(), |n| at + n);
        } else if trimmed.starts_with("/*") {
            at = trimmed[2..].find("*/").map_or(text.len(), |n| at + 2 + n + 2);
        } else {
            return at;
        }
    }
}

/// Offset of the character that closes the `{` or `[` at `open`.
///
/// Returns `None` when `open` is not an opener or the region never closes.
pub fn matching_close(text: &str, open: usize) -> Option<usize> {
    let opener = text.get(open..)?.chars().next()?;
    let closer = match opener {
        '{' => '}',
        '[' => ']',
        _ => return None,
    };
    for step in Scanner::starting_at(text, open) {
        if !step.is_code() || step.ch != closer {
            continue;
        }
        let level = match closer {
            '}' => step.after.braces,
            _ => step.after.brackets,
        };
        if level == 0 {
            return Some(step.offset);
        }
    }
    None
}

/// Offset of the quote closing the string literal opened at `open`.
pub fn string_end(text: &str, open: usize) -> Option<usize> {
    let quote = text.get(open..)?.chars().next()?;
    if !is_quote(quote) {
        return None;
    }
    let mut escaped = false;
    for (i, ch) in text[open + quote.len_utf8()..].char_indices() {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            return Some(open + quote.len_utf8() + i);
        }
    }
    None
}
