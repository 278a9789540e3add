//! Delimited-text tokenizer
//!
//! Character-level state machine turning raw text into rows of fields.
//!
//! | State           | Input                       | Action                                |
//! |-----------------|-----------------------------|---------------------------------------|
//! | `InField`       | `"`                         | enter `InQuotedField`                 |
//! | `InField`       | delimiter                   | end field                             |
//! | `InField`       | `\r\n` or `\n`              | end field and row                     |
//! | `InQuotedField` | `""`                        | literal `"`, stay quoted              |
//! | `InQuotedField` | `"`                         | back to `InField`                     |
//! | either          | anything else               | append to field                       |
//!
//! A bare `\r` is an ordinary character. Rows are produced lazily and the
//! iterator cannot be restarted.
//!
//! **Leniency:** a quoted field still open at end of input is flushed as-is
//! instead of failing. The tokenizer logs it with `leniency =
//! "unterminated_quote"` and exposes it via [`Tokenizer::ended_in_open_quote`].

use std::iter::{FusedIterator, Peekable};
use std::str::Chars;
use tracing::warn;

/// One tokenized line of input
pub type Row = Vec<String>;

/// Default field delimiter
pub const DEFAULT_DELIMITER: char = ',';

const QUOTE: char = '"';
const BOM: char = '\u{feff}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    InField,
    InQuotedField,
}

/// Lazy, one-shot row iterator over delimited text
pub struct Tokenizer<'a> {
    chars: Peekable<Chars<'a>>,
    delimiter: char,
    state: State,
    rows_emitted: usize,
    open_quote_at_end: bool,
    finished: bool,
}

/// Tokenize comma-delimited text
pub fn tokenize(raw_text: &str) -> Tokenizer<'_> {
    Tokenizer::with_delimiter(raw_text, DEFAULT_DELIMITER)
}

impl<'a> Tokenizer<'a> {
    /// Tokenize with a custom single-character delimiter
    ///
    /// A leading UTF-8 byte order mark is skipped.
    pub fn with_delimiter(raw_text: &'a str, delimiter: char) -> Self {
        let text = raw_text.strip_prefix(BOM).unwrap_or(raw_text);
        Self {
            chars: text.chars().peekable(),
            delimiter,
            state: State::InField,
            rows_emitted: 0,
            open_quote_at_end: false,
            finished: false,
        }
    }

    /// True once exhausted if input ended inside a quoted field
    pub fn ended_in_open_quote(&self) -> bool {
        self.open_quote_at_end
    }

    /// Rows produced so far
    pub fn rows_emitted(&self) -> usize {
        self.rows_emitted
    }

    fn emit(&mut self, row: Row) -> Row {
        self.rows_emitted += 1;
        row
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        if self.finished {
            return None;
        }

        let mut row = Row::new();
        let mut field = String::new();
        let mut started = false;

        while let Some(c) = self.chars.next() {
            started = true;

            match self.state {
                State::InQuotedField => {
                    if c == QUOTE {
                        if self.chars.peek() == Some(&QUOTE) {
                            self.chars.next();
                            field.push(QUOTE);
                        } else {
                            self.state = State::InField;
                        }
                    } else {
                        field.push(c);
                    }
                }
                State::InField => match c {
                    QUOTE => self.state = State::InQuotedField,
                    c if c == self.delimiter => row.push(std::mem::take(&mut field)),
                    '\r' if self.chars.peek() == Some(&'\n') => {
                        self.chars.next();
                        row.push(field);
                        return Some(self.emit(row));
                    }
                    '\n' => {
                        row.push(field);
                        return Some(self.emit(row));
                    }
                    _ => field.push(c),
                },
            }
        }

        self.finished = true;

        if self.state == State::InQuotedField {
            self.open_quote_at_end = true;
            self.state = State::InField;
            warn!(
                leniency = "unterminated_quote",
                row = self.rows_emitted + 1,
                "Input ended inside a quoted field; flushing it as-is"
            );
        }

        if started {
            row.push(field);
            Some(self.emit(row))
        } else {
            None
        }
    }
}

impl FusedIterator for Tokenizer<'_> {}
