//! A lexer that tokenizes the template source into distinct chunks so that
//! the parser doesn't have to operate on raw text.
//!
//! Lexing is total: malformed input becomes [`TokenKind::Error`] tokens in
//! the stream and the failure decision is deferred to the parser. The
//! stream always ends with exactly one [`TokenKind::Eof`] token.

/// The left action delimiter.
const LEFT_DELIM: &str = "{{";

/// The right action delimiter.
const RIGHT_DELIM: &str = "}}";

/// The unit yielded by the lexer.
///
/// Tokens own their text because an [`Error`][TokenKind::Error] token
/// carries a message that is not a slice of the source, and because a left
/// trim marker rewrites the preceding text token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The kind of the token.
    pub kind: TokenKind,
    /// The byte offset of the first character of the token.
    pub pos: usize,
    /// The raw text of the token, or the message for an error token.
    pub text: String,
    /// The 1-based line number where the token starts.
    pub line: usize,
}

/// The kind of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Raw text outside of any action.
    Text,
    /// `{{`, or `{{-` with a trim marker.
    LeftDelim,
    /// `}}`, or `-}}` with a trim marker.
    RightDelim,
    /// An identifier, e.g. `len`.
    Ident,
    /// A dotted field chain, e.g. `.User.Name`.
    Field,
    /// A bare `.`.
    Dot,
    /// A `$`-prefixed variable, e.g. `$x`.
    Variable,
    /// A number literal, e.g. `3.14` or `1_000`.
    Number,
    /// A double quoted string literal, including the quotes.
    Str,
    /// A backtick delimited raw string, including the backticks.
    RawStr,
    /// `true` or `false`.
    Bool,
    /// The `if` keyword.
    If,
    /// The `else` keyword.
    Else,
    /// The `end` keyword.
    End,
    /// The `range` keyword.
    Range,
    /// The `with` keyword.
    With,
    /// The `nil` keyword.
    Nil,
    /// The `define` keyword.
    Define,
    /// The `block` keyword.
    Block,
    /// The `template` keyword.
    Template,
    /// `|`
    Pipe,
    /// `,`
    Comma,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `:=`
    ColonEquals,
    /// A run of whitespace inside an action.
    Space,
    /// A lexing error; the message is carried in the token text.
    Error,
    /// The end of the source, always the final token.
    Eof,
}

/// Tokenize a template source.
///
/// This function is total: it never fails, and unrecoverable conditions
/// (an unclosed action, an unterminated comment, an unexpected character)
/// are embedded in the stream as [`TokenKind::Error`] tokens.
///
/// ```
/// use gotmpl::{lex, TokenKind};
///
/// let tokens = lex("Hello {{ .Name }}!");
/// let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
/// assert_eq!(
///     kinds,
///     [
///         TokenKind::Text,
///         TokenKind::LeftDelim,
///         TokenKind::Field,
///         TokenKind::Space,
///         TokenKind::RightDelim,
///         TokenKind::Text,
///         TokenKind::Eof,
///     ]
/// );
/// ```
pub fn lex(source: &str) -> Vec<Token> {
    Lexer::new(source).lex()
}

struct Lexer<'source> {
    source: &'source str,
    tokens: Vec<Token>,
    cursor: usize,
    line: usize,
}

impl<'source> Lexer<'source> {
    fn new(source: &'source str) -> Self {
        Self {
            source,
            tokens: Vec::new(),
            cursor: 0,
            line: 1,
        }
    }

    /// Push a token and advance the line counter past any newlines in its
    /// text.
    fn push(&mut self, kind: TokenKind, pos: usize, text: &str) {
        let line = self.line;
        self.line += count_newlines(text);
        self.tokens.push(Token {
            kind,
            pos,
            text: text.to_owned(),
            line,
        });
    }

    fn lex(mut self) -> Vec<Token> {
        let source = self.source;

        while self.cursor < source.len() {
            // Find the next action. Everything before it is raw text.
            let left = match source[self.cursor..].find(LEFT_DELIM) {
                Some(i) => self.cursor + i,
                None => {
                    self.push(TokenKind::Text, self.cursor, &source[self.cursor..]);
                    self.cursor = source.len();
                    break;
                }
            };
            if left > self.cursor {
                self.push(TokenKind::Text, self.cursor, &source[self.cursor..left]);
            }

            // `{{-` requests that trailing whitespace be stripped from the
            // preceding text, rewinding the line counter for any stripped
            // newlines.
            let left_trim = source[left..].starts_with("{{-");
            let open = if left_trim { "{{-" } else { LEFT_DELIM };
            if left_trim {
                self.trim_previous_text();
            }

            self.push(TokenKind::LeftDelim, left, open);
            self.cursor = left + open.len();

            let right = match source[self.cursor..].find(RIGHT_DELIM) {
                Some(i) => self.cursor + i,
                None => {
                    self.push(TokenKind::Error, self.cursor, "unclosed action");
                    break;
                }
            };

            let right_trim = right > self.cursor && source.as_bytes()[right - 1] == b'-';
            let close = if right_trim { "-}}" } else { RIGHT_DELIM };

            // Extract the action segment, dropping the trim marker and any
            // leading whitespace. Token offsets inside the action are
            // relative to the fully trimmed segment.
            let inner_start = self.cursor;
            let original = &source[inner_start..right];
            let mut inner = original;
            if right_trim {
                inner = &inner[..inner.len() - 1];
            }
            let stripped = inner.trim_start();
            self.line += count_newlines(&inner[..inner.len() - stripped.len()]);
            let inner = stripped;
            let start = inner_start + (original.len() - inner.len());

            // A comment-only action emits no tokens and must not advance
            // the line counter.
            let action = lex_action(inner, start, self.line);
            if !action.is_empty() {
                self.line += count_newlines(inner);
            }
            self.tokens.extend(action);

            self.push(TokenKind::RightDelim, right, close);
            self.cursor = right + RIGHT_DELIM.len();

            // `-}}` consumes following whitespace up to and including a
            // single newline.
            if right_trim {
                let bytes = source.as_bytes();
                while self.cursor < bytes.len()
                    && matches!(bytes[self.cursor], b'\t' | 0x0b | 0x0c | b'\r' | b' ')
                {
                    self.cursor += 1;
                }
                if self.cursor < bytes.len() && bytes[self.cursor] == b'\n' {
                    self.cursor += 1;
                }
            }
        }

        self.push(TokenKind::Eof, self.cursor, "");
        self.tokens
    }

    /// Strip trailing whitespace from the preceding text token for a `{{-`
    /// marker.
    fn trim_previous_text(&mut self) {
        let previous = match self.tokens.last_mut() {
            Some(token) if token.kind == TokenKind::Text => token,
            _ => return,
        };
        let trimmed = previous.text.trim_end().len();
        if trimmed == previous.text.len() {
            return;
        }
        let removed = count_newlines(&previous.text[trimmed..]);
        previous.text.truncate(trimmed);
        if removed > 0 {
            self.line = self.line.saturating_sub(removed).max(1);
        }
    }
}

/// Lex the inner content of an action into tokens.
///
/// `start` is the byte offset of the segment in the original template and
/// `line` the line number it starts on; the caller has already stripped
/// leading whitespace from the segment.
fn lex_action(segment: &str, start: usize, line: usize) -> Vec<Token> {
    let mut tokens = Vec::new();

    let push = |tokens: &mut Vec<Token>, kind: TokenKind, rel: usize, text: &str| {
        tokens.push(Token {
            kind,
            pos: start + rel,
            text: text.to_owned(),
            line: line + count_newlines(&segment[..rel]),
        });
    };

    // A comment consumes the entire action and emits nothing. Anything
    // after the closing `*/` is ignored.
    if segment.starts_with("/*") {
        if !segment[2..].contains("*/") {
            push(&mut tokens, TokenKind::Error, 0, "unterminated comment");
        }
        return tokens;
    }

    let mut cursor = 0;
    while cursor < segment.len() {
        let c = match segment[cursor..].chars().next() {
            Some(c) => c,
            None => break,
        };

        // Runs of whitespace collapse into a single space token.
        if c.is_whitespace() {
            let run = cursor;
            cursor = scan_while(segment, cursor, char::is_whitespace);
            push(&mut tokens, TokenKind::Space, run, &segment[run..cursor]);
        }
        // A dot starting an identifier opens a field chain spanning the
        // whole dotted path, otherwise it is the bare dot.
        else if c == '.' {
            if next_char(segment, cursor + 1).map_or(false, is_ident_start) {
                let field = cursor;
                cursor += 1;
                loop {
                    if !next_char(segment, cursor).map_or(false, is_ident_start) {
                        break;
                    }
                    cursor = scan_while(segment, cursor + 1, is_ident);
                    if segment[cursor..].starts_with('.')
                        && next_char(segment, cursor + 1).map_or(false, is_ident_start)
                    {
                        cursor += 1;
                        continue;
                    }
                    break;
                }
                push(&mut tokens, TokenKind::Field, field, &segment[field..cursor]);
            } else {
                push(&mut tokens, TokenKind::Dot, cursor, ".");
                cursor += 1;
            }
        }
        // An identifier run, classified as a keyword if it matches the
        // fixed keyword table.
        else if is_ident_start(c) {
            let ident = cursor;
            cursor = scan_while(segment, cursor + 1, is_ident);
            let text = &segment[ident..cursor];
            let kind = keyword(text).unwrap_or(TokenKind::Ident);
            push(&mut tokens, kind, ident, text);
        }
        // A `$`-prefixed variable name.
        else if c == '$' {
            let var = cursor;
            cursor = scan_while(segment, cursor + 1, is_ident);
            push(&mut tokens, TokenKind::Variable, var, &segment[var..cursor]);
        }
        // A backtick delimited raw string, no escaping, may span newlines.
        else if c == '`' {
            let raw = cursor;
            cursor = scan_while(segment, cursor + 1, |c| c != '`');
            if cursor < segment.len() {
                cursor += 1;
            }
            push(&mut tokens, TokenKind::RawStr, raw, &segment[raw..cursor]);
        } else if c == '|' {
            push(&mut tokens, TokenKind::Pipe, cursor, "|");
            cursor += 1;
        } else if c == ',' {
            push(&mut tokens, TokenKind::Comma, cursor, ",");
            cursor += 1;
        } else if c == '(' {
            push(&mut tokens, TokenKind::LeftParen, cursor, "(");
            cursor += 1;
        } else if c == ')' {
            push(&mut tokens, TokenKind::RightParen, cursor, ")");
            cursor += 1;
        } else if c == ':' && segment[cursor + 1..].starts_with('=') {
            push(&mut tokens, TokenKind::ColonEquals, cursor, ":=");
            cursor += 2;
        }
        // A digit run, permitting `_` and `.` inside.
        else if c.is_ascii_digit() {
            let number = cursor;
            cursor = scan_while(segment, cursor + 1, is_number);
            push(&mut tokens, TokenKind::Number, number, &segment[number..cursor]);
        }
        // A double quoted string with backslash escaping.
        else if c == '"' {
            let string = cursor;
            cursor += 1;
            let mut escaped = false;
            while let Some(c) = next_char(segment, cursor) {
                if !escaped && c == '"' {
                    cursor += 1;
                    break;
                }
                escaped = !escaped && c == '\\';
                cursor += c.len_utf8();
            }
            push(&mut tokens, TokenKind::Str, string, &segment[string..cursor]);
        }
        // Anything else is an error token; scanning continues so adjacent
        // unrecognized characters each produce their own error.
        else {
            push(
                &mut tokens,
                TokenKind::Error,
                cursor,
                &format!("unexpected character: {c}"),
            );
            cursor += c.len_utf8();
        }
    }

    tokens
}

/// Mapping of keyword strings to token kinds.
fn keyword(ident: &str) -> Option<TokenKind> {
    let kind = match ident {
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "end" => TokenKind::End,
        "range" => TokenKind::Range,
        "with" => TokenKind::With,
        "nil" => TokenKind::Nil,
        "define" => TokenKind::Define,
        "block" => TokenKind::Block,
        "template" => TokenKind::Template,
        "true" | "false" => TokenKind::Bool,
        _ => return None,
    };
    Some(kind)
}

/// Advance `cursor` while the predicate matches, returning the new cursor.
fn scan_while(s: &str, mut cursor: usize, pred: impl Fn(char) -> bool) -> usize {
    while let Some(c) = next_char(s, cursor) {
        if !pred(c) {
            break;
        }
        cursor += c.len_utf8();
    }
    cursor
}

fn next_char(s: &str, i: usize) -> Option<char> {
    s.get(i..).and_then(|s| s.chars().next())
}

fn count_newlines(s: &str) -> usize {
    s.bytes().filter(|&b| b == b'\n').count()
}

fn is_ident_start(c: char) -> bool {
    matches!(c, 'A'..='Z' | 'a'..='z' | '_')
}

fn is_ident(c: char) -> bool {
    c.is_ascii_digit() || is_ident_start(c)
}

fn is_number(c: char) -> bool {
    matches!(c, '0'..='9' | '_' | '.')
}
