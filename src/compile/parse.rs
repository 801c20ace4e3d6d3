//! A parser that constructs an AST from a lexed token stream.
//!
//! The parser is a cursor over the token slice with explicit save/restore
//! backtracking: after consuming a `{{` inside a branch body it must peek
//! past the leading space to decide between `end`, `else`, a nested block
//! and a plain action, and rewinds the cursor for the latter two.

use crate::compile::lex::{Token, TokenKind};
use crate::error::{Error, Result};
use crate::types::ast;

const BRANCH_KEYWORDS: &[TokenKind] = &[TokenKind::If, TokenKind::Range, TokenKind::With];
const TEMPLATE_KEYWORDS: &[TokenKind] = &[TokenKind::Define, TokenKind::Block, TokenKind::Template];

/// Parse a token stream into an AST.
///
/// Unlike lexing, parsing is fallible: a malformed stream aborts with a
/// syntax error and never yields a partial tree.
///
/// ```
/// let tokens = gotmpl::lex("{{ if .Cond }}True{{ else }}False{{ end }}");
/// let tree = gotmpl::parse(&tokens)?;
/// assert_eq!(tree.nodes.len(), 1);
/// # Ok::<(), gotmpl::Error>(())
/// ```
pub fn parse(tokens: &[Token]) -> Result<ast::List> {
    Parser::new(tokens).parse_list(true)
}

/// The context of the pipe being parsed. Two-variable declarations are
/// only legal in a `range` pipe, which can only be enforced after the whole
/// pipe has been scanned.
#[derive(Clone, Copy, PartialEq, Eq)]
enum PipeContext {
    Generic,
    Range,
}

struct Parser<'tokens> {
    tokens: &'tokens [Token],
    index: usize,
}

impl<'tokens> Parser<'tokens> {
    fn new(tokens: &'tokens [Token]) -> Self {
        Self { tokens, index: 0 }
    }

    /// Peek at the next token without consuming it. Running out of tokens
    /// means we have overread the stream, which is an error.
    fn peek(&self) -> Result<&'tokens Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Result<&'tokens Token> {
        self.tokens
            .get(self.index + offset)
            .ok_or_else(|| Error::syntax("unexpected end of input"))
    }

    /// Returns the next token if it matches one of the expected kinds.
    fn peek_when(&self, expected: &[TokenKind]) -> Result<Option<&'tokens Token>> {
        let token = self.peek()?;
        if expected.contains(&token.kind) {
            Ok(Some(token))
        } else {
            Ok(None)
        }
    }

    /// Consume and return the next token.
    fn consume(&mut self) -> Result<&'tokens Token> {
        let token = self
            .tokens
            .get(self.index)
            .ok_or_else(|| Error::syntax("unexpected end of input"))?;
        self.index += 1;
        Ok(token)
    }

    /// Consume the next token, which must be one of the expected kinds.
    fn expect(&mut self, expected: &[TokenKind]) -> Result<&'tokens Token> {
        let token = self.consume()?;
        if !expected.contains(&token.kind) {
            return Err(Error::syntax(format!(
                "unexpected token \"{}\" at {}:{}",
                token.text, token.line, token.pos
            )));
        }
        Ok(token)
    }

    /// Consume the next token only if it matches one of the expected kinds.
    fn consume_when(&mut self, expected: &[TokenKind]) -> Result<Option<&'tokens Token>> {
        let token = self.peek()?;
        if expected.contains(&token.kind) {
            self.index += 1;
            Ok(Some(token))
        } else {
            Ok(None)
        }
    }

    /// Consume tokens while they match the given kind.
    fn consume_while(&mut self, kind: TokenKind) -> Result<()> {
        while self.peek()?.kind == kind {
            self.index += 1;
        }
        Ok(())
    }

    /// Consume tokens up to and including the next token of the given kind.
    fn consume_until(&mut self, kind: TokenKind) -> Result<()> {
        while self.peek()?.kind != kind {
            self.index += 1;
        }
        self.index += 1;
        Ok(())
    }

    fn is_eof(&self) -> Result<bool> {
        Ok(self.peek()?.kind == TokenKind::Eof)
    }

    /// Parse a list of nodes. When `ignore_end` is false an `{{ end }}`
    /// action closes the list; the root list ignores `end`.
    fn parse_list(&mut self, ignore_end: bool) -> Result<ast::List> {
        let pos = self.peek()?.pos;
        let mut nodes = Vec::new();

        while !self.is_eof()? {
            if let Some(token) = self.consume_when(&[TokenKind::Text])? {
                nodes.push(ast::Node::Text(ast::Text {
                    pos: token.pos,
                    text: token.text.clone(),
                }));
                continue;
            }
            if self.consume_when(&[TokenKind::LeftDelim])?.is_some() {
                self.consume_while(TokenKind::Space)?;
                if !ignore_end && self.consume_when(&[TokenKind::End])?.is_some() {
                    self.consume_until(TokenKind::RightDelim)?;
                    break;
                }
                nodes.push(self.parse_delimited()?);
                continue;
            }
            let token = self.peek()?;
            return Err(Error::syntax(format!(
                "unexpected token \"{}\" at {}:{}",
                token.text, token.line, token.pos
            )));
        }

        Ok(ast::List { pos, nodes })
    }

    /// Dispatch on the token following a `{{` to a branch, a template node
    /// or a plain action.
    fn parse_delimited(&mut self) -> Result<ast::Node> {
        if self.peek_when(BRANCH_KEYWORDS)?.is_some() {
            self.parse_branch()
        } else if self.peek_when(TEMPLATE_KEYWORDS)?.is_some() {
            self.parse_template_node()
        } else {
            self.parse_action()
        }
    }

    fn parse_action(&mut self) -> Result<ast::Node> {
        let pos = self.peek()?.pos;
        let pipe = self.parse_pipe(PipeContext::Generic)?;
        self.consume_until(TokenKind::RightDelim)?;
        Ok(ast::Node::Action(ast::Action { pos, pipe }))
    }

    /// Parse the start of a pipe beginning with a variable. This is either
    /// a declaration (`$x := ...`, or `$k, $v := ...` in a range), a chain
    /// (`$user.Name`) or ordinary variable references; the grammar is
    /// ambiguous until the `:=` is observed, or isn't.
    fn parse_variable_declaration(&mut self) -> Result<(Vec<ast::Node>, Vec<ast::Variable>)> {
        let pos = self.peek()?.pos;
        let variable = self.expect(&[TokenKind::Variable])?;
        self.consume_while(TokenKind::Space)?;

        if let Some(field) = self.consume_when(&[TokenKind::Field])? {
            let base = ast::Node::Variable(ast::Variable {
                pos: variable.pos,
                name: variable.text.clone(),
            });
            let chain = ast::Node::Chain(ast::Chain {
                pos,
                base: Box::new(base),
                fields: split_fields(&field.text),
            });
            return Ok((vec![chain], Vec::new()));
        }

        // A possible second variable for a two-value declaration.
        let mut second = None;
        if self.peek()?.kind == TokenKind::Comma {
            self.consume()?;
            self.consume_while(TokenKind::Space)?;
            if self.peek()?.kind == TokenKind::Variable {
                second = Some(self.consume()?);
                self.consume_while(TokenKind::Space)?;
            }
        }

        self.consume_while(TokenKind::Space)?;
        if self.peek()?.kind == TokenKind::ColonEquals {
            self.consume()?;
            let mut declarations = vec![ast::Variable {
                pos: variable.pos,
                name: variable.text.clone(),
            }];
            if let Some(second) = second {
                declarations.push(ast::Variable {
                    pos: second.pos,
                    name: second.text.clone(),
                });
            }
            self.consume_while(TokenKind::Space)?;
            return Ok((Vec::new(), declarations));
        }

        // Not a declaration, the consumed variables are arguments.
        let mut nodes = vec![ast::Node::Variable(ast::Variable {
            pos: variable.pos,
            name: variable.text.clone(),
        })];
        if let Some(second) = second {
            nodes.push(ast::Node::Variable(ast::Variable {
                pos: second.pos,
                name: second.text.clone(),
            }));
        }
        Ok((nodes, Vec::new()))
    }

    fn parse_pipe(&mut self, context: PipeContext) -> Result<ast::Pipe> {
        let pipe_pos = self.peek()?.pos;
        let mut command_pos = pipe_pos;
        let mut declarations: Vec<ast::Variable> = Vec::new();
        let mut commands: Vec<ast::Command> = Vec::new();
        let mut args: Vec<ast::Node> = Vec::new();

        while self.peek()?.kind != TokenKind::RightDelim {
            let token = self.peek()?;
            match token.kind {
                // A variable at the very start of the pipe is speculatively
                // parsed as a declaration.
                TokenKind::Variable if commands.is_empty() && args.is_empty() => {
                    let (nodes, declared) = self.parse_variable_declaration()?;
                    args.extend(nodes);
                    declarations.extend(declared);
                }

                // An identifier or variable immediately followed by a field
                // forms a chain, e.g. `$user.Name`.
                TokenKind::Ident | TokenKind::Variable
                    if self.peek_at(1)?.kind == TokenKind::Field =>
                {
                    let base_token = self.consume()?;
                    let field_token = self.consume()?;
                    let base = if base_token.kind == TokenKind::Ident {
                        ast::Node::Identifier(ast::Identifier {
                            pos: base_token.pos,
                            name: base_token.text.clone(),
                        })
                    } else {
                        ast::Node::Variable(ast::Variable {
                            pos: base_token.pos,
                            name: base_token.text.clone(),
                        })
                    };
                    args.push(ast::Node::Chain(ast::Chain {
                        pos: base_token.pos,
                        base: Box::new(base),
                        fields: split_fields(&field_token.text),
                    }));
                }

                // A bare field chain is rooted at dot, e.g. `.User.Name`.
                TokenKind::Field => {
                    let token = self.consume()?;
                    args.push(ast::Node::Chain(ast::Chain {
                        pos: token.pos,
                        base: Box::new(ast::Node::Dot(ast::Dot { pos: token.pos })),
                        fields: split_fields(&token.text),
                    }));
                }

                TokenKind::Space => {
                    self.consume()?;
                }

                // Each `|` flushes the accumulated arguments into a new
                // command, chaining forward.
                TokenKind::Pipe => {
                    self.consume()?;
                    self.consume_while(TokenKind::Space)?;
                    if !args.is_empty() {
                        commands.push(ast::Command {
                            pos: command_pos,
                            args: std::mem::take(&mut args),
                        });
                        command_pos = self.peek()?.pos;
                    }
                }

                TokenKind::Ident => {
                    let token = self.consume()?;
                    args.push(ast::Node::Identifier(ast::Identifier {
                        pos: token.pos,
                        name: token.text.clone(),
                    }));
                }
                TokenKind::Variable => {
                    let token = self.consume()?;
                    args.push(ast::Node::Variable(ast::Variable {
                        pos: token.pos,
                        name: token.text.clone(),
                    }));
                }
                TokenKind::Dot => {
                    let token = self.consume()?;
                    args.push(ast::Node::Dot(ast::Dot { pos: token.pos }));
                }
                TokenKind::Str => {
                    let token = self.consume()?;
                    args.push(ast::Node::Str(ast::Str {
                        pos: token.pos,
                        value: parse_quoted(&token.text),
                    }));
                }
                TokenKind::RawStr => {
                    let token = self.consume()?;
                    args.push(ast::Node::Str(ast::Str {
                        pos: token.pos,
                        value: parse_raw(&token.text),
                    }));
                }
                TokenKind::Number => {
                    let token = self.consume()?;
                    let value = token.text.replace('_', "").parse::<f64>().map_err(|_| {
                        Error::syntax(format!(
                            "invalid number literal \"{}\" at {}:{}",
                            token.text, token.line, token.pos
                        ))
                    })?;
                    args.push(ast::Node::Number(ast::Number {
                        pos: token.pos,
                        text: token.text.clone(),
                        value,
                    }));
                }
                TokenKind::Bool => {
                    let token = self.consume()?;
                    args.push(ast::Node::Bool(ast::Bool {
                        pos: token.pos,
                        value: token.text == "true",
                    }));
                }
                TokenKind::Nil => {
                    let token = self.consume()?;
                    args.push(ast::Node::Nil(ast::Nil { pos: token.pos }));
                }

                _ => {
                    return Err(Error::syntax(format!(
                        "unknown token \"{}\" in pipe at {}:{}",
                        token.text, token.line, token.pos
                    )));
                }
            }
        }

        if !args.is_empty() {
            commands.push(ast::Command {
                pos: command_pos,
                args,
            });
        }

        if context != PipeContext::Range && declarations.len() > 1 {
            return Err(Error::syntax("unexpected comma in declaration"));
        }

        Ok(ast::Pipe {
            pos: pipe_pos,
            declarations,
            commands,
        })
    }

    fn parse_branch(&mut self) -> Result<ast::Node> {
        self.consume_while(TokenKind::Space)?;
        let keyword = self.expect(BRANCH_KEYWORDS)?;
        let kind = match keyword.kind {
            TokenKind::If => ast::BranchKind::If,
            TokenKind::Range => ast::BranchKind::Range,
            _ => ast::BranchKind::With,
        };
        let pos = keyword.pos;

        // The pipe following the keyword holds the condition or the value
        // to range/with over.
        let context = match kind {
            ast::BranchKind::Range => PipeContext::Range,
            _ => PipeContext::Generic,
        };
        let pipe = self.parse_pipe(context)?;
        self.consume_until(TokenKind::RightDelim)?;

        // Parse the body until the matching `{{ else }}` or `{{ end }}`.
        let mut nodes = Vec::new();
        while !self.is_eof()? {
            if let Some(token) = self.consume_when(&[TokenKind::Text])? {
                nodes.push(ast::Node::Text(ast::Text {
                    pos: token.pos,
                    text: token.text.clone(),
                }));
                continue;
            }
            if self.consume_when(&[TokenKind::LeftDelim])?.is_some() {
                let save = self.index;
                self.consume_while(TokenKind::Space)?;

                if self.consume_when(&[TokenKind::End])?.is_some() {
                    self.consume_until(TokenKind::RightDelim)?;
                    return Ok(ast::Node::Branch(ast::Branch {
                        pos,
                        kind,
                        pipe,
                        list: ast::List { pos, nodes },
                        else_list: None,
                    }));
                }

                if self.consume_when(&[TokenKind::Else])?.is_some() {
                    let else_nodes = self.parse_branch_else()?;
                    return Ok(ast::Node::Branch(ast::Branch {
                        pos,
                        kind,
                        pipe,
                        list: ast::List { pos, nodes },
                        else_list: Some(ast::List {
                            pos,
                            nodes: else_nodes,
                        }),
                    }));
                }

                self.index = save;
                nodes.push(self.parse_delimited()?);
                continue;
            }
            return Err(Error::syntax("unterminated branch"));
        }

        Err(Error::syntax("unexpected end of input while parsing branch"))
    }

    /// Parse the nodes following an `{{ else }}`: either a fresh branch for
    /// `else if`, or a plain body up to the matching `end`.
    fn parse_branch_else(&mut self) -> Result<Vec<ast::Node>> {
        self.consume_while(TokenKind::Space)?;
        if self.peek_when(BRANCH_KEYWORDS)?.is_some() {
            return Ok(vec![self.parse_branch()?]);
        }
        self.consume_until(TokenKind::RightDelim)?;
        Ok(self.parse_list(false)?.nodes)
    }

    fn parse_template_node(&mut self) -> Result<ast::Node> {
        let keyword_token = self.expect(TEMPLATE_KEYWORDS)?;
        let keyword = match keyword_token.kind {
            TokenKind::Define => ast::TemplateKeyword::Define,
            TokenKind::Block => ast::TemplateKeyword::Block,
            _ => ast::TemplateKeyword::Template,
        };

        // The keyword is followed by a mandatory string literal name.
        self.consume_while(TokenKind::Space)?;
        let name_token = self.expect(&[TokenKind::Str])?;
        let name = parse_quoted(&name_token.text);
        self.consume_while(TokenKind::Space)?;

        // `define` takes no pipeline; `block` and `template` take an
        // optional one, defaulting to the empty pipe meaning "reuse the
        // current dot".
        let pipe = if keyword != ast::TemplateKeyword::Define
            && self.peek()?.kind != TokenKind::RightDelim
        {
            self.parse_pipe(PipeContext::Generic)?
        } else {
            ast::Pipe {
                pos: name_token.pos,
                declarations: Vec::new(),
                commands: Vec::new(),
            }
        };
        self.consume_until(TokenKind::RightDelim)?;

        // `define` and `block` carry a body up to the matching `end`; an
        // invocation has none.
        let list = match keyword {
            ast::TemplateKeyword::Template => None,
            _ => Some(self.parse_list(false)?),
        };

        Ok(ast::Node::Template(ast::Template {
            pos: keyword_token.pos,
            keyword,
            name,
            pipe,
            list,
        }))
    }
}

/// Split a field token like `.User.Name` into its identifiers.
fn split_fields(text: &str) -> Vec<String> {
    text.split('.')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Strip the surrounding quotes from a string literal and decode the
/// conventional escapes. Unknown escapes are kept verbatim so the parser
/// stays total over lexed strings.
fn parse_quoted(raw: &str) -> String {
    let inner = raw.strip_prefix('"').unwrap_or(raw);
    let inner = inner.strip_suffix('"').unwrap_or(inner);
    if !inner.contains('\\') {
        return inner.to_owned();
    }
    let mut string = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            string.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => string.push('\n'),
            Some('r') => string.push('\r'),
            Some('t') => string.push('\t'),
            Some('\\') => string.push('\\'),
            Some('"') => string.push('"'),
            Some(c) => {
                string.push('\\');
                string.push(c);
            }
            None => string.push('\\'),
        }
    }
    string
}

/// Strip the surrounding backticks from a raw string literal.
fn parse_raw(raw: &str) -> String {
    let inner = raw.strip_prefix('`').unwrap_or(raw);
    inner.strip_suffix('`').unwrap_or(inner).to_owned()
}
