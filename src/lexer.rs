use thiserror::Error;

use crate::token::{Span, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexerState {
    LineBegin,
    TokenStart,
}

enum StepOutcome<'a> {
    Emit(Token<'a>),
    Continue,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LexError {
    #[error("Numbers cannot start with 0 unless they are just 0 (line {line}, column {column})")]
    LeadingZero { line: usize, column: usize },
    #[error("Invalid integer literal '{literal}' (line {line}, column {column})")]
    InvalidIntegerLiteral {
        literal: String,
        line: usize,
        column: usize,
    },
    #[error("Unexpected character '{character}' (line {line}, column {column})")]
    UnexpectedCharacter {
        character: char,
        line: usize,
        column: usize,
    },
    #[error("Unknown operator '{character}' (line {line}, column {column})")]
    UnknownOperator {
        character: char,
        line: usize,
        column: usize,
    },
    #[error("IndentationError: inconsistent use of tabs and spaces in indentation (line {line})")]
    InconsistentIndentation { line: usize },
    #[error("IndentationError: unindent does not match any outer indentation level (line {line})")]
    UnindentMismatch { line: usize },
    #[error("Lexer invariant violated: {message}")]
    InvariantViolation { message: &'static str },
}

pub type LexResult<T> = Result<T, LexError>;

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    indent_stack: Vec<usize>,
    indent_style: Option<char>,
    pending_tokens: Vec<Token<'a>>,
    state: LexerState,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 1,
            indent_stack: vec![0],
            indent_style: None,
            pending_tokens: Vec::new(),
            state: LexerState::LineBegin,
            done: false,
        }
    }

    pub fn next_token(&mut self) -> LexResult<Token<'a>> {
        loop {
            if let Some(token) = self.pending_tokens.pop() {
                return Ok(token);
            }

            match self.step_state()? {
                StepOutcome::Emit(token) => return Ok(token),
                StepOutcome::Continue => continue,
            }
        }
    }

    fn step_state(&mut self) -> LexResult<StepOutcome<'a>> {
        match self.state {
            LexerState::LineBegin => {
                // Compute the line's indentation level and produce
                // Indent/Dedent tokens against the stack as needed.
                let Some(level) = self.scan_indentation()? else {
                    // Whitespace-only line: no indentation tokens.
                    self.state = LexerState::TokenStart;
                    return Ok(StepOutcome::Continue);
                };
                let current = self.current_indent()?;
                let span = self.marker_span();

                if level > current {
                    self.indent_stack.push(level);
                    self.state = LexerState::TokenStart;
                    return Ok(StepOutcome::Emit(Token::new(TokenKind::Indent, span)));
                }

                if level < current {
                    while let Some(&top) = self.indent_stack.last() {
                        if top > level {
                            self.indent_stack.pop();
                            self.pending_tokens.push(Token::new(TokenKind::Dedent, span));
                        } else {
                            break;
                        }
                    }
                    if self.current_indent()? != level {
                        return Err(LexError::UnindentMismatch { line: self.line });
                    }
                    self.state = LexerState::TokenStart;
                    return Ok(StepOutcome::Continue);
                }

                self.state = LexerState::TokenStart;
                Ok(StepOutcome::Continue)
            }
            LexerState::TokenStart => {
                self.skip_inline_spaces();

                if self.peek_char().is_none() {
                    return self.handle_eof();
                }

                Ok(StepOutcome::Emit(self.read_token_from_current_position()?))
            }
        }
    }

    fn handle_eof(&mut self) -> LexResult<StepOutcome<'a>> {
        // At physical EOF every open block is closed before the end marker.
        self.flush_eof_dedents();
        if !self.pending_tokens.is_empty() {
            return Ok(StepOutcome::Continue);
        }

        Ok(StepOutcome::Emit(Token::new(
            TokenKind::EndMarker,
            self.marker_span(),
        )))
    }

    /// Consumes leading tabs/spaces and returns the indentation level, or
    /// `None` for a whitespace-only line. Tabs count one level each, spaces
    /// two per level; the first indented line fixes the file's style.
    fn scan_indentation(&mut self) -> LexResult<Option<usize>> {
        let line = self.line;
        let mut style: Option<char> = None;
        let mut mixed = false;
        let mut count = 0usize;

        while let Some(c) = self.peek_char() {
            if c != ' ' && c != '\t' {
                break;
            }
            match style {
                None => style = Some(c),
                Some(first) if first != c => mixed = true,
                Some(_) => {}
            }
            count += 1;
            self.consume_char();
        }

        // Blank lines do not change indentation depth.
        if matches!(self.peek_char(), Some('\n') | None) {
            return Ok(None);
        }

        if mixed {
            return Err(LexError::InconsistentIndentation { line });
        }
        if let Some(current) = style {
            match self.indent_style {
                None => self.indent_style = Some(current),
                Some(fixed) if fixed != current => {
                    return Err(LexError::InconsistentIndentation { line });
                }
                Some(_) => {}
            }
        }

        let level = match style {
            Some('\t') => count,
            Some(_) => {
                if count % 2 != 0 {
                    return Err(LexError::UnindentMismatch { line });
                }
                count / 2
            }
            None => 0,
        };
        Ok(Some(level))
    }

    fn skip_inline_spaces(&mut self) {
        self.consume_while(|c| c == ' ');
    }

    fn read_token_from_current_position(&mut self) -> LexResult<Token<'a>> {
        let (start, line, column) = (self.pos, self.line, self.column);
        let ch = self.peek_char().ok_or(LexError::InvariantViolation {
            message: "read_token_from_current_position called at EOF",
        })?;

        match ch {
            '\n' => {
                self.consume_char();
                self.state = LexerState::LineBegin;
                Ok(self.token(TokenKind::Newline, start, line, column))
            }
            '=' | '!' | '<' | '>' | '/' => self.read_operator(start, line, column),
            c if c.is_ascii_digit() => self.read_number(start, line, column),
            c if c.is_ascii_alphabetic() => Ok(self.read_identifier(start, line, column)),
            _ => {
                let kind = match ch {
                    '+' => Some(TokenKind::Plus),
                    '-' => Some(TokenKind::Minus),
                    '*' => Some(TokenKind::Star),
                    '(' => Some(TokenKind::LParen),
                    ')' => Some(TokenKind::RParen),
                    '[' => Some(TokenKind::LBracket),
                    ']' => Some(TokenKind::RBracket),
                    ':' => Some(TokenKind::Colon),
                    '.' => Some(TokenKind::Dot),
                    ',' => Some(TokenKind::Comma),
                    _ => None,
                };
                match kind {
                    Some(kind) => {
                        self.consume_char();
                        Ok(self.token(kind, start, line, column))
                    }
                    None => Err(LexError::UnexpectedCharacter {
                        character: ch,
                        line,
                        column,
                    }),
                }
            }
        }
    }

    fn read_operator(&mut self, start: usize, line: usize, column: usize) -> LexResult<Token<'a>> {
        let first = self.consume_char().ok_or(LexError::InvariantViolation {
            message: "read_operator called at EOF",
        })?;
        let second = self.peek_char();

        let kind = match (first, second) {
            ('=', Some('=')) => {
                self.consume_char();
                TokenKind::Equal
            }
            ('!', Some('=')) => {
                self.consume_char();
                TokenKind::NotEqual
            }
            ('<', Some('=')) => {
                self.consume_char();
                TokenKind::LessEqual
            }
            ('>', Some('=')) => {
                self.consume_char();
                TokenKind::GreaterEqual
            }
            ('/', Some('/')) => {
                self.consume_char();
                TokenKind::FloorDiv
            }
            ('=', _) => TokenKind::Assign,
            ('<', _) => TokenKind::Less,
            ('>', _) => TokenKind::Greater,
            _ => {
                return Err(LexError::UnknownOperator {
                    character: first,
                    line,
                    column,
                });
            }
        };
        Ok(self.token(kind, start, line, column))
    }

    fn read_number(&mut self, start: usize, line: usize, column: usize) -> LexResult<Token<'a>> {
        let first = self.consume_char().ok_or(LexError::InvariantViolation {
            message: "read_number called at EOF",
        })?;

        // A literal is `0` alone or `[1-9][0-9]*`.
        if first == '0' {
            if matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                return Err(LexError::LeadingZero { line, column });
            }
            return Ok(self.token(TokenKind::Integer(0), start, line, column));
        }

        self.consume_while(|c| c.is_ascii_digit());
        let literal = &self.input[start..self.pos];
        let value = literal
            .parse::<i64>()
            .map_err(|_| LexError::InvalidIntegerLiteral {
                literal: literal.to_string(),
                line,
                column,
            })?;
        Ok(self.token(TokenKind::Integer(value), start, line, column))
    }

    fn read_identifier(&mut self, start: usize, line: usize, column: usize) -> Token<'a> {
        self.consume_while(|c| c.is_ascii_alphanumeric());

        let ident = &self.input[start..self.pos];
        let kind = match ident {
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "list" => TokenKind::List,
            "print" => TokenKind::Print,
            "append" => TokenKind::Append,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            _ => TokenKind::Identifier(ident),
        };
        self.token(kind, start, line, column)
    }

    fn token(&self, kind: TokenKind<'a>, start: usize, line: usize, column: usize) -> Token<'a> {
        Token::new(
            kind,
            Span {
                start,
                end: self.pos,
                line,
                column,
            },
        )
    }

    /// Zero-width span for synthetic tokens (Indent, Dedent, EndMarker).
    fn marker_span(&self) -> Span {
        Span {
            start: self.pos,
            end: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    fn consume_while<P>(&mut self, keep_predicate: P) -> usize
    where
        P: Fn(char) -> bool,
    {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if !keep_predicate(c) {
                break;
            }
            self.consume_char();
        }
        self.pos - start
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn consume_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn current_indent(&self) -> LexResult<usize> {
        self.indent_stack
            .last()
            .copied()
            .ok_or(LexError::InvariantViolation {
                message: "indent stack is empty",
            })
    }

    fn flush_eof_dedents(&mut self) {
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            let span = self.marker_span();
            self.pending_tokens.push(Token::new(TokenKind::Dedent, span));
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = LexResult<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_token() {
            Ok(token) => {
                if matches!(token.kind, TokenKind::EndMarker) {
                    self.done = true;
                }
                Some(Ok(token))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

pub fn tokenize(input: &str) -> LexResult<Vec<Token<'_>>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let is_end = matches!(token.kind, TokenKind::EndMarker);
        tokens.push(token);
        if is_end {
            break;
        }
    }
    Ok(tokens)
}
