use std::{iter::Peekable, str::CharIndices};

use crate::token::{Keyword, Op, Span, Token, TokenKind};

mod error;

pub use error::LexError;

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            line: 1,
            column: 1,
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        loop {
            self.skip_whitespace();
            if self.at_comment() {
                self.skip_comment();
                continue;
            }
            break;
        }

        let (start_idx, ch) = match self.chars.peek() {
            Some(&(idx, c)) => (idx, c),
            None => return Ok(Token::new(TokenKind::Eof, self.span())),
        };
        let span = self.span();

        if ch.is_ascii_digit() {
            return Ok(self.read_number(start_idx, span));
        }
        if ch.is_ascii_alphabetic() || ch == '_' {
            return Ok(self.read_word(start_idx, span));
        }
        if ch == '"' || ch == '\'' {
            return Ok(self.read_string(ch, span));
        }
        if is_operator_char(ch) {
            return Ok(self.read_operator(ch, span));
        }
        if is_punctuation(ch) {
            self.advance_char();
            return Ok(Token::new(TokenKind::Symbol(ch), span));
        }

        Err(LexError {
            character: ch,
            line: span.line,
            column: span.column,
        })
    }

    fn span(&mut self) -> Span {
        Span {
            line: self.line,
            column: self.column,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.advance_char();
            } else {
                break;
            }
        }
    }

    fn at_comment(&mut self) -> bool {
        match self.chars.peek() {
            Some(&(_, '#')) => true,
            Some(&(idx, '/')) => self.input[idx..].starts_with("//"),
            _ => false,
        }
    }

    fn skip_comment(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.advance_char();
        }
    }

    /// Maximal munch of digits with at most one decimal point. There is no
    /// integer type; every number is a 64-bit float.
    fn read_number(&mut self, start: usize, span: Span) -> Token {
        let mut has_decimal = false;
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                self.advance_char();
            } else if c == '.' && !has_decimal {
                has_decimal = true;
                self.advance_char();
            } else {
                break;
            }
        }
        let text = &self.input[start..self.current_index()];
        // Digit runs with one optional '.' always parse as f64.
        let value = text.parse::<f64>().unwrap_or(f64::NAN);
        Token::new(TokenKind::Number(value), span)
    }

    fn read_word(&mut self, start: usize, span: Span) -> Token {
        self.advance_char();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance_char();
            } else {
                break;
            }
        }
        let word = &self.input[start..self.current_index()];
        let kind = match Keyword::from_word(word) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier(word.to_string()),
        };
        Token::new(kind, span)
    }

    /// Strings accept either quote character. An unterminated string consumes
    /// to end of input and still yields a token; the parser will report the
    /// missing continuation.
    fn read_string(&mut self, quote: char, span: Span) -> Token {
        self.advance_char();
        let mut text = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c == quote {
                self.advance_char();
                break;
            }
            if c == '\\' {
                self.advance_char();
                let escaped = match self.chars.peek() {
                    Some(&(_, e)) => e,
                    None => break,
                };
                match escaped {
                    'n' => text.push('\n'),
                    't' => text.push('\t'),
                    'r' => text.push('\r'),
                    '\\' => text.push('\\'),
                    e if e == quote => text.push(quote),
                    other => text.push(other),
                }
                self.advance_char();
            } else {
                text.push(c);
                self.advance_char();
            }
        }
        Token::new(TokenKind::Str(text), span)
    }

    fn read_operator(&mut self, first: char, span: Span) -> Token {
        self.advance_char();
        if let Some(&(_, second)) = self.chars.peek()
            && let Some(op) = Op::from_pair(first, second)
        {
            self.advance_char();
            return Token::new(TokenKind::Operator(op), span);
        }
        match Op::from_char(first) {
            Some(op) => Token::new(TokenKind::Operator(op), span),
            // '&' and '|' only exist doubled; a lone one is a symbol the
            // parser will reject with position info.
            None => Token::new(TokenKind::Symbol(first), span),
        }
    }

    fn advance_char(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, c)) = next {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        next
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.input.len())
    }
}

fn is_operator_char(ch: char) -> bool {
    matches!(ch, '+' | '-' | '*' | '/' | '%' | '=' | '<' | '>' | '!' | '&' | '|')
}

fn is_punctuation(ch: char) -> bool {
    matches!(ch, '(' | ')' | '{' | '}' | '[' | ']' | ',' | '.' | ';' | ':')
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let is_eof = matches!(token.kind, TokenKind::Eof);
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    Ok(tokens)
}
