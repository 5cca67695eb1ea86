use thiserror::Error;

use crate::ast::{Position, Token, TokenKind};

/// Errors raised while splitting a query into tokens.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("unexpected character '{ch}' at {position}")]
    UnexpectedCharacter { ch: char, position: Position },

    #[error("unknown operator '{symbol}' at {position}")]
    UnknownOperator { symbol: String, position: Position },

    #[error("unterminated string starting at {position}")]
    UnterminatedString { position: Position },

    #[error("invalid escape sequence '\\{ch}' at {position}")]
    InvalidEscape { ch: char, position: Position },

    #[error("invalid number '{text}' at {position}")]
    InvalidNumber { text: String, position: Position },
}

impl LexError {
    pub fn position(&self) -> Position {
        match self {
            LexError::UnexpectedCharacter { position, .. }
            | LexError::UnknownOperator { position, .. }
            | LexError::UnterminatedString { position }
            | LexError::InvalidEscape { position, .. }
            | LexError::InvalidNumber { position, .. } => *position,
        }
    }
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    // `items.0.1` is two member steps, not a float
    after_dot: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            after_dot: false,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if self.current_char() == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.position += 1;
    }

    fn advance_by(&mut self, count: usize) {
        for _ in 0..count {
            self.advance();
        }
    }

    fn here(&self) -> Position {
        Position::new(self.position, self.line, self.column)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let start = self.here();
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    let escape_at = self.here();
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some('"') => result.push('"'),
                        Some('\'') => result.push('\''),
                        Some('\\') => result.push('\\'),
                        Some(ch) => {
                            return Err(LexError::InvalidEscape {
                                ch,
                                position: escape_at,
                            });
                        }
                        None => return Err(LexError::UnterminatedString { position: start }),
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::UnterminatedString { position: start })
    }

    fn read_number(&mut self) -> Result<TokenKind, LexError> {
        let start = self.here();
        let mut number = String::new();
        let mut is_float = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_float
                && !self.after_dot
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let invalid = |text: String| LexError::InvalidNumber {
            text,
            position: start,
        };
        if is_float {
            number
                .parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|_| invalid(number))
        } else {
            number
                .parse::<i64>()
                .map(TokenKind::Integer)
                .map_err(|_| invalid(number))
        }
    }

    fn unknown_operator(&self, symbol: impl Into<String>) -> LexError {
        LexError::UnknownOperator {
            symbol: symbol.into(),
            position: self.here(),
        }
    }

    /// Consumes `width` characters and yields `kind`.
    fn emit(&mut self, width: usize, kind: TokenKind) -> Result<TokenKind, LexError> {
        self.advance_by(width);
        Ok(kind)
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();
        let start = self.here();
        let kind = self.next_kind()?;
        self.after_dot = matches!(kind, TokenKind::Dot | TokenKind::NullSafeDot);
        Ok(Token::new(kind, start))
    }

    fn next_kind(&mut self) -> Result<TokenKind, LexError> {
        let next = self.peek_char(1);

        match self.current_char() {
            None => Ok(TokenKind::Eof),
            Some('.') => self.emit(1, TokenKind::Dot),
            Some(',') => self.emit(1, TokenKind::Comma),
            Some('+') => self.emit(1, TokenKind::Plus),
            Some('-') => self.emit(1, TokenKind::Minus),
            Some('*') => self.emit(1, TokenKind::Star),
            Some('/') => self.emit(1, TokenKind::Slash),
            Some('%') => self.emit(1, TokenKind::Percent),
            Some(':') => self.emit(1, TokenKind::Colon),
            Some('(') => self.emit(1, TokenKind::LParen),
            Some(')') => self.emit(1, TokenKind::RParen),
            Some('[') => self.emit(1, TokenKind::LBracket),
            Some(']') => self.emit(1, TokenKind::RBracket),
            Some('?') => match next {
                Some('?') => self.emit(2, TokenKind::Coalesce),
                // `?.5` stays a ternary followed by a number
                Some('.') if !self.peek_char(2).is_some_and(|c| c.is_ascii_digit()) => {
                    self.emit(2, TokenKind::NullSafeDot)
                }
                _ => self.emit(1, TokenKind::Question),
            },
            Some('=') => match (next, self.peek_char(2)) {
                (Some('='), Some('=')) => self.emit(3, TokenKind::EqEqEq),
                (Some('='), _) => self.emit(2, TokenKind::EqEq),
                (Some('>'), _) => self.emit(2, TokenKind::Arrow),
                _ => Err(self.unknown_operator("=")),
            },
            Some('!') => match (next, self.peek_char(2)) {
                (Some('='), Some('=')) => self.emit(3, TokenKind::NotEqEq),
                (Some('='), _) => self.emit(2, TokenKind::NotEq),
                _ => Err(self.unknown_operator("!")),
            },
            Some('<') => match next {
                Some('=') => self.emit(2, TokenKind::LtEq),
                _ => self.emit(1, TokenKind::Lt),
            },
            Some('>') => match next {
                Some('=') => self.emit(2, TokenKind::GtEq),
                _ => self.emit(1, TokenKind::Gt),
            },
            Some('&') => match next {
                Some('&') => self.emit(2, TokenKind::And),
                _ => Err(self.unknown_operator("&")),
            },
            Some('|') => match next {
                Some('|') => self.emit(2, TokenKind::Or),
                _ => Err(self.unknown_operator("|")),
            },
            Some(quote @ ('"' | '\'')) => self.read_string(quote).map(TokenKind::String),
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let ident = self.read_identifier();

                Ok(match ident.as_str() {
                    "AND" => TokenKind::And,
                    "OR" => TokenKind::Or,
                    word if word.eq_ignore_ascii_case("true") => TokenKind::Boolean(true),
                    word if word.eq_ignore_ascii_case("false") => TokenKind::Boolean(false),
                    word if word.eq_ignore_ascii_case("null") => TokenKind::Null,
                    _ => TokenKind::Identifier(ident),
                })
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number(),
            Some(ch) if ch.is_ascii_punctuation() => Err(self.unknown_operator(ch)),
            Some(ch) => Err(LexError::UnexpectedCharacter {
                ch,
                position: self.here(),
            }),
        }
    }

    /// Splits the whole input; the returned vector always ends with `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }
}
