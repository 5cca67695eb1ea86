use std::sync::Arc;

use thiserror::Error;

use crate::{
    ast::{ArithmeticOp, Arguments, ComparisonOp, Expr, Literal, LogicalOp, Position, Token, TokenKind},
    lexer::{LexError, Lexer},
};

/// Maximum number of nested sub-expressions (parentheses, arrays, call
/// arguments, closure bodies, ternary branches, unary minus).
pub const MAX_NESTING: usize = 64;

/// Maximum number of operator and member links chained at once along one
/// path of the tree (`a + b + c`, `a.b.c`).
pub const MAX_CHAIN: usize = 256;

/// Errors that can occur while turning a query into an AST.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("expected {expected}, found {found} at {position}")]
    UnexpectedToken {
        expected: String,
        found: String,
        position: Position,
    },

    #[error("expected {expected}, found end of input at {position}")]
    UnexpectedEnd { expected: String, position: Position },

    #[error("unclosed '{delimiter}' opened at {position}")]
    Unclosed { delimiter: char, position: Position },

    #[error("unbalanced '{delimiter}' at {position}")]
    Unbalanced { delimiter: char, position: Position },

    #[error("expression nested deeper than {limit} levels at {position}")]
    TooDeep { limit: usize, position: Position },
}

impl ParseError {
    /// Where in the query the problem was detected.
    pub fn position(&self) -> Position {
        match self {
            ParseError::Lex(e) => e.position(),
            ParseError::UnexpectedToken { position, .. }
            | ParseError::UnexpectedEnd { position, .. }
            | ParseError::Unclosed { position, .. }
            | ParseError::Unbalanced { position, .. }
            | ParseError::TooDeep { position, .. } => *position,
        }
    }
}

/// Parses a complete query string.
///
/// # Examples
///
/// ```
/// use dotquery::parser::parse;
/// use dotquery::ast::Expr;
///
/// let expr = parse("site.title").unwrap();
/// assert!(matches!(expr, Expr::MemberAccess { .. }));
/// ```
pub fn parse(query: &str) -> Result<Expr, ParseError> {
    Parser::new(Lexer::new(query))?.parse()
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    depth: usize,
    links: usize,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Result<Self, ParseError> {
        Ok(Parser {
            tokens: lexer.tokenize()?,
            current: 0,
            depth: 0,
            links: 0,
        })
    }

    fn peek(&self) -> &Token {
        // `tokenize` guarantees a trailing Eof and `advance` never moves past it
        &self.tokens[self.current]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.current].clone();
        if token.kind != TokenKind::Eof {
            self.current += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        match &token.kind {
            TokenKind::Eof => ParseError::UnexpectedEnd {
                expected: expected.to_string(),
                position: token.position,
            },
            kind => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: kind.describe(),
                position: token.position,
            },
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token, ParseError> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Runs `f` one nesting level deeper.
    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::TooDeep {
                limit: MAX_NESTING,
                position: self.peek().position,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Counts one more link of the chain being built. Callers restore
    /// `links` once their chain is complete.
    fn link(&mut self) -> Result<(), ParseError> {
        if self.links >= MAX_CHAIN {
            return Err(ParseError::TooDeep {
                limit: MAX_CHAIN,
                position: self.peek().position,
            });
        }
        self.links += 1;
        Ok(())
    }

    /// Parses the whole token stream; trailing tokens are an error.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expression()?;
        let token = self.peek();
        match token.kind {
            TokenKind::Eof => Ok(expr),
            TokenKind::RParen => Err(ParseError::Unbalanced {
                delimiter: ')',
                position: token.position,
            }),
            TokenKind::RBracket => Err(ParseError::Unbalanced {
                delimiter: ']',
                position: token.position,
            }),
            _ => Err(self.unexpected("an operator or end of input")),
        }
    }

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::parse_ternary)
    }

    fn parse_ternary(&mut self) -> Result<Expr, ParseError> {
        let condition = self.parse_coalesce()?;

        if !self.check(&TokenKind::Question) {
            return Ok(condition);
        }
        self.advance();

        // Elvis: `cond ?: fallback`
        if self.check(&TokenKind::Colon) {
            self.advance();
            let false_branch = self.parse_expression()?;
            return Ok(Expr::Ternary {
                condition: Box::new(condition),
                true_branch: None,
                false_branch: Box::new(false_branch),
            });
        }

        let true_branch = self.parse_expression()?;
        self.expect(TokenKind::Colon, "':' in ternary")?;
        let false_branch = self.parse_expression()?;

        Ok(Expr::Ternary {
            condition: Box::new(condition),
            true_branch: Some(Box::new(true_branch)),
            false_branch: Box::new(false_branch),
        })
    }

    fn parse_coalesce(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_or()?;
        let links = self.links;

        while self.check(&TokenKind::Coalesce) {
            self.link()?;
            self.advance();
            let right = self.parse_or()?;

            left = Expr::Coalescence {
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.links = links;
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        let links = self.links;

        while self.check(&TokenKind::Or) {
            self.link()?;
            self.advance();
            let right = self.parse_and()?;

            left = Expr::Logical {
                left: Box::new(left),
                op: LogicalOp::Or,
                right: Box::new(right),
            };
        }
        self.links = links;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;
        let links = self.links;

        while self.check(&TokenKind::And) {
            self.link()?;
            self.advance();
            let right = self.parse_comparison()?;

            left = Expr::Logical {
                left: Box::new(left),
                op: LogicalOp::And,
                right: Box::new(right),
            };
        }
        self.links = links;
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        let links = self.links;

        loop {
            let op = match &self.peek().kind {
                TokenKind::EqEq => ComparisonOp::Equal,
                TokenKind::EqEqEq => ComparisonOp::Identical,
                TokenKind::NotEq => ComparisonOp::NotEqual,
                TokenKind::NotEqEq => ComparisonOp::NotIdentical,
                TokenKind::Lt => ComparisonOp::LessThan,
                TokenKind::LtEq => ComparisonOp::LessEqual,
                TokenKind::Gt => ComparisonOp::GreaterThan,
                TokenKind::GtEq => ComparisonOp::GreaterEqual,
                _ => break,
            };

            self.link()?;
            self.advance();
            let right = self.parse_additive()?;

            left = Expr::Comparison {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        self.links = links;
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        let links = self.links;

        loop {
            let op = match &self.peek().kind {
                TokenKind::Plus => ArithmeticOp::Add,
                TokenKind::Minus => ArithmeticOp::Subtract,
                _ => break,
            };

            self.link()?;
            self.advance();
            let right = self.parse_multiplicative()?;

            left = Expr::Arithmetic {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        self.links = links;
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        let links = self.links;

        loop {
            let op = match &self.peek().kind {
                TokenKind::Star => ArithmeticOp::Multiply,
                TokenKind::Slash => ArithmeticOp::Divide,
                TokenKind::Percent => ArithmeticOp::Modulo,
                _ => break,
            };

            self.link()?;
            self.advance();
            let right = self.parse_unary()?;

            left = Expr::Arithmetic {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        self.links = links;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if !self.check(&TokenKind::Minus) {
            return self.parse_postfix();
        }
        self.advance();

        let operand = self.nested(Self::parse_unary)?;
        Ok(match operand {
            Expr::Literal(Literal::Integer(n)) => Expr::Literal(Literal::Integer(-n)),
            Expr::Literal(Literal::Float(n)) => Expr::Literal(Literal::Float(-n)),
            // Represent as 0 - operand
            operand => Expr::Arithmetic {
                left: Box::new(Expr::Literal(Literal::Integer(0))),
                op: ArithmeticOp::Subtract,
                right: Box::new(operand),
            },
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        let links = self.links;
        // once a chain turns null-safe, every later link is null-safe too
        let mut null_safe = false;

        loop {
            match &self.peek().kind {
                TokenKind::Dot => {}
                TokenKind::NullSafeDot => null_safe = true,
                _ => break,
            }
            self.link()?;
            self.advance();

            let member = match &self.peek().kind {
                TokenKind::Identifier(name) => name.clone(),
                TokenKind::Integer(index) if *index >= 0 => index.to_string(),
                _ => return Err(self.unexpected("member name after '.'")),
            };
            self.advance();

            let arguments = if self.check(&TokenKind::LParen) {
                let open = self.advance();
                Some(Arguments::new(self.parse_list(&open, TokenKind::RParen)?))
            } else {
                None
            };

            expr = Expr::MemberAccess {
                object: Box::new(expr),
                member,
                arguments,
                null_safe,
            };
        }
        self.links = links;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance();

        match token.kind {
            // Literals
            TokenKind::Integer(n) => Ok(Expr::Literal(Literal::Integer(n))),
            TokenKind::Float(n) => Ok(Expr::Literal(Literal::Float(n))),
            TokenKind::String(s) => Ok(Expr::Literal(Literal::String(s))),
            TokenKind::Boolean(b) => Ok(Expr::Literal(Literal::Boolean(b))),
            TokenKind::Null => Ok(Expr::Literal(Literal::Null)),

            TokenKind::Identifier(name) => {
                if !self.check(&TokenKind::LParen) {
                    return Ok(Expr::Variable(name));
                }
                if name == "fn" && self.closure_ahead(self.current) {
                    let open = self.advance();
                    return self.parse_closure(&open);
                }
                let open = self.advance();
                let arguments = Arguments::new(self.parse_list(&open, TokenKind::RParen)?);
                Ok(Expr::FunctionCall { name, arguments })
            }

            TokenKind::LParen => {
                if self.closure_ahead(self.current - 1) {
                    return self.parse_closure(&token);
                }
                let expr = self.parse_expression()?;
                self.expect_closing(TokenKind::RParen, &token)?;
                Ok(expr)
            }

            TokenKind::LBracket => {
                let elements = self.parse_list(&token, TokenKind::RBracket)?;
                Ok(Expr::ArrayList(elements))
            }

            TokenKind::RParen => Err(ParseError::Unbalanced {
                delimiter: ')',
                position: token.position,
            }),
            TokenKind::RBracket => Err(ParseError::Unbalanced {
                delimiter: ']',
                position: token.position,
            }),
            TokenKind::Eof => Err(ParseError::UnexpectedEnd {
                expected: "expression".to_string(),
                position: token.position,
            }),
            kind => Err(ParseError::UnexpectedToken {
                expected: "expression".to_string(),
                found: kind.describe(),
                position: token.position,
            }),
        }
    }

    /// Comma-separated expressions up to `closer`; the opening token has
    /// already been consumed.
    fn parse_list(&mut self, open: &Token, closer: TokenKind) -> Result<Vec<Expr>, ParseError> {
        let mut elements = vec![];

        while !self.check(&closer) {
            if self.check(&TokenKind::Eof) {
                return Err(unclosed(open));
            }
            elements.push(self.parse_expression()?);

            if self.check(&TokenKind::Comma) {
                self.advance();
            } else if !self.check(&closer) {
                if self.check(&TokenKind::Eof) {
                    return Err(unclosed(open));
                }
                return Err(self.unexpected(&format!("',' or {}", closer.describe())));
            }
        }

        self.advance();
        Ok(elements)
    }

    fn expect_closing(&mut self, closer: TokenKind, open: &Token) -> Result<(), ParseError> {
        if self.check(&closer) {
            self.advance();
            Ok(())
        } else if self.check(&TokenKind::Eof) {
            Err(unclosed(open))
        } else {
            Err(self.unexpected(&closer.describe()))
        }
    }

    /// True when the `(` at `open` is matched by a `)` directly followed by `=>`.
    fn closure_ahead(&self, open: usize) -> bool {
        let mut depth = 0usize;
        for (index, token) in self.tokens.iter().enumerate().skip(open) {
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return self
                            .tokens
                            .get(index + 1)
                            .is_some_and(|t| t.kind == TokenKind::Arrow);
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
        }
        false
    }

    /// `(a, b) => body`; the opening parenthesis has already been consumed.
    fn parse_closure(&mut self, open: &Token) -> Result<Expr, ParseError> {
        let mut params = vec![];

        while !self.check(&TokenKind::RParen) {
            match &self.peek().kind {
                TokenKind::Identifier(name) => {
                    params.push(name.clone());
                    self.advance();
                }
                _ => return Err(self.unexpected("parameter name")),
            }
            if !self.check(&TokenKind::RParen) {
                self.expect(TokenKind::Comma, "',' or ')' after parameter")?;
            }
        }
        self.expect_closing(TokenKind::RParen, open)?;
        self.expect(TokenKind::Arrow, "'=>' after closure parameters")?;

        let body = self.parse_expression()?;
        Ok(Expr::Closure {
            params,
            body: Arc::new(body),
        })
    }
}

fn unclosed(open: &Token) -> ParseError {
    let delimiter = match open.kind {
        TokenKind::LBracket => '[',
        _ => '(',
    };
    ParseError::Unclosed {
        delimiter,
        position: open.position,
    }
}
