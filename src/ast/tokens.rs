use std::fmt;

/// Location of a character in the query source.
///
/// `offset` counts characters (not bytes) from the start of the query;
/// `line` and `column` are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Position {
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A classified lexeme together with where it started.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, position: Position) -> Self {
        Token { kind, position }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Floating-point number
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// 0.5
    /// ```
    Float(f64),

    /// Integer
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 0
    /// ```
    Integer(i64),

    /// String literal enclosed in single or double quotes
    ///
    /// # Examples
    /// ```text
    /// 'listed'
    /// "item #1"
    /// ```
    String(String),

    /// Boolean values, case-insensitive
    Boolean(bool),

    /// Null value, case-insensitive
    Null,

    // Identifiers
    /// Variable, global function, member or parameter name
    ///
    /// Must start with a letter or underscore, followed by letters, digits,
    /// or underscores.
    ///
    /// # Examples
    /// ```text
    /// site
    /// children
    /// _internal
    /// ```
    Identifier(String),

    // Member access
    /// Member access (`.`)
    Dot,

    /// Null-safe member access (`?.`)
    ///
    /// # Examples
    /// ```text
    /// page?.parent.title
    /// ```
    NullSafeDot,

    // Conditionals
    /// Ternary condition marker (`?`)
    ///
    /// # Examples
    /// ```text
    /// x > 5 ? 'big' : 'small'
    /// title ?: 'Untitled'
    /// ```
    Question,

    /// Ternary branch separator (`:`)
    Colon,

    /// Null-coalescing operator (`??`)
    Coalesce,

    /// Closure arrow (`=>`)
    ///
    /// # Examples
    /// ```text
    /// fn(page) => page.title
    /// ```
    Arrow,

    // Comparison
    /// Loose equality (`==`)
    EqEq,

    /// Strict equality (`===`)
    EqEqEq,

    /// Loose inequality (`!=`)
    NotEq,

    /// Strict inequality (`!==`)
    NotEqEq,

    /// Less than
    Lt,

    /// Greater than
    Gt,

    /// Less than or equal
    LtEq,

    /// Greater than or equal
    GtEq,

    // Arithmetic
    /// Addition
    Plus,

    /// Subtraction or unary negation
    Minus,

    /// Multiplication
    Star,

    /// Division
    Slash,

    /// Integer remainder
    Percent,

    // Logical
    /// Logical AND (`&&` or `AND`)
    ///
    /// # Examples
    /// ```text
    /// page.isListed && page.isPublished
    /// user.isAdmin AND user.isActive
    /// ```
    And,

    /// Logical OR (`||` or `OR`)
    Or,

    // Delimiters
    /// Left parenthesis for grouping, calls and closure parameters
    LParen,

    /// Right parenthesis
    RParen,

    /// Left bracket for array literals
    LBracket,

    /// Right bracket
    RBracket,

    /// Comma for separating arguments, parameters or array elements
    Comma,

    /// End of input
    Eof,
}

impl TokenKind {
    /// Short human-readable description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Float(n) => format!("number {}", n),
            TokenKind::Integer(n) => format!("number {}", n),
            TokenKind::String(s) => format!("string '{}'", s),
            TokenKind::Boolean(b) => format!("'{}'", b),
            TokenKind::Null => "'null'".to_string(),
            TokenKind::Identifier(name) => format!("identifier '{}'", name),
            TokenKind::Eof => "end of input".to_string(),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            TokenKind::Dot => ".",
            TokenKind::NullSafeDot => "?.",
            TokenKind::Question => "?",
            TokenKind::Colon => ":",
            TokenKind::Coalesce => "??",
            TokenKind::Arrow => "=>",
            TokenKind::EqEq => "==",
            TokenKind::EqEqEq => "===",
            TokenKind::NotEq => "!=",
            TokenKind::NotEqEq => "!==",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::LtEq => "<=",
            TokenKind::GtEq => ">=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::And => "&&",
            TokenKind::Or => "||",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Comma => ",",
            _ => "",
        }
    }
}
