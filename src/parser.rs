//! Tokenizer and recursive-descent parser for the circuit language.
//!
//! A circuit is written as a single Python-style function whose body is a straight line of
//! assignments followed by one `return`:
//!
//! ```text
//! def foo(x):
//!     y = x ** 3
//!     return x + y + 5
//! ```
//!
//! The grammar, loosest binding first:
//!
//! ```text
//! expr  := term (('+' | '-') term)*
//! term  := unary ('*' unary)*
//! unary := '-' unary | power
//! power := atom ('**' INTEGER)?
//! atom  := INTEGER | IDENT | '(' expr ')'
//! ```

use crate::error::Groth16Error;
use rootcause::{Report, report};

/// Keywords that would introduce control flow or nested scopes.
const UNSUPPORTED_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "for", "while", "def", "lambda", "with", "try", "except", "finally",
    "class", "yield", "import", "from", "pass", "break", "continue", "global", "nonlocal", "assert",
    "del", "raise", "async", "await", "and", "or", "not", "in", "is",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Variable(String),
    Constant(u64),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Base raised to a literal exponent.
    Pow(Box<Expr>, u32),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    pub line: usize,
    pub target: String,
    pub value: Expr,
}

/// A parsed circuit function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub inputs: Vec<String>,
    pub body: Vec<Assignment>,
    pub output: Expr,
    pub return_line: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Ident(String),
    Int(u64),
    Plus,
    Minus,
    Star,
    StarStar,
    LParen,
    RParen,
    Comma,
    Colon,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("`{name}`"),
            Token::Int(value) => format!("`{value}`"),
            Token::Plus => "`+`".to_string(),
            Token::Minus => "`-`".to_string(),
            Token::Star => "`*`".to_string(),
            Token::StarStar => "`**`".to_string(),
            Token::LParen => "`(`".to_string(),
            Token::RParen => "`)`".to_string(),
            Token::Comma => "`,`".to_string(),
            Token::Colon => "`:`".to_string(),
            Token::Assign => "`=`".to_string(),
            Token::PlusAssign => "`+=`".to_string(),
            Token::MinusAssign => "`-=`".to_string(),
            Token::StarAssign => "`*=`".to_string(),
        }
    }
}

fn error(line: usize, message: impl Into<String>) -> Report<Groth16Error> {
    report!(Groth16Error::compilation(line, message))
}

fn tokenize(text: &str, line: usize) -> Result<Vec<Token>, Report<Groth16Error>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            ' ' | '\t' | '\r' => {
                i += 1;
                continue;
            }
            '#' => break,
            '0'..='9' => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                if let Some(&trailing) = chars
                    .get(i)
                    .filter(|c| c.is_alphabetic() || **c == '_' || **c == '.')
                {
                    return Err(error(
                        line,
                        format!("malformed number literal `{literal}{trailing}`"),
                    ));
                }
                let value = literal.parse::<u64>().map_err(|_| {
                    error(line, format!("integer literal `{literal}` is too large"))
                })?;
                tokens.push(Token::Int(value));
                continue;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
                continue;
            }
            '*' if next == Some('*') => {
                if chars.get(i + 2) == Some(&'=') {
                    return Err(error(line, "unsupported operator `**=`"));
                }
                tokens.push(Token::StarStar);
                i += 2;
                continue;
            }
            '*' if next == Some('=') => {
                tokens.push(Token::StarAssign);
                i += 2;
                continue;
            }
            '+' if next == Some('=') => {
                tokens.push(Token::PlusAssign);
                i += 2;
                continue;
            }
            '-' if next == Some('=') => {
                tokens.push(Token::MinusAssign);
                i += 2;
                continue;
            }
            '=' if next == Some('=') => {
                return Err(error(line, "unsupported operator `==`"));
            }
            '*' => tokens.push(Token::Star),
            '+' => tokens.push(Token::Plus),
            '-' => tokens.push(Token::Minus),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            ',' => tokens.push(Token::Comma),
            ':' => tokens.push(Token::Colon),
            '=' => tokens.push(Token::Assign),
            other => return Err(error(line, format!("unsupported operator `{other}`"))),
        }
        i += 1;
    }

    Ok(tokens)
}

struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
    line: usize,
}

impl TokenStream {
    fn new(tokens: Vec<Token>, line: usize) -> Self {
        TokenStream {
            tokens,
            pos: 0,
            line,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), Report<Groth16Error>> {
        match self.next_token() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(error(
                self.line,
                format!("expected {}, found {}", expected.describe(), token.describe()),
            )),
            None => Err(error(
                self.line,
                format!("expected {}, found end of line", expected.describe()),
            )),
        }
    }

    fn expect_end(&self) -> Result<(), Report<Groth16Error>> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(error(
                self.line,
                format!("unexpected {} after statement", token.describe()),
            )),
        }
    }

    fn expr(&mut self) -> Result<Expr, Report<Groth16Error>> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Expr, Report<Groth16Error>> {
        let mut lhs = self.unary()?;
        while self.eat(&Token::Star) {
            let rhs = self.unary()?;
            lhs = Expr::Binary(BinaryOp::Mul, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, Report<Groth16Error>> {
        if self.eat(&Token::Minus) {
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        if self.eat(&Token::Plus) {
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, Report<Groth16Error>> {
        let base = self.atom()?;
        if !self.eat(&Token::StarStar) {
            return Ok(base);
        }

        let exponent = match self.next_token() {
            Some(Token::Int(value)) => u32::try_from(value)
                .map_err(|_| error(self.line, format!("exponent {value} is too large")))?,
            Some(Token::Minus) => {
                return Err(error(self.line, "negative exponents are not supported"));
            }
            Some(token) => {
                return Err(error(
                    self.line,
                    format!(
                        "exponent must be an integer literal, found {}",
                        token.describe()
                    ),
                ));
            }
            None => return Err(error(self.line, "missing exponent after `**`")),
        };

        if self.peek() == Some(&Token::StarStar) {
            return Err(error(self.line, "chained exponentiation is not supported"));
        }
        Ok(Expr::Pow(Box::new(base), exponent))
    }

    fn atom(&mut self) -> Result<Expr, Report<Groth16Error>> {
        match self.next_token() {
            Some(Token::Int(value)) => Ok(Expr::Constant(value)),
            Some(Token::Ident(name)) => {
                if UNSUPPORTED_KEYWORDS.contains(&name.as_str()) || name == "return" {
                    return Err(error(
                        self.line,
                        format!("unsupported construct `{name}` in expression"),
                    ));
                }
                if self.peek() == Some(&Token::LParen) {
                    return Err(error(
                        self.line,
                        format!("function calls are not supported (`{name}(...)`)"),
                    ));
                }
                Ok(Expr::Variable(name))
            }
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(token) => Err(error(
                self.line,
                format!("expected an expression, found {}", token.describe()),
            )),
            None => Err(error(self.line, "expected an expression, found end of line")),
        }
    }
}

/// Parse `def name(a, b, ...):`.
fn parse_header(text: &str, line: usize) -> Result<(String, Vec<String>), Report<Groth16Error>> {
    let mut stream = TokenStream::new(tokenize(text, line)?, line);
    match stream.next_token() {
        Some(Token::Ident(keyword)) if keyword == "def" => {}
        _ => return Err(error(line, "expected a function definition `def name(...):`")),
    }
    let name = match stream.next_token() {
        Some(Token::Ident(name)) => name,
        _ => return Err(error(line, "expected a function name after `def`")),
    };
    stream.expect(Token::LParen)?;

    let mut inputs: Vec<String> = Vec::new();
    loop {
        match stream.next_token() {
            Some(Token::RParen) => break,
            Some(Token::Ident(input)) => {
                if inputs.contains(&input) {
                    return Err(error(line, format!("duplicate argument `{input}`")));
                }
                inputs.push(input);
                if !stream.eat(&Token::Comma) {
                    stream.expect(Token::RParen)?;
                    break;
                }
            }
            Some(token) => {
                return Err(error(
                    line,
                    format!("expected an argument name, found {}", token.describe()),
                ));
            }
            None => return Err(error(line, "unterminated argument list")),
        }
    }
    stream.expect(Token::Colon)?;
    stream.expect_end()?;

    for input in &inputs {
        check_binding_name(input, line)?;
    }

    Ok((name, inputs))
}

fn check_binding_name(name: &str, line: usize) -> Result<(), Report<Groth16Error>> {
    if name.starts_with('~') || UNSUPPORTED_KEYWORDS.contains(&name) || name == "return" {
        return Err(error(line, format!("`{name}` cannot be used as a name")));
    }
    Ok(())
}

enum Statement {
    Assignment(Assignment),
    Return(Expr),
}

fn parse_statement(text: &str, line: usize) -> Result<Statement, Report<Groth16Error>> {
    let mut stream = TokenStream::new(tokenize(text, line)?, line);

    let statement = match stream.next_token() {
        Some(Token::Ident(keyword)) if keyword == "return" => Statement::Return(stream.expr()?),
        Some(Token::Ident(keyword)) if UNSUPPORTED_KEYWORDS.contains(&keyword.as_str()) => {
            return Err(error(line, format!("unsupported construct `{keyword}`")));
        }
        Some(Token::Ident(target)) => {
            let op = match stream.next_token() {
                Some(Token::Assign) => None,
                Some(Token::PlusAssign) => Some(BinaryOp::Add),
                Some(Token::MinusAssign) => Some(BinaryOp::Sub),
                Some(Token::StarAssign) => Some(BinaryOp::Mul),
                Some(Token::LParen) => {
                    return Err(error(
                        line,
                        format!("function calls are not supported (`{target}(...)`)"),
                    ));
                }
                _ => {
                    return Err(error(
                        line,
                        "expected an assignment or a return statement",
                    ));
                }
            };
            let rhs = stream.expr()?;
            let value = match op {
                None => rhs,
                Some(op) => Expr::Binary(
                    op,
                    Box::new(Expr::Variable(target.clone())),
                    Box::new(rhs),
                ),
            };
            Statement::Assignment(Assignment {
                line,
                target,
                value,
            })
        }
        _ => {
            return Err(error(
                line,
                "expected an assignment or a return statement",
            ));
        }
    };
    stream.expect_end()?;
    Ok(statement)
}

/// Parse a whole circuit function. Line numbers in errors are 1-based over `source`.
pub fn parse_function(source: &str) -> Result<Function, Report<Groth16Error>> {
    let mut lines = source
        .lines()
        .enumerate()
        .map(|(i, text)| (i + 1, text))
        .filter(|(_, text)| {
            let trimmed = text.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        // Decorators like `@circuit` are accepted and ignored; compilation is an explicit call.
        .skip_while(|(_, text)| text.trim_start().starts_with('@'));

    let Some((header_line, header)) = lines.next() else {
        return Err(error(1, "empty source"));
    };
    let (name, inputs) = parse_header(header.trim(), header_line)?;

    let mut body = Vec::new();
    let mut output = None;
    for (line, text) in lines {
        if !text.starts_with([' ', '\t']) {
            return Err(error(
                line,
                "statements must be indented inside the function body",
            ));
        }
        if let Some((_, return_line)) = &output {
            return Err(error(
                line,
                format!("statement after the return on line {return_line}"),
            ));
        }
        match parse_statement(text.trim(), line)? {
            Statement::Assignment(assignment) => {
                check_binding_name(&assignment.target, line)?;
                body.push(assignment);
            }
            Statement::Return(expr) => output = Some((expr, line)),
        }
    }

    let Some((output, return_line)) = output else {
        return Err(error(header_line, format!("function `{name}` has no return statement")));
    };

    Ok(Function {
        name,
        inputs,
        body,
        output,
        return_line,
    })
}
