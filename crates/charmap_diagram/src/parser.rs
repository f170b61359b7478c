// SPDX-License-Identifier: MIT OR Apache-2.0
//! Recursive-descent expression parser.
//!
//! The parser knows nothing about values. It drives an
//! [`EvaluatorInterface`], a stack machine that receives operands and
//! operators in evaluation order, and stops at the first failure.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! Expression := Term
//! Term       := Factor (('+' | '-') Factor)*
//! Factor     := Postfix (('*' | '/') Postfix)*
//! Postfix    := Primary ('.' IDENT | '(' Args ')')*
//! Primary    := '(' Expression ')' | NUMBER | STRING | '$'
//!             | '[' (Expression (',' Expression)*)? ']' | IDENT
//! Args       := (Arg (',' Arg)*)?
//! Arg        := IDENT '=' Expression | Expression
//! ```

use crate::error::EvalError;
use crate::lexer::{tokenize, Token, TokenKind};

/// Arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

impl BinaryOp {
    /// Operator symbol
    pub fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
            Self::Div => '/',
        }
    }
}

/// How a call argument was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgKind {
    /// `expr`
    Positional,
    /// `name = expr`
    Named(String),
}

/// Stack machine driven by the parser.
///
/// Every method either pushes a value or replaces operands on top of the
/// stack with a result.
pub trait EvaluatorInterface {
    /// Push an unsigned integer literal
    fn push_number(&mut self, digits: &str) -> Result<(), EvalError>;

    /// Push a string literal
    fn push_string(&mut self, text: &str) -> Result<(), EvalError>;

    /// Push the next unconsumed node input
    fn push_input(&mut self) -> Result<(), EvalError>;

    /// Push the value bound to a name
    fn push_identifier(&mut self, name: &str) -> Result<(), EvalError>;

    /// Pop `len` values and push them as a vector
    fn make_vector(&mut self, len: usize) -> Result<(), EvalError>;

    /// Pop a value and push its member `name`
    fn member(&mut self, name: &str) -> Result<(), EvalError>;

    /// Pop one value per argument (in source order) and the callee, push the result
    fn call(&mut self, args: &[ArgKind]) -> Result<(), EvalError>;

    /// Pop right then left operand, push the result
    fn binary(&mut self, op: BinaryOp) -> Result<(), EvalError>;
}

/// Deepest allowed nesting of parenthesized, bracketed or argument expressions
pub const MAX_NESTING_DEPTH: usize = 128;

/// Token cursor over one statement
#[derive(Debug)]
pub struct Parser<'s> {
    tokens: Vec<Token<'s>>,
    pos: usize,
    depth: usize,
}

impl<'s> Parser<'s> {
    /// Tokenize `source`
    pub fn new(source: &'s str) -> Result<Self, EvalError> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            depth: 0,
        })
    }

    /// Current token
    pub fn peek(&self) -> Token<'s> {
        self.peek_nth(0)
    }

    /// Token `n` positions ahead; past the end this is the end token
    pub fn peek_nth(&self, n: usize) -> Token<'s> {
        let index = (self.pos + n).min(self.tokens.len() - 1);
        self.tokens[index]
    }

    /// Consume and return the current token
    pub fn bump(&mut self) -> Token<'s> {
        let token = self.peek();
        if token.kind != TokenKind::End {
            self.pos += 1;
        }
        token
    }

    /// Consume the current token if it has the given kind
    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek().kind == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Require that the whole statement has been consumed
    pub fn expect_end(&self) -> Result<(), EvalError> {
        match self.peek() {
            token if token.kind == TokenKind::End => Ok(()),
            token => Err(EvalError::TrailingInput(token.to_string())),
        }
    }

    /// Require a closing parenthesis
    pub fn expect_close_paren(&mut self) -> Result<(), EvalError> {
        if self.eat(TokenKind::RParen) {
            Ok(())
        } else {
            Err(EvalError::MissingCloseParen)
        }
    }

    /// Parse one expression.
    ///
    /// Fails with [`EvalError::NestingTooDeep`] past [`MAX_NESTING_DEPTH`]
    /// nested expressions.
    pub fn expression(&mut self, ev: &mut dyn EvaluatorInterface) -> Result<(), EvalError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(EvalError::NestingTooDeep(MAX_NESTING_DEPTH));
        }
        self.depth += 1;
        let result = self.term(ev);
        self.depth -= 1;
        result
    }

    fn term(&mut self, ev: &mut dyn EvaluatorInterface) -> Result<(), EvalError> {
        self.factor(ev)?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(()),
            };
            self.bump();
            self.factor(ev)?;
            ev.binary(op)?;
        }
    }

    fn factor(&mut self, ev: &mut dyn EvaluatorInterface) -> Result<(), EvalError> {
        self.postfix(ev)?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => return Ok(()),
            };
            self.bump();
            self.postfix(ev)?;
            ev.binary(op)?;
        }
    }

    fn postfix(&mut self, ev: &mut dyn EvaluatorInterface) -> Result<(), EvalError> {
        self.primary(ev)?;
        loop {
            if self.eat(TokenKind::Dot) {
                let name = self.bump();
                match name.kind {
                    TokenKind::Ident => ev.member(name.text)?,
                    TokenKind::End => return Err(EvalError::UnexpectedEnd),
                    _ => {
                        return Err(EvalError::UnexpectedToken {
                            found: name.to_string(),
                            expected: "a member name".to_string(),
                        })
                    }
                }
            } else if self.eat(TokenKind::LParen) {
                let args = self.args(ev)?;
                self.expect_close_paren()?;
                ev.call(&args)?;
            } else {
                return Ok(());
            }
        }
    }

    fn args(&mut self, ev: &mut dyn EvaluatorInterface) -> Result<Vec<ArgKind>, EvalError> {
        let mut args = Vec::new();
        if self.peek().kind == TokenKind::RParen {
            return Ok(args);
        }
        loop {
            let first = self.peek();
            if first.kind == TokenKind::Ident && self.peek_nth(1).kind == TokenKind::Equals {
                self.bump();
                self.bump();
                self.expression(ev)?;
                args.push(ArgKind::Named(first.text.to_string()));
            } else {
                self.expression(ev)?;
                args.push(ArgKind::Positional);
            }
            if !self.eat(TokenKind::Comma) {
                return Ok(args);
            }
        }
    }

    fn primary(&mut self, ev: &mut dyn EvaluatorInterface) -> Result<(), EvalError> {
        let token = self.bump();
        match token.kind {
            TokenKind::LParen => {
                self.expression(ev)?;
                self.expect_close_paren()
            }
            TokenKind::Number => ev.push_number(token.text),
            TokenKind::String => ev.push_string(token.text),
            TokenKind::Dollar => ev.push_input(),
            TokenKind::LBracket => self.vector(ev),
            TokenKind::Ident => ev.push_identifier(token.text),
            TokenKind::End => Err(EvalError::UnexpectedEnd),
            _ => Err(EvalError::UnexpectedToken {
                found: token.to_string(),
                expected: "an expression".to_string(),
            }),
        }
    }

    fn vector(&mut self, ev: &mut dyn EvaluatorInterface) -> Result<(), EvalError> {
        let mut len = 0;
        if !self.eat(TokenKind::RBracket) {
            loop {
                self.expression(ev)?;
                len += 1;
                if self.eat(TokenKind::RBracket) {
                    break;
                }
                if !self.eat(TokenKind::Comma) {
                    return Err(EvalError::MissingCloseBracket);
                }
            }
        }
        ev.make_vector(len)
    }
}

/// Parse `source` as a single complete expression
pub fn parse_expression(source: &str, ev: &mut dyn EvaluatorInterface) -> Result<(), EvalError> {
    let mut parser = Parser::new(source)?;
    parser.expression(ev)?;
    parser.expect_end()
}
