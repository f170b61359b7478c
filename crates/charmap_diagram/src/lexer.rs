// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tokenizer for statement text.

use crate::error::EvalError;
use crate::text::{identifier_len, is_identifier_start};
use std::fmt;

/// Kind of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Unsigned run of decimal digits
    Number,
    /// Identifier
    Ident,
    /// Double-quoted string literal
    String,
    /// `$` input placeholder
    Dollar,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `=`
    Equals,
    /// End of the statement
    End,
}

/// A token borrowing its text from the statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'s> {
    /// Token kind
    pub kind: TokenKind,
    /// Source text; for strings, the contents without quotes
    pub text: &'s str,
}

impl Token<'_> {
    /// Check for an identifier with the given text
    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == name
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::End => f.write_str("end of input"),
            TokenKind::String => write!(f, "\"{}\"", self.text),
            _ => f.write_str(self.text),
        }
    }
}

/// Split statement text into tokens, ending with a [`TokenKind::End`] token.
///
/// Newlines are ordinary whitespace inside a statement.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, EvalError> {
    let mut tokens = Vec::new();
    let mut rest = source;

    loop {
        rest = rest.trim_start();
        let Some(c) = rest.chars().next() else {
            break;
        };

        let (kind, len) = if c.is_ascii_digit() {
            let len = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            (TokenKind::Number, len)
        } else if is_identifier_start(c) {
            (TokenKind::Ident, identifier_len(rest).unwrap_or(1))
        } else if c == '"' {
            let close = rest[1..].find('"').ok_or(EvalError::UnterminatedString)?;
            tokens.push(Token {
                kind: TokenKind::String,
                text: &rest[1..1 + close],
            });
            rest = &rest[close + 2..];
            continue;
        } else {
            let kind = match c {
                '$' => TokenKind::Dollar,
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '[' => TokenKind::LBracket,
                ']' => TokenKind::RBracket,
                ',' => TokenKind::Comma,
                '.' => TokenKind::Dot,
                '+' => TokenKind::Plus,
                '-' => TokenKind::Minus,
                '*' => TokenKind::Star,
                '/' => TokenKind::Slash,
                '=' => TokenKind::Equals,
                other => return Err(EvalError::UnexpectedCharacter(other)),
            };
            (kind, c.len_utf8())
        };

        tokens.push(Token {
            kind,
            text: &rest[..len],
        });
        rest = &rest[len..];
    }

    tokens.push(Token {
        kind: TokenKind::End,
        text: "",
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokens() {
        use TokenKind::*;
        assert_eq!(
            kinds("pos.x = [$, 12]*2"),
            vec![Ident, Dot, Ident, Equals, LBracket, Dollar, Comma, Number, RBracket, Star, Number, End]
        );
    }

    #[test]
    fn test_numbers_are_digit_runs() {
        let tokens = tokenize("1.5").unwrap();
        assert_eq!(tokens[0].text, "1");
        assert_eq!(tokens[1].kind, TokenKind::Dot);
        assert_eq!(tokens[2].text, "5");
    }

    #[test]
    fn test_strings() {
        let tokens = tokenize("show(\"hi there\")").unwrap();
        assert_eq!(tokens[2].kind, TokenKind::String);
        assert_eq!(tokens[2].text, "hi there");
        assert_eq!(tokenize("\"open"), Err(EvalError::UnterminatedString));
    }

    #[test]
    fn test_newlines_are_whitespace() {
        assert_eq!(kinds("[1,\n2]").len(), 6);
    }

    #[test]
    fn test_unexpected_character() {
        assert_eq!(tokenize("a # b"), Err(EvalError::UnexpectedCharacter('#')));
    }
}
