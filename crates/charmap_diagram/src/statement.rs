// SPDX-License-Identifier: MIT OR Apache-2.0
//! Statement evaluation: `show(...)`, `return ...` and `name = ...` on top
//! of plain expressions.

use crate::environment::{Environment, ScopeArena, ScopeParent};
use crate::error::EvalError;
use crate::evaluator::{InputQueue, ValidatingEvaluator, ValueEvaluator};
use crate::executor::Executor;
use crate::lexer::TokenKind;
use crate::parser::Parser;
use crate::value::Any;

/// Evaluates the statements of one node in order.
///
/// Assignments allocate a new scope and make it current, so later
/// statements of the same node see earlier bindings. Nothing leaks to other
/// nodes: each node starts from the root environment.
pub struct StatementEvaluator<'a, 'e> {
    root: &'a Environment<'e>,
    scopes: &'a mut ScopeArena,
    scope: ScopeParent,
    inputs: InputQueue,
}

impl<'a, 'e> StatementEvaluator<'a, 'e> {
    /// Create an evaluator for a node with the given input values
    pub fn new(root: &'a Environment<'e>, scopes: &'a mut ScopeArena, inputs: Vec<Any>) -> Self {
        Self {
            root,
            scopes,
            scope: ScopeParent::Root,
            inputs: InputQueue::new(inputs),
        }
    }

    /// Scope that names currently resolve from
    pub fn current_scope(&self) -> ScopeParent {
        self.scope
    }

    /// Make the next `$` read input `index`
    pub fn seek_input(&mut self, index: usize) {
        self.inputs.seek(index);
    }

    /// Evaluate one statement's text.
    ///
    /// `show` and `return` statements and assignments evaluate to void.
    pub fn evaluate(&mut self, text: &str, executor: &mut dyn Executor) -> Result<Any, EvalError> {
        let mut parser = Parser::new(text)?;
        match StatementForm::read(&mut parser) {
            StatementForm::Show => {
                let value = self.expression(&mut parser)?;
                parser.expect_close_paren()?;
                parser.expect_end()?;
                executor.execute_show(&value);
                Ok(Any::Void)
            }
            StatementForm::Return => {
                let value = self.expression(&mut parser)?;
                parser.expect_end()?;
                executor.try_execute_return(value)?;
                Ok(Any::Void)
            }
            StatementForm::Assign(name) => {
                let value = self.expression(&mut parser)?;
                parser.expect_end()?;
                executor.debug(&format!("{name} = {value}"));
                let scope = self.scopes.push(self.scope, name, value);
                self.scope = ScopeParent::Scope(scope);
                Ok(Any::Void)
            }
            StatementForm::Expression => {
                let value = self.expression(&mut parser)?;
                parser.expect_end()?;
                Ok(value)
            }
        }
    }

    fn expression(&mut self, parser: &mut Parser<'_>) -> Result<Any, EvalError> {
        let mut ev = ValueEvaluator::new(&mut self.inputs, self.scopes, self.scope, self.root);
        parser.expression(&mut ev)?;
        Ok(ev.finish())
    }
}

/// Check a statement's syntax without evaluating it.
///
/// Returns the number of `$` placeholders the statement reads.
pub fn check_statement(text: &str) -> Result<usize, EvalError> {
    let mut parser = Parser::new(text)?;
    let form = StatementForm::read(&mut parser);
    let mut ev = ValidatingEvaluator::new(true);
    parser.expression(&mut ev)?;
    if form == StatementForm::Show {
        parser.expect_close_paren()?;
    }
    parser.expect_end()?;
    Ok(ev.inputs_used())
}

#[derive(Debug, PartialEq)]
enum StatementForm<'s> {
    Show,
    Return,
    Assign(&'s str),
    Expression,
}

impl<'s> StatementForm<'s> {
    /// Detect the statement form and consume its leading tokens
    fn read(parser: &mut Parser<'s>) -> Self {
        let first = parser.peek();
        let second = parser.peek_nth(1);

        if first.is_ident("show") && second.kind == TokenKind::LParen {
            parser.bump();
            parser.bump();
            Self::Show
        } else if first.is_ident("return") {
            parser.bump();
            Self::Return
        } else if first.kind == TokenKind::Ident && second.kind == TokenKind::Equals {
            parser.bump();
            parser.bump();
            Self::Assign(first.text)
        } else {
            Self::Expression
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ReturnExecutor;

    #[test]
    fn test_assignment_visible_to_later_statements() {
        let root = Environment::new();
        let mut scopes = ScopeArena::new();
        let mut executor = ReturnExecutor::new();
        let mut statements = StatementEvaluator::new(&root, &mut scopes, Vec::new());

        assert_eq!(statements.evaluate("x = 5", &mut executor), Ok(Any::Void));
        assert_eq!(statements.evaluate("x * x", &mut executor), Ok(Any::Float(25.0)));
        assert_eq!(statements.evaluate("return x * x", &mut executor), Ok(Any::Void));
        assert_eq!(executor.return_value(), Some(&Any::Float(25.0)));
        assert_eq!(scopes.len(), 1);
    }

    #[test]
    fn test_reassignment_allocates_new_scope() {
        let root = Environment::new().with("x", 1.0_f32);
        let mut scopes = ScopeArena::new();
        let mut executor = ReturnExecutor::new();
        let mut statements = StatementEvaluator::new(&root, &mut scopes, Vec::new());

        statements.evaluate("x = x + 1", &mut executor).unwrap();
        let first = statements.current_scope();
        statements.evaluate("x = x * 10", &mut executor).unwrap();
        assert_eq!(statements.evaluate("x", &mut executor), Ok(Any::Float(20.0)));
        assert_ne!(first, statements.current_scope());
        drop(statements);

        assert_eq!(scopes.len(), 2);
        assert_eq!(root.lookup("x"), Some(&Any::Float(1.0)));
    }

    #[test]
    fn test_show() {
        let root = Environment::new();
        let mut scopes = ScopeArena::new();
        let mut executor = ReturnExecutor::new();
        let mut statements = StatementEvaluator::new(&root, &mut scopes, vec![Any::Float(3.0)]);

        assert_eq!(statements.evaluate("show($ * 2)", &mut executor), Ok(Any::Void));
        assert_eq!(executor.shown(), &[Any::Float(6.0)]);
        assert_eq!(
            statements.evaluate("show(1", &mut executor),
            Err(EvalError::MissingCloseParen)
        );
    }

    #[test]
    fn test_failed_assignment_binds_nothing() {
        let root = Environment::new();
        let mut scopes = ScopeArena::new();
        let mut executor = ReturnExecutor::new();
        let mut statements = StatementEvaluator::new(&root, &mut scopes, Vec::new());

        assert_eq!(
            statements.evaluate("x=(5\nreturn x*x", &mut executor),
            Err(EvalError::MissingCloseParen)
        );
        assert_eq!(statements.current_scope(), ScopeParent::Root);
        assert_eq!(executor.return_value(), None);
    }

    #[test]
    fn test_return_type_mismatch() {
        let root = Environment::new();
        let mut scopes = ScopeArena::new();
        let mut executor = ReturnExecutor::expecting("vector");
        let mut statements = StatementEvaluator::new(&root, &mut scopes, Vec::new());

        let error = statements.evaluate("return 5", &mut executor).unwrap_err();
        assert_eq!(
            error,
            EvalError::ReturnTypeMismatch {
                expected: "vector".into(),
                found: "float".into(),
            }
        );
    }

    #[test]
    fn test_trailing_input() {
        let root = Environment::new();
        let mut scopes = ScopeArena::new();
        let mut executor = ReturnExecutor::new();
        let mut statements = StatementEvaluator::new(&root, &mut scopes, Vec::new());

        assert_eq!(
            statements.evaluate("return 1 2", &mut executor),
            Err(EvalError::TrailingInput("2".into()))
        );
        assert_eq!(
            statements.evaluate("show(1) 2", &mut executor),
            Err(EvalError::TrailingInput("2".into()))
        );
    }

    #[test]
    fn test_check_statement() {
        assert_eq!(check_statement("show($ + $)"), Ok(2));
        assert_eq!(check_statement("offset = [1, $]"), Ok(1));
        assert_eq!(check_statement("return missing.name(a = 1)"), Ok(0));
        assert_eq!(check_statement("show(1"), Err(EvalError::MissingCloseParen));
        assert_eq!(check_statement("x = "), Err(EvalError::UnexpectedEnd));
    }
}
