// SPDX-License-Identifier: MIT OR Apache-2.0
//! Evaluators plugged into the expression parser.
//!
//! [`ValueEvaluator`] computes [`Any`] values; [`ValidatingEvaluator`] only
//! checks that a statement is well formed.

use crate::environment::{Environment, ScopeArena, ScopeParent};
use crate::error::EvalError;
use crate::parser::{ArgKind, BinaryOp, EvaluatorInterface};
use crate::value::{Any, CallArgs};
use indexmap::IndexMap;

/// Input values of a node, consumed in order by `$`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputQueue {
    values: Vec<Any>,
    next: usize,
}

impl InputQueue {
    /// Create a queue over a node's input values
    pub fn new(values: Vec<Any>) -> Self {
        Self { values, next: 0 }
    }

    /// Take the next unconsumed value
    pub fn take(&mut self) -> Option<Any> {
        let value = self.values.get(self.next).cloned()?;
        self.next += 1;
        Some(value)
    }

    /// Position the cursor on input `index`
    pub fn seek(&mut self, index: usize) {
        self.next = index;
    }

    /// Number of values not yet consumed
    pub fn remaining(&self) -> usize {
        self.values.len().saturating_sub(self.next)
    }
}

/// Stack machine over [`Any`] values
pub struct ValueEvaluator<'a> {
    stack: Vec<Any>,
    inputs: &'a mut InputQueue,
    scopes: &'a ScopeArena,
    scope: ScopeParent,
    root: &'a Environment<'a>,
}

impl<'a> ValueEvaluator<'a> {
    /// Create an evaluator resolving names from `scope` upwards
    pub fn new(
        inputs: &'a mut InputQueue,
        scopes: &'a ScopeArena,
        scope: ScopeParent,
        root: &'a Environment<'a>,
    ) -> Self {
        Self {
            stack: Vec::new(),
            inputs,
            scopes,
            scope,
            root,
        }
    }

    /// The value left on the stack by a complete expression
    pub fn finish(mut self) -> Any {
        self.stack.pop().unwrap_or_default()
    }

    fn pop(&mut self) -> Any {
        // The parser pushes every operand before it asks for an operator.
        self.stack.pop().unwrap_or_default()
    }

    fn pop_n(&mut self, n: usize) -> Vec<Any> {
        let start = self.stack.len().saturating_sub(n);
        self.stack.split_off(start)
    }
}

impl EvaluatorInterface for ValueEvaluator<'_> {
    fn push_number(&mut self, digits: &str) -> Result<(), EvalError> {
        let value = digits.parse::<f32>().map_err(|_| EvalError::UnexpectedToken {
            found: digits.to_string(),
            expected: "a number".to_string(),
        })?;
        self.stack.push(Any::Float(value));
        Ok(())
    }

    fn push_string(&mut self, text: &str) -> Result<(), EvalError> {
        self.stack.push(Any::String(text.to_string()));
        Ok(())
    }

    fn push_input(&mut self) -> Result<(), EvalError> {
        let value = self.inputs.take().ok_or(EvalError::NoMoreInputs)?;
        self.stack.push(value);
        Ok(())
    }

    fn push_identifier(&mut self, name: &str) -> Result<(), EvalError> {
        let value = self
            .scopes
            .lookup(self.scope, self.root, name)
            .cloned()
            .ok_or_else(|| EvalError::UnknownIdentifier(name.to_string()))?;
        self.stack.push(value);
        Ok(())
    }

    fn make_vector(&mut self, len: usize) -> Result<(), EvalError> {
        let items = self.pop_n(len);
        self.stack.push(Any::Vector(items));
        Ok(())
    }

    fn member(&mut self, name: &str) -> Result<(), EvalError> {
        let target = self.pop();
        let value = member_of(&target, name)?;
        self.stack.push(value);
        Ok(())
    }

    fn call(&mut self, args: &[ArgKind]) -> Result<(), EvalError> {
        let values = self.pop_n(args.len());
        let callee = self.pop();
        let result = call_value(&callee, args, values)?;
        self.stack.push(result);
        Ok(())
    }

    fn binary(&mut self, op: BinaryOp) -> Result<(), EvalError> {
        let right = self.pop();
        let left = self.pop();
        let result = apply_binary(op, &left, &right)?;
        self.stack.push(result);
        Ok(())
    }
}

/// Member lookup: `x`/`y` on points, otherwise the object's own members
pub fn member_of(target: &Any, name: &str) -> Result<Any, EvalError> {
    if let Some((x, y)) = target.as_point() {
        match name {
            "x" => return Ok(Any::Float(x)),
            "y" => return Ok(Any::Float(y)),
            _ => {}
        }
    }

    let found = match target {
        Any::Object(object) => object.member(name),
        _ => None,
    };
    found.ok_or_else(|| EvalError::UnknownMember {
        type_name: target.type_name().to_string(),
        member: name.to_string(),
    })
}

/// Call a function or construct a class instance.
///
/// Construction takes named arguments only.
pub fn call_value(callee: &Any, args: &[ArgKind], values: Vec<Any>) -> Result<Any, EvalError> {
    match callee {
        Any::Class(class) => {
            let mut named = IndexMap::with_capacity(args.len());
            for (kind, value) in args.iter().zip(values) {
                match kind {
                    ArgKind::Named(name) => {
                        if named.insert(name.clone(), value).is_some() {
                            return Err(EvalError::DuplicateArgument(name.clone()));
                        }
                    }
                    ArgKind::Positional => {
                        return Err(EvalError::PositionalConstruction {
                            class: class.name().to_string(),
                        })
                    }
                }
            }
            Ok(Any::Object(class.construct(named)?))
        }
        Any::Function(function) => {
            let mut call_args = CallArgs::default();
            for (kind, value) in args.iter().zip(values) {
                match kind {
                    ArgKind::Named(name) => {
                        if call_args.named.insert(name.clone(), value).is_some() {
                            return Err(EvalError::DuplicateArgument(name.clone()));
                        }
                    }
                    ArgKind::Positional => call_args.positional.push(value),
                }
            }
            function.call(call_args)
        }
        other => Err(EvalError::NotCallable(other.type_name().to_string())),
    }
}

/// Arithmetic on floats and float vectors
pub fn apply_binary(op: BinaryOp, left: &Any, right: &Any) -> Result<Any, EvalError> {
    match (op, left, right) {
        (_, Any::Float(a), Any::Float(b)) => Ok(Any::Float(match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
        })),
        (BinaryOp::Add | BinaryOp::Sub, Any::Vector(a), Any::Vector(b)) => {
            if a.len() != b.len() {
                return Err(EvalError::VectorLengthMismatch {
                    left: a.len(),
                    right: b.len(),
                });
            }
            let a = float_elements(op, left)?;
            let b = float_elements(op, right)?;
            let combined = a.iter().zip(&b).map(|(x, y)| {
                Any::Float(if op == BinaryOp::Add { x + y } else { x - y })
            });
            Ok(Any::Vector(combined.collect()))
        }
        (BinaryOp::Mul, Any::Float(scale), Any::Vector(_))
        | (BinaryOp::Mul, Any::Vector(_), Any::Float(scale)) => {
            let vector = if left.as_float().is_some() { right } else { left };
            let items = float_elements(op, vector)?;
            Ok(Any::Vector(items.into_iter().map(|x| Any::Float(x * scale)).collect()))
        }
        (BinaryOp::Div, Any::Vector(_), Any::Float(divisor)) => {
            let items = float_elements(op, left)?;
            Ok(Any::Vector(items.into_iter().map(|x| Any::Float(x / divisor)).collect()))
        }
        _ => Err(EvalError::InvalidOperands {
            op: op.symbol(),
            left: left.type_name().to_string(),
            right: right.type_name().to_string(),
        }),
    }
}

fn float_elements(op: BinaryOp, vector: &Any) -> Result<Vec<f32>, EvalError> {
    vector
        .as_floats()
        .ok_or(EvalError::NonFloatVectorElement { op: op.symbol() })
}

/// Checks statement syntax without computing values
#[derive(Debug, Clone, Default)]
pub struct ValidatingEvaluator {
    depth: usize,
    allow_inputs: bool,
    inputs_used: usize,
}

impl ValidatingEvaluator {
    /// Create a validator; `$` fails unless `allow_inputs` is set
    pub fn new(allow_inputs: bool) -> Self {
        Self {
            depth: 0,
            allow_inputs,
            inputs_used: 0,
        }
    }

    /// Number of `$` placeholders seen
    pub fn inputs_used(&self) -> usize {
        self.inputs_used
    }

    /// Values left on the stack
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn push(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        Ok(())
    }

    fn replace(&mut self, popped: usize) -> Result<(), EvalError> {
        self.depth = self.depth.saturating_sub(popped) + 1;
        Ok(())
    }
}

impl EvaluatorInterface for ValidatingEvaluator {
    fn push_number(&mut self, _digits: &str) -> Result<(), EvalError> {
        self.push()
    }

    fn push_string(&mut self, _text: &str) -> Result<(), EvalError> {
        self.push()
    }

    fn push_input(&mut self) -> Result<(), EvalError> {
        if !self.allow_inputs {
            return Err(EvalError::InputRejected);
        }
        self.inputs_used += 1;
        self.push()
    }

    fn push_identifier(&mut self, _name: &str) -> Result<(), EvalError> {
        self.push()
    }

    fn make_vector(&mut self, len: usize) -> Result<(), EvalError> {
        self.replace(len)
    }

    fn member(&mut self, _name: &str) -> Result<(), EvalError> {
        self.replace(1)
    }

    fn call(&mut self, args: &[ArgKind]) -> Result<(), EvalError> {
        self.replace(args.len() + 1)
    }

    fn binary(&mut self, _op: BinaryOp) -> Result<(), EvalError> {
        self.replace(2)
    }
}
