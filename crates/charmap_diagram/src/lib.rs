// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dataflow diagram language for Charmap.
//!
//! A diagram is a set of text nodes. Each line of a node may read values
//! from other nodes through `$` placeholders and may produce a value on an
//! output slot. Evaluating a diagram runs every node in dependency order
//! against a host-supplied [`Environment`] and reports values and per-line
//! errors in a [`DiagramState`].
//!
//! ## Architecture
//!
//! - [`value`]: dynamic values, objects, functions and classes
//! - [`environment`]: name bindings and assignment scopes
//! - [`node`] and [`diagram`]: the graph model
//! - [`lexer`], [`parser`] and [`evaluator`]: the expression language
//! - [`statement`] and [`executor`]: `show`, `return` and assignments
//! - [`evaluation`]: whole-diagram evaluation
//! - [`persistence`]: saved diagram format
//! - [`observer`]: change notification

pub mod diagram;
pub mod environment;
pub mod error;
pub mod evaluation;
pub mod evaluator;
pub mod executor;
pub mod lexer;
pub mod node;
pub mod observer;
pub mod parser;
pub mod persistence;
pub mod statement;
pub mod text;
pub mod value;

pub use diagram::{Diagram, DiagramId};
pub use environment::{Environment, ScopeArena, ScopeId, ScopeParent};
pub use error::{DiagramError, ErrorKind, EvalError};
pub use evaluation::{evaluate_diagram, evaluate_diagram_into, DiagramState, NodeState};
pub use evaluator::{InputQueue, ValidatingEvaluator, ValueEvaluator};
pub use executor::{Executor, ReturnExecutor};
pub use node::{Input, InputSource, Line, Node, Output, Statement};
pub use observer::{DiagramObserver, ObservedDiagrams, ObserverId};
pub use parser::{parse_expression, ArgKind, BinaryOp, EvaluatorInterface, Parser, MAX_NESTING_DEPTH};
pub use persistence::{load_diagram, save_diagram, LoadError, MAX_NODE_ID};
pub use statement::{check_statement, StatementEvaluator};
pub use value::{Any, CallArgs, Class, Function, Object, ObjectData, Record};
