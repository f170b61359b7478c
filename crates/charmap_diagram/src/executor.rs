// SPDX-License-Identifier: MIT OR Apache-2.0
//! Host side of `show` and `return` statements.

use crate::error::EvalError;
use crate::value::Any;

/// Contract the host implements to receive diagram side effects
pub trait Executor {
    /// Handle `show(value)`
    fn execute_show(&mut self, value: &Any);

    /// Handle `return value`; an error fails only the returning statement
    fn try_execute_return(&mut self, value: Any) -> Result<(), EvalError>;

    /// Debug stream
    fn debug(&mut self, message: &str) {
        tracing::debug!(target: "charmap_diagram::executor", "{message}");
    }
}

/// Standard executor: collects shown values and captures the returned value.
///
/// When an expected return type is set, returns of any other type are
/// rejected with a type-mismatch error.
#[derive(Debug, Clone, Default)]
pub struct ReturnExecutor {
    expected_return_type: Option<String>,
    shown: Vec<Any>,
    return_value: Option<Any>,
}

impl ReturnExecutor {
    /// Create an executor accepting returns of any type
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an executor accepting only returns of type `type_name`
    pub fn expecting(type_name: impl Into<String>) -> Self {
        Self {
            expected_return_type: Some(type_name.into()),
            ..Self::default()
        }
    }

    /// Set or clear the expected return type
    pub fn set_expected_return_type(&mut self, type_name: Option<String>) {
        self.expected_return_type = type_name;
    }

    /// Expected return type, if any
    pub fn expected_return_type(&self) -> Option<&str> {
        self.expected_return_type.as_deref()
    }

    /// Values passed to `show`, in execution order
    pub fn shown(&self) -> &[Any] {
        &self.shown
    }

    /// The captured return value
    pub fn return_value(&self) -> Option<&Any> {
        self.return_value.as_ref()
    }

    /// Take the captured return value, leaving none
    pub fn take_return_value(&mut self) -> Option<Any> {
        self.return_value.take()
    }

    /// Forget shown values and the captured return value
    pub fn reset(&mut self) {
        self.shown.clear();
        self.return_value = None;
    }
}

impl Executor for ReturnExecutor {
    fn execute_show(&mut self, value: &Any) {
        tracing::info!("show: {value}");
        self.shown.push(value.clone());
    }

    fn try_execute_return(&mut self, value: Any) -> Result<(), EvalError> {
        if let Some(expected) = &self.expected_return_type {
            if value.type_name() != expected {
                return Err(EvalError::ReturnTypeMismatch {
                    expected: expected.clone(),
                    found: value.type_name().to_string(),
                });
            }
        }
        if let Some(previous) = self.return_value.replace(value) {
            tracing::warn!("More than one return executed; discarding {previous}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captures_last_return() {
        let mut executor = ReturnExecutor::new();
        executor.try_execute_return(Any::Float(1.0)).unwrap();
        executor.try_execute_return(Any::Float(2.0)).unwrap();
        assert_eq!(executor.take_return_value(), Some(Any::Float(2.0)));
        assert_eq!(executor.return_value(), None);
    }

    #[test]
    fn test_expected_type() {
        let mut executor = ReturnExecutor::expecting("vector");
        let error = executor.try_execute_return(Any::Float(5.0)).unwrap_err();
        assert_eq!(error.to_string(), "Return type mismatch: expected vector, got float");
        assert_eq!(executor.return_value(), None);

        executor.try_execute_return(Any::point(1.0, 2.0)).unwrap();
        assert_eq!(executor.return_value(), Some(&Any::point(1.0, 2.0)));
    }

    #[test]
    fn test_show_records_values() {
        let mut executor = ReturnExecutor::new();
        executor.execute_show(&Any::from("hello"));
        assert_eq!(executor.shown(), &[Any::from("hello")]);
        executor.reset();
        assert!(executor.shown().is_empty());
    }
}
