// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lexical scopes used for name lookup.
//!
//! Host bindings live in an [`Environment`] chain owned by the caller.
//! Assignments made while evaluating a diagram never mutate those; each one
//! allocates a single-binding [`Scope`] in a [`ScopeArena`] owned by the
//! evaluation pass, parented either at the caller's root environment or at
//! an earlier scope.

use crate::value::Any;
use std::collections::HashMap;

/// Name to value bindings with an optional borrowed parent scope
#[derive(Debug, Default)]
pub struct Environment<'p> {
    bindings: HashMap<String, Any>,
    parent: Option<&'p Environment<'p>>,
}

impl<'p> Environment<'p> {
    /// Create an empty top-level environment
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
            parent: None,
        }
    }

    /// Create an empty environment whose lookups fall through to `parent`
    pub fn with_parent(parent: &'p Environment<'p>) -> Self {
        Self {
            bindings: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// Bind a name, replacing any existing binding in this scope
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Any>) {
        self.bindings.insert(name.into(), value.into());
    }

    /// Builder form of [`Environment::bind`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Any>) -> Self {
        self.bind(name, value);
        self
    }

    /// Look up a name here, then in the parent chain
    pub fn lookup(&self, name: &str) -> Option<&Any> {
        self.bindings
            .get(name)
            .or_else(|| self.parent.and_then(|parent| parent.lookup(name)))
    }

    /// Check whether a name resolves anywhere in the chain
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Names bound directly in this scope
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }
}

/// Handle of a scope in a [`ScopeArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// Where a scope's lookups continue after a miss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeParent {
    /// The caller-supplied root environment
    Root,
    /// Another scope in the same arena
    Scope(ScopeId),
}

/// One assignment: a single binding plus its parent
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    /// Bound name
    pub name: String,
    /// Bound value
    pub value: Any,
    /// Enclosing scope
    pub parent: ScopeParent,
}

/// Scopes allocated during one evaluation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

impl ScopeArena {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a child scope binding `name`
    pub fn push(&mut self, parent: ScopeParent, name: impl Into<String>, value: Any) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            name: name.into(),
            value,
            parent,
        });
        id
    }

    /// Get a scope by handle
    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0)
    }

    /// Resolve `name` starting at `start`, falling back to `root`
    pub fn lookup<'a>(
        &'a self,
        start: ScopeParent,
        root: &'a Environment<'_>,
        name: &str,
    ) -> Option<&'a Any> {
        let mut current = start;
        while let ScopeParent::Scope(id) = current {
            let scope = self.get(id)?;
            if scope.name == name {
                return Some(&scope.value);
            }
            current = scope.parent;
        }
        root.lookup(name)
    }

    /// Number of scopes allocated
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Check if no scope has been allocated
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Drop every scope
    pub fn clear(&mut self) {
        self.scopes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_fallthrough() {
        let globals = Environment::new().with("x", 1.0_f32).with("y", 2.0_f32);
        let mut local = Environment::with_parent(&globals);
        local.bind("x", 10.0_f32);

        assert_eq!(local.lookup("x"), Some(&Any::Float(10.0)));
        assert_eq!(local.lookup("y"), Some(&Any::Float(2.0)));
        assert!(!local.contains("z"));
        assert_eq!(globals.lookup("x"), Some(&Any::Float(1.0)));
    }

    #[test]
    fn test_scope_chain_shadows_root() {
        let root = Environment::new().with("a", 1.0_f32);
        let mut arena = ScopeArena::new();
        let first = arena.push(ScopeParent::Root, "a", Any::Float(5.0));
        let second = arena.push(ScopeParent::Scope(first), "b", Any::Float(6.0));

        assert_eq!(
            arena.lookup(ScopeParent::Scope(second), &root, "a"),
            Some(&Any::Float(5.0))
        );
        assert_eq!(
            arena.lookup(ScopeParent::Scope(second), &root, "b"),
            Some(&Any::Float(6.0))
        );
        // Earlier scopes never see later bindings.
        assert_eq!(arena.lookup(ScopeParent::Scope(first), &root, "b"), None);
        assert_eq!(arena.lookup(ScopeParent::Root, &root, "a"), Some(&Any::Float(1.0)));
        assert_eq!(arena.len(), 2);
    }
}
