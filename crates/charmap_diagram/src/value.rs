// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dynamically typed values shared by the expression language and its host.
//!
//! The value domain is closed: [`Any`] is either void, a float, a string, a
//! vector of values, a host [`Object`], a callable [`Function`] or a reference
//! to a constructible [`Class`]. Host record types plug in through the
//! [`ObjectData`] trait.

use crate::error::EvalError;
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// A dynamically typed value
#[derive(Debug, Clone, Default)]
pub enum Any {
    /// No value
    #[default]
    Void,
    /// 32-bit float
    Float(f32),
    /// Text
    String(String),
    /// Ordered, heterogeneous list
    Vector(Vec<Any>),
    /// Host object
    Object(Object),
    /// Callable
    Function(Function),
    /// Constructible host type
    Class(Rc<Class>),
}

impl Any {
    /// A two-element float vector
    pub fn point(x: f32, y: f32) -> Self {
        Self::Vector(vec![Self::Float(x), Self::Float(y)])
    }

    /// Name of the value's type as seen by diagram code
    pub fn type_name(&self) -> &str {
        match self {
            Self::Void => "void",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Vector(_) => "vector",
            Self::Object(object) => object.type_name(),
            Self::Function(_) => "function",
            Self::Class(_) => "class",
        }
    }

    /// Check if this is the void value
    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    /// The float payload, if any
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// The string payload, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// View a two-element float vector as a point
    pub fn as_point(&self) -> Option<(f32, f32)> {
        match self {
            Self::Vector(items) => match items.as_slice() {
                [Self::Float(x), Self::Float(y)] => Some((*x, *y)),
                _ => None,
            },
            _ => None,
        }
    }

    /// All elements as floats, if this is a vector of floats only
    pub fn as_floats(&self) -> Option<Vec<f32>> {
        match self {
            Self::Vector(items) => items.iter().map(Self::as_float).collect(),
            _ => None,
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(text) => write!(f, "\"{text}\""),
            other => write!(f, "{other}"),
        }
    }
}

impl PartialEq for Any {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Void, Self::Void) => true,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Vector(a), Self::Vector(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => a.same_function(b),
            (Self::Class(a), Self::Class(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Any {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Float(value) => write!(f, "{value}"),
            Self::String(text) => f.write_str(text),
            Self::Vector(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_nested(f)?;
                }
                f.write_str("]")
            }
            Self::Object(object) => write!(f, "{object}"),
            Self::Function(_) => f.write_str("<function>"),
            Self::Class(class) => write!(f, "<class {}>", class.name()),
        }
    }
}

impl From<f32> for Any {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Any {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Any {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<Any>> for Any {
    fn from(value: Vec<Any>) -> Self {
        Self::Vector(value)
    }
}

impl From<Object> for Any {
    fn from(value: Object) -> Self {
        Self::Object(value)
    }
}

impl From<Function> for Any {
    fn from(value: Function) -> Self {
        Self::Function(value)
    }
}

impl From<Class> for Any {
    fn from(value: Class) -> Self {
        Self::Class(Rc::new(value))
    }
}

/// Behaviour a host type provides to be used as an [`Object`].
///
/// `member` may return a [`Function`] that captures a copy of `self` to
/// emulate a method.
pub trait ObjectData: fmt::Debug {
    /// Deep copy of this payload
    fn clone_data(&self) -> Box<dyn ObjectData>;

    /// Type name shown to diagram code
    fn type_name(&self) -> &str;

    /// Names accepted by [`ObjectData::member`]
    fn member_names(&self) -> Vec<String>;

    /// Look up a member by name
    fn member(&self, name: &str) -> Option<Any>;

    /// Value equality with another payload.
    ///
    /// The default compares type and member names, then every member value
    /// except functions.
    fn eq_data(&self, other: &dyn ObjectData) -> bool {
        if self.type_name() != other.type_name() {
            return false;
        }
        let names = self.member_names();
        if names != other.member_names() {
            return false;
        }
        names.iter().all(|name| match (self.member(name), other.member(name)) {
            (Some(Any::Function(_)), Some(Any::Function(_))) => true,
            (a, b) => a == b,
        })
    }
}

/// A host value exclusively owning its payload; cloning clones the payload
#[derive(Debug)]
pub struct Object {
    data: Box<dyn ObjectData>,
}

impl Object {
    /// Wrap a host payload
    pub fn new(data: impl ObjectData + 'static) -> Self {
        Self {
            data: Box::new(data),
        }
    }

    /// Type name of the payload
    pub fn type_name(&self) -> &str {
        self.data.type_name()
    }

    /// Member names of the payload
    pub fn member_names(&self) -> Vec<String> {
        self.data.member_names()
    }

    /// Look up a member
    pub fn member(&self, name: &str) -> Option<Any> {
        self.data.member(name)
    }

    /// Borrow the payload
    pub fn data(&self) -> &dyn ObjectData {
        self.data.as_ref()
    }

}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.data.eq_data(other.data.as_ref())
    }
}

impl Clone for Object {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone_data(),
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.type_name())?;
        let mut first = true;
        for name in self.member_names() {
            let Some(value) = self.member(&name) else {
                continue;
            };
            if matches!(value, Any::Function(_)) {
                continue;
            }
            f.write_str(if first { " " } else { ", " })?;
            first = false;
            write!(f, "{name}: ")?;
            value.fmt_nested(f)?;
        }
        f.write_str(if first { "}" } else { " }" })
    }
}

/// Arguments of a call: positional values in order, then named values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    /// Positional arguments
    pub positional: Vec<Any>,
    /// Named arguments in call order
    pub named: IndexMap<String, Any>,
}

impl CallArgs {
    /// Positional-only arguments
    pub fn positional(values: Vec<Any>) -> Self {
        Self {
            positional: values,
            named: IndexMap::new(),
        }
    }
}

type NativeFn = dyn Fn(CallArgs) -> Result<Any, EvalError>;

/// A callable value; compares by identity
#[derive(Clone)]
pub struct Function(Rc<NativeFn>);

impl Function {
    /// Wrap a closure receiving both positional and named arguments
    pub fn new(f: impl Fn(CallArgs) -> Result<Any, EvalError> + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Wrap a closure that only takes positional arguments.
    ///
    /// Calls passing named arguments fail instead of silently losing them.
    pub fn positional(f: impl Fn(Vec<Any>) -> Result<Any, EvalError> + 'static) -> Self {
        Self::new(move |args: CallArgs| {
            if !args.named.is_empty() {
                return Err(EvalError::NamedArgumentsNotAccepted);
            }
            f(args.positional)
        })
    }

    /// Invoke the function
    pub fn call(&self, args: CallArgs) -> Result<Any, EvalError> {
        (self.0)(args)
    }

    /// Identity comparison
    pub fn same_function(&self, other: &Function) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Function")
    }
}

type Constructor = dyn Fn(&str, IndexMap<String, Any>) -> Result<Object, EvalError>;

/// A named-parameter factory for host objects.
///
/// Diagram code constructs instances with call syntax and named arguments
/// only, e.g. `Offset(dx=1, dy=2)`.
pub struct Class {
    name: String,
    constructor: Box<Constructor>,
}

impl Class {
    /// Create a class from a constructor receiving the class name and named arguments
    pub fn new(
        name: impl Into<String>,
        constructor: impl Fn(&str, IndexMap<String, Any>) -> Result<Object, EvalError> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            constructor: Box::new(constructor),
        }
    }

    /// A class producing [`Record`] objects.
    ///
    /// Each parameter has an optional default; parameters without one are required.
    pub fn record<I, S>(name: impl Into<String>, parameters: I) -> Self
    where
        I: IntoIterator<Item = (S, Option<Any>)>,
        S: Into<String>,
    {
        let parameters: IndexMap<String, Option<Any>> = parameters
            .into_iter()
            .map(|(name, default)| (name.into(), default))
            .collect();

        Self::new(name, move |class, mut args| {
            if let Some(unknown) = args.keys().find(|key| !parameters.contains_key(*key)) {
                return Err(EvalError::UnknownParameter {
                    class: class.to_string(),
                    parameter: unknown.clone(),
                });
            }

            let mut fields = IndexMap::with_capacity(parameters.len());
            for (parameter, default) in &parameters {
                let value = match (args.swap_remove(parameter), default) {
                    (Some(value), _) => value,
                    (None, Some(default)) => default.clone(),
                    (None, None) => {
                        return Err(EvalError::MissingParameter {
                            class: class.to_string(),
                            parameter: parameter.clone(),
                        })
                    }
                };
                fields.insert(parameter.clone(), value);
            }
            Ok(Object::new(Record::new(class, fields)))
        })
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Construct an instance from named arguments
    pub fn construct(&self, args: IndexMap<String, Any>) -> Result<Object, EvalError> {
        (self.constructor)(&self.name, args)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Generic host record: a type name and ordered fields exposed as members
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    type_name: String,
    fields: IndexMap<String, Any>,
}

impl Record {
    /// Create a record
    pub fn new(type_name: impl Into<String>, fields: IndexMap<String, Any>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
        }
    }

    /// Field value by name
    pub fn field(&self, name: &str) -> Option<&Any> {
        self.fields.get(name)
    }
}

impl ObjectData for Record {
    fn clone_data(&self) -> Box<dyn ObjectData> {
        Box::new(self.clone())
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn member_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    fn member(&self, name: &str) -> Option<Any> {
        self.fields.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset_class() -> Class {
        Class::record(
            "Offset",
            [("dx", None), ("dy", Some(Any::Float(0.0)))],
        )
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(Any::point(1.0, 2.0), Any::point(1.0, 2.0));
        assert_ne!(Any::point(1.0, 2.0), Any::point(2.0, 1.0));
        assert_eq!(Any::from("a"), Any::String("a".into()));
        assert_ne!(Any::Float(0.0), Any::Void);
    }

    #[test]
    fn test_identity_equality() {
        let function = Function::positional(|_| Ok(Any::Void));
        let same = Any::Function(function.clone());
        assert_eq!(Any::Function(function), same);
        let other = Any::Function(Function::positional(|_| Ok(Any::Void)));
        assert_ne!(same, other);

    }

    #[test]
    fn test_object_value_equality() {
        let object = offset_class()
            .construct(IndexMap::from([("dx".to_string(), Any::Float(1.0))]))
            .unwrap();
        assert_eq!(Any::from(object.clone()), Any::from(object.clone()));

        let moved = offset_class()
            .construct(IndexMap::from([("dx".to_string(), Any::Float(2.0))]))
            .unwrap();
        assert_ne!(Any::from(object.clone()), Any::from(moved));

        let renamed = Object::new(Record::new(
            "Shift",
            IndexMap::from([
                ("dx".to_string(), Any::Float(1.0)),
                ("dy".to_string(), Any::Float(0.0)),
            ]),
        ));
        assert_ne!(object, renamed);
    }

    #[derive(Debug, Clone)]
    struct Marker;

    impl ObjectData for Marker {
        fn clone_data(&self) -> Box<dyn ObjectData> {
            Box::new(self.clone())
        }

        fn type_name(&self) -> &str {
            "Marker"
        }

        fn member_names(&self) -> Vec<String> {
            vec!["hide".into()]
        }

        fn member(&self, name: &str) -> Option<Any> {
            (name == "hide").then(|| Any::Function(Function::positional(|_| Ok(Any::Void))))
        }
    }

    #[test]
    fn test_method_members_ignored_by_equality() {
        let marker = Object::new(Marker);
        assert_eq!(marker, marker.clone());
        assert_ne!(marker, Object::new(Record::new("Marker", IndexMap::new())));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Any::Void.type_name(), "void");
        assert_eq!(Any::point(0.0, 0.0).type_name(), "vector");
        assert_eq!(Any::from(offset_class()).type_name(), "class");
        let object = offset_class()
            .construct(IndexMap::from([("dx".to_string(), Any::Float(1.0))]))
            .unwrap();
        assert_eq!(Any::from(object).type_name(), "Offset");
    }

    #[test]
    fn test_record_construction() {
        let class = offset_class();
        let object = class
            .construct(IndexMap::from([("dx".to_string(), Any::Float(3.0))]))
            .unwrap();
        assert_eq!(object.member("dx"), Some(Any::Float(3.0)));
        assert_eq!(object.member("dy"), Some(Any::Float(0.0)));
        assert_eq!(object.member_names(), vec!["dx", "dy"]);

        let missing = class.construct(IndexMap::new()).unwrap_err();
        assert_eq!(missing.to_string(), "Offset requires parameter 'dx'");

        let unknown = class
            .construct(IndexMap::from([
                ("dx".to_string(), Any::Float(1.0)),
                ("dz".to_string(), Any::Float(1.0)),
            ]))
            .unwrap_err();
        assert_eq!(unknown.to_string(), "Offset has no parameter 'dz'");
    }

    #[test]
    fn test_positional_function_rejects_named() {
        let double = Function::positional(|args| {
            let value = args.first().and_then(Any::as_float).unwrap_or(0.0);
            Ok(Any::Float(value * 2.0))
        });
        assert_eq!(
            double.call(CallArgs::positional(vec![Any::Float(2.0)])),
            Ok(Any::Float(4.0))
        );

        let mut args = CallArgs::default();
        args.named.insert("x".into(), Any::Float(1.0));
        assert_eq!(double.call(args), Err(EvalError::NamedArgumentsNotAccepted));
    }

    #[test]
    fn test_display() {
        assert_eq!(Any::Float(5.0).to_string(), "5");
        assert_eq!(Any::point(1.5, -2.0).to_string(), "[1.5, -2]");
        assert_eq!(
            Any::Vector(vec![Any::from("a"), Any::Void]).to_string(),
            "[\"a\", void]"
        );
        let object = offset_class()
            .construct(IndexMap::from([("dx".to_string(), Any::Float(1.0))]))
            .unwrap();
        assert_eq!(object.to_string(), "Offset { dx: 1, dy: 0 }");
    }

    #[test]
    fn test_point_view() {
        assert_eq!(Any::point(1.0, 2.0).as_point(), Some((1.0, 2.0)));
        assert_eq!(Any::Vector(vec![Any::Float(1.0)]).as_point(), None);
        assert_eq!(
            Any::Vector(vec![Any::Float(1.0), Any::from("a")]).as_floats(),
            None
        );
    }
}
