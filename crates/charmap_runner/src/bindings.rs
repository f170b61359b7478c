// SPDX-License-Identifier: MIT OR Apache-2.0
//! Host values exposed to diagrams.

use crate::config::{BindingValue, BodyConfig, RunnerConfig};
use charmap_diagram::{Any, Class, Environment, EvalError, Function, Object, ObjectData};

/// Build the root environment for a config.
///
/// Holds the built-in functions, then plain bindings, classes and bodies
/// in that order; later entries shadow earlier ones with the same name.
pub fn build_environment(config: &RunnerConfig) -> Environment<'static> {
    let mut env = Environment::new();

    env.bind("sqrt", Function::positional(sqrt));
    env.bind("length", Function::positional(length));

    for (name, value) in &config.bindings {
        env.bind(name.clone(), value.to_any());
    }
    for class in &config.classes {
        let parameters = class
            .parameters
            .iter()
            .map(|(name, default)| (name.clone(), default.as_ref().map(BindingValue::to_any)));
        env.bind(class.name.clone(), Class::record(class.name.clone(), parameters));
    }
    for (name, body) in &config.bodies {
        env.bind(name.clone(), Object::new(Body::from(body)));
    }

    tracing::debug!("Root environment: {:?}", env.names().collect::<Vec<_>>());
    env
}

fn expect_args(args: &[Any], expected: usize) -> Result<(), EvalError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(EvalError::WrongArgumentCount {
            expected,
            found: args.len(),
        })
    }
}

fn sqrt(args: Vec<Any>) -> Result<Any, EvalError> {
    expect_args(&args, 1)?;
    let value = args[0]
        .as_float()
        .ok_or_else(|| EvalError::host(format!("sqrt expects a float, got {}", args[0].type_name())))?;
    if value < 0.0 {
        return Err(EvalError::host(format!("sqrt of negative number {value}")));
    }
    Ok(Any::Float(value.sqrt()))
}

fn length(args: Vec<Any>) -> Result<Any, EvalError> {
    expect_args(&args, 1)?;
    let floats = args[0]
        .as_floats()
        .ok_or_else(|| EvalError::host(format!("length expects a vector of floats, got {}", args[0])))?;
    Ok(Any::Float(floats.iter().map(|v| v * v).sum::<f32>().sqrt()))
}

/// Rigid body placed in the scene
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    /// Position in world units
    pub position: [f32; 2],
    /// Rotation in degrees
    pub rotation: f32,
}

impl From<&BodyConfig> for Body {
    fn from(config: &BodyConfig) -> Self {
        Self {
            position: config.position,
            rotation: config.rotation,
        }
    }
}

impl ObjectData for Body {
    fn clone_data(&self) -> Box<dyn ObjectData> {
        Box::new(self.clone())
    }

    fn type_name(&self) -> &str {
        "Body"
    }

    fn member_names(&self) -> Vec<String> {
        ["position", "rotation", "pos", "moved"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn member(&self, name: &str) -> Option<Any> {
        let this = self.clone();
        match name {
            "position" => Some(Any::point(self.position[0], self.position[1])),
            "rotation" => Some(Any::Float(self.rotation)),
            "pos" => Some(Any::Function(Function::positional(move |args| {
                expect_args(&args, 0)?;
                Ok(Any::point(this.position[0], this.position[1]))
            }))),
            "moved" => Some(Any::Function(Function::positional(move |args| {
                expect_args(&args, 2)?;
                let (Some(dx), Some(dy)) = (args[0].as_float(), args[1].as_float()) else {
                    return Err(EvalError::host("moved expects float offsets"));
                };
                Ok(Any::Object(Object::new(Body {
                    position: [this.position[0] + dx, this.position[1] + dy],
                    rotation: this.rotation,
                })))
            }))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassConfig;
    use charmap_diagram::{evaluate_diagram, Diagram, ReturnExecutor};
    use indexmap::IndexMap;

    fn config() -> RunnerConfig {
        let mut config = RunnerConfig::default();
        config.bindings.insert("speed".into(), BindingValue::Float(2.0));
        config.classes.push(ClassConfig {
            name: "Offset".into(),
            parameters: IndexMap::from([
                ("dx".to_string(), None),
                ("dy".to_string(), Some(BindingValue::Float(0.0))),
            ]),
        });
        config.bodies.insert(
            "player".into(),
            BodyConfig {
                position: [1.0, 2.0],
                rotation: 45.0,
            },
        );
        config
    }

    fn run(text: &str) -> (Option<Any>, Vec<String>) {
        let env = build_environment(&config());
        let mut diagram = Diagram::new();
        diagram.add_node(text);
        let mut executor = ReturnExecutor::new();
        let state = evaluate_diagram(&diagram, &env, &mut executor);
        let errors = state.errors().map(|(_, _, error)| error.to_string()).collect();
        (executor.take_return_value(), errors)
    }

    #[test]
    fn test_plain_bindings() {
        assert_eq!(run("return speed * 3"), (Some(Any::Float(6.0)), Vec::new()));
    }

    #[test]
    fn test_body_members() {
        assert_eq!(
            run("return player.moved(1, 1).pos() * speed"),
            (Some(Any::point(4.0, 6.0)), Vec::new())
        );
        assert_eq!(run("return player.rotation"), (Some(Any::Float(45.0)), Vec::new()));
        assert_eq!(
            run("return player.position.y"),
            (Some(Any::Float(2.0)), Vec::new())
        );
    }

    #[test]
    fn test_record_class() {
        let (value, errors) = run("o = Offset(dx = 1)\nreturn [o.dx, o.dy]");
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(value, Some(Any::point(1.0, 0.0)));

        let (_, errors) = run("Offset(dy = 1)");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("dx"), "{errors:?}");
    }

    #[test]
    fn test_builtins() {
        assert_eq!(run("return length([3, 4])"), (Some(Any::Float(5.0)), Vec::new()));
        assert_eq!(run("return sqrt(16)"), (Some(Any::Float(4.0)), Vec::new()));

        let (value, errors) = run("return sqrt(1, 2)");
        assert_eq!(value, None);
        assert_eq!(errors.len(), 1);
    }
}
