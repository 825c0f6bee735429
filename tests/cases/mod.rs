//! Shared harness for the end-to-end expression tests.
//!
//! Every case is compiled once and evaluated in both execution modes with
//! fresh variables; the two results must agree.

#![allow(dead_code)]

use std::sync::Arc;

use kestrel::values::{Class, ClassBuilder, DynamicObject, TypeHint};
use kestrel::{
    CompilationOptions, Engine, EngineOptions, EnvironmentBuilder, Error,
    MapVariableResolverFactory, Value,
};
use once_cell::sync::Lazy;
use pretty_assertions::assert_eq;

pub struct Case {
    source: &'static str,
    options: EngineOptions,
    env: Option<Box<dyn Fn(&mut EnvironmentBuilder)>>,
    vars: Vec<(&'static str, Value)>,
    ctx: Value,
    ast: Option<&'static str>,
    result: Option<Value>,
    error: Option<&'static str>,
    literal: Option<bool>,
    inputs: Option<Vec<&'static str>>,
}

impl Case {
    pub fn new(source: &'static str) -> Self {
        Self {
            source,
            options: EngineOptions::default(),
            env: None,
            vars: Vec::new(),
            ctx: Value::Null,
            ast: None,
            result: None,
            error: None,
            literal: None,
            inputs: None,
        }
    }

    /// Host setup run when the engine is built.
    pub fn env(&mut self, init: impl Fn(&mut EnvironmentBuilder) + 'static) {
        self.env = Some(Box::new(init));
    }

    pub fn compile(&mut self, options: CompilationOptions) {
        self.options.default_compilation_options = options;
    }

    pub fn vars(&mut self, vars: Vec<(&'static str, Value)>) {
        self.vars = vars;
    }

    pub fn ctx(&mut self, ctx: Value) {
        self.ctx = ctx;
    }

    /// Expected s-expression of the compiled tree.
    pub fn ast(&mut self, ast: &'static str) {
        self.ast = Some(ast);
    }

    pub fn result(&mut self, value: Value) {
        self.result = Some(value);
    }

    /// Expected failure; matched as a substring of the rendered error.
    pub fn error(&mut self, needle: &'static str) {
        self.error = Some(needle);
    }

    pub fn literal(&mut self, literal: bool) {
        self.literal = Some(literal);
    }

    pub fn inputs(&mut self, inputs: Vec<&'static str>) {
        self.inputs = Some(inputs);
    }

    fn factory(&self) -> MapVariableResolverFactory<'static> {
        MapVariableResolverFactory::with_variables(self.vars.iter().cloned())
    }

    pub fn check(self) {
        let engine = match &self.env {
            Some(init) => Engine::new(self.options.clone(), |env| init(env)),
            None => Engine::new(self.options.clone(), |_| {}),
        };

        let expr = match engine.compile(self.source) {
            Ok(Some(expr)) => expr,
            Ok(None) => panic!("{:?} compiled to nothing", self.source),
            Err(err) => return self.expect_error(&err),
        };

        if let Some(ast) = self.ast {
            assert_eq!(expr.debug_tree(), ast, "tree of {:?}", self.source);
        }
        if let Some(literal) = self.literal {
            assert_eq!(expr.is_literal_only(), literal, "literal-only {:?}", self.source);
        }
        if let Some(inputs) = &self.inputs {
            let found: Vec<&str> = expr.inputs().iter().map(|s| s.as_str()).collect();
            assert_eq!(&found, inputs, "inputs of {:?}", self.source);
        }

        let interpreted = expr.evaluate_interpreted(&self.ctx, &self.factory());
        let accelerated = expr.evaluate(&self.ctx, &self.factory());
        // A second accelerated run replays the cached accessors.
        let replayed = expr.evaluate(&self.ctx, &self.factory());

        match (interpreted, accelerated, replayed) {
            (Ok(a), Ok(b), Ok(c)) => {
                assert_eq!(a, b, "modes disagree for {:?}", self.source);
                assert_eq!(b, c, "replay disagrees for {:?}", self.source);
                match (&self.result, self.error) {
                    (Some(expected), _) => assert_eq!(&b, expected, "result of {:?}", self.source),
                    (None, Some(needle)) => {
                        panic!("{:?} evaluated to {:?}, expected error {:?}", self.source, b, needle)
                    }
                    (None, None) => {}
                }
            }
            (Err(_), Err(_), Err(err)) => self.expect_error(&err),
            (a, b, c) => panic!(
                "modes disagree for {:?}: {:?} / {:?} / {:?}",
                self.source, a, b, c
            ),
        }
    }

    fn expect_error(&self, err: &Error) {
        let Some(needle) = self.error else {
            panic!("{:?} failed: {}", self.source, describe(err));
        };
        let text = describe(err);
        assert!(text.contains(needle), "expected {:?} in {:?}", needle, text);
    }
}

/// Error text with every diagnostic's code and message.
pub fn describe(err: &Error) -> String {
    match err {
        Error::Compilation { diagnostics } => diagnostics
            .iter()
            .map(|d| format!("{} {}", d.code.as_deref().unwrap_or("-"), d.message))
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

pub fn ints(items: &[i32]) -> Value {
    Value::list(items.iter().copied().map(Value::Int).collect())
}

macro_rules! test_case {
    (name: $name:ident, input: $input:expr $(, $field:ident: $value:expr)* $(,)?) => {
        #[test]
        fn $name() {
            #[allow(unused_mut)]
            let mut case = cases::Case::new($input);
            $( case.$field($value); )*
            case.check();
        }
    };
}

static PERSON: Lazy<Arc<Class>> = Lazy::new(|| {
    ClassBuilder::<DynamicObject>::new("acme.Person")
        .field("name", TypeHint::Str)
        .field("age", TypeHint::Int)
        .slot_constructor()
        .method("greet", Some(1), TypeHint::Str, |me, args| {
            let name = me.get("name").unwrap_or(Value::Null);
            Ok(Value::str(format!("{} greets {}", name, args[0])))
        })
        .build()
});

/// `acme.Person { name, age }` with a `greet(other)` method.
pub fn person_class() -> Arc<Class> {
    PERSON.clone()
}

pub fn person(name: &str, age: i32) -> Value {
    let obj = DynamicObject::new(&PERSON, [("name", Value::str(name)), ("age", Value::Int(age))])
        .expect("person fields");
    Value::object(obj)
}
