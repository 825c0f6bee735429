//! Kestrel core: lexer, parser, node arena, evaluator and host object model
//! of an embeddable expression language.
//!
//! Most embedders only need [`api`]: build an [`api::Engine`], compile
//! source into a [`api::CompiledExpression`], and evaluate it against a
//! context object and a [`resolver::VariableResolverFactory`].

pub mod accessor;
pub mod api;
pub mod ast;
pub mod casting;
pub mod evaluator;
pub mod interceptor;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod stdlib;
pub mod values;
