//! Core evaluation logic.

use std::sync::Arc;

use ecow::{EcoString, eco_format};
use tracing::{debug, trace};

use super::operators;
use super::{Control, EvalError, EvalErrorKind, ExecutionMode};
use crate::accessor::resolve::{self, Lookup};
use crate::accessor::{
    Accessor, PropertyAccessError, PropertyAccessErrorKind, Replay, Resume, RootStep, SegmentInput,
    StepInput,
};
use crate::api::ExecutionOptions;
use crate::ast::{Ast, ClassRef, NodeId, NodeKind, Path, PathRoot, Segment, WithEntry};
use crate::casting;
use crate::parser::context::{Imports, ParserConfiguration};
use crate::parser::operators::BinaryOp;
use crate::resolver::{
    FunctionVariableResolverFactory, ItemResolverFactory, MapVariableResolverFactory,
    VariableResolver, VariableResolverFactory,
};
use crate::values::{Class, Function, HostError, ScriptFunction, TypeHint, Value, ValueMap};

type EvalResult = Result<Value, Control>;

/// Remaining native stack below which a nested evaluation moves to a fresh
/// heap-allocated segment.
const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_SEGMENT: usize = 1024 * 1024;

/// Walks one tree. A new evaluator is created for the body of a function
/// compiled into a different tree.
pub struct Evaluator<'e> {
    ast: &'e Arc<Ast>,
    config: &'e ParserConfiguration,
    imports: &'e Imports,
    options: &'e ExecutionOptions,
    depth: usize,
}

impl<'e> Evaluator<'e> {
    pub fn new(
        ast: &'e Arc<Ast>,
        config: &'e ParserConfiguration,
        imports: &'e Imports,
        options: &'e ExecutionOptions,
    ) -> Self {
        Self {
            ast,
            config,
            imports,
            options,
            depth: 0,
        }
    }

    /// Evaluates `root`, turning a top-level `return` into the result.
    pub fn run(
        &mut self,
        root: NodeId,
        ctx: &Value,
        factory: &dyn VariableResolverFactory,
    ) -> Result<Value, EvalError> {
        match self.eval(root, ctx, factory) {
            Ok(value) | Err(Control::Return(value)) => Ok(value),
            Err(Control::Error(err)) => Err(err),
        }
    }

    pub fn eval(&mut self, id: NodeId, ctx: &Value, factory: &dyn VariableResolverFactory) -> EvalResult {
        if self.depth >= self.options.max_depth {
            return Err(EvalErrorKind::StackOverflow {
                depth: self.depth,
                max_depth: self.options.max_depth,
            }
            .into());
        }
        self.depth += 1;
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || self.eval_node(id, ctx, factory));
        self.depth -= 1;

        result.map_err(|control| match control {
            Control::Error(err) => Control::Error(err.or_span(&self.ast.node(id).span)),
            other => other,
        })
    }

    fn eval_node(&mut self, id: NodeId, ctx: &Value, factory: &dyn VariableResolverFactory) -> EvalResult {
        let ast = self.ast;
        let node = ast.node(id);
        match &node.kind {
            NodeKind::Literal(value) => Ok(value.clone()),

            NodeKind::Path(_) | NodeKind::New { .. } => self.eval_cached(id, ctx, factory),

            NodeKind::Binary { op, lhs, rhs } => {
                let lhs = self.eval(*lhs, ctx, factory)?;
                let rhs = self.eval(*rhs, ctx, factory)?;
                Ok(operators::binary(*op, &lhs, &rhs)?)
            }

            NodeKind::And { lhs, rhs } => {
                if !self.eval_condition(*lhs, ctx, factory)? {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.eval_condition(*rhs, ctx, factory)?))
            }

            NodeKind::Or { lhs, rhs } => {
                if self.eval_condition(*lhs, ctx, factory)? {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.eval_condition(*rhs, ctx, factory)?))
            }

            NodeKind::Unary { op, operand } => {
                let operand = self.eval(*operand, ctx, factory)?;
                Ok(operators::unary(*op, &operand)?)
            }

            NodeKind::Ternary {
                cond,
                then,
                otherwise,
            } => {
                if self.eval_condition(*cond, ctx, factory)? {
                    self.eval(*then, ctx, factory)
                } else {
                    self.eval(*otherwise, ctx, factory)
                }
            }

            NodeKind::RegexMatch {
                lhs,
                pattern,
                compiled,
            } => {
                let value = self.eval(*lhs, ctx, factory)?;
                match compiled {
                    Some(re) => Ok(Value::Bool(operators::regex_matches(re, &value))),
                    None => {
                        let pattern = self.eval(*pattern, ctx, factory)?;
                        Ok(operators::binary(BinaryOp::Regex, &value, &pattern)?)
                    }
                }
            }

            NodeKind::InstanceOf { value, class } => {
                let value = self.eval(*value, ctx, factory)?;
                let result = match class {
                    ClassRef::Builtin(ty) => operators::is_builtin_instance(&value, ty),
                    ClassRef::Resolved(class) => is_class_instance(&value, class),
                    ClassRef::Named(name) => {
                        let class = self.lookup_class(name, ctx, factory)?;
                        is_class_instance(&value, &class)
                    }
                };
                Ok(Value::Bool(result))
            }

            NodeKind::Cast { ty, operand } => {
                let value = self.eval(*operand, ctx, factory)?;
                Ok(casting::coerce(value, ty)?)
            }

            NodeKind::IsDef(name) => {
                let lookup = make_lookup(self.config, self.imports, ctx, factory);
                Ok(Value::Bool(resolve::select_root(name, &[], &lookup).is_ok()))
            }

            NodeKind::InlineList(items) => Ok(Value::list(self.eval_all(items, ctx, factory)?)),

            NodeKind::InlineMap(entries) => {
                let mut map = ValueMap::new();
                for (key, value) in entries {
                    let key = self.eval(*key, ctx, factory)?;
                    let value = self.eval(*value, ctx, factory)?;
                    map.insert(key, value);
                }
                Ok(Value::map(map))
            }

            NodeKind::InlineArray { elem, items } => {
                let items = self
                    .eval_all(items, ctx, factory)?
                    .into_iter()
                    .map(|item| casting::coerce(item, elem))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::array(elem.clone(), items))
            }

            NodeKind::Projection {
                property,
                source,
                filter,
            } => {
                let source = self.eval(*source, ctx, factory)?;
                let mut projected = Vec::new();
                for item in items_of(&source)? {
                    if let Some(filter) = filter {
                        if !self.eval_condition(*filter, &item, factory)? {
                            continue;
                        }
                    }
                    projected.push(self.eval(*property, &item, factory)?);
                }
                Ok(Value::list(projected))
            }

            NodeKind::AssignVar { name, value } => {
                let value = self.eval(*value, ctx, factory)?;
                self.assign_name(name, value.clone(), ctx, factory)?;
                Ok(value)
            }

            NodeKind::AssignIndexed { slot, name, value } => {
                let value = self.eval(*value, ctx, factory)?;
                match factory.get_indexed_variable_resolver(*slot) {
                    Some(resolver) => resolver.set_value(value.clone())?,
                    None => self.assign_name(name, value.clone(), ctx, factory)?,
                }
                Ok(value)
            }

            NodeKind::AssignPath { target, value } => {
                let value = self.eval(*value, ctx, factory)?;
                self.assign_path(*target, value.clone(), ctx, factory)?;
                Ok(value)
            }

            NodeKind::CompoundAssign { target, op, value } => {
                let current = self.eval(*target, ctx, factory)?;
                let rhs = self.eval(*value, ctx, factory)?;
                let updated = operators::binary(*op, &current, &rhs)?;
                self.assign_path(*target, updated.clone(), ctx, factory)?;
                Ok(updated)
            }

            NodeKind::IncDec {
                target,
                delta,
                prefix,
            } => {
                let current = self.eval(*target, ctx, factory)?;
                let updated = operators::binary(BinaryOp::Add, &current, &Value::Int(i32::from(*delta)))?;
                self.assign_path(*target, updated.clone(), ctx, factory)?;
                Ok(if *prefix { updated } else { current })
            }

            NodeKind::Declare { name, ty, value } => {
                let value = match value {
                    Some(value) => self.eval(*value, ctx, factory)?,
                    None => default_value(ty),
                };
                let resolver = factory.create_typed_variable(name, ty.clone(), value)?;
                Ok(resolver.get_value())
            }

            NodeKind::Import(_) => Ok(Value::Null),

            NodeKind::Block { statements, scoped } => {
                if *scoped {
                    let scope = MapVariableResolverFactory::with_parent(factory);
                    self.eval_statements(statements, ctx, &scope)
                } else {
                    self.eval_statements(statements, ctx, factory)
                }
            }

            NodeKind::If {
                cond,
                then,
                otherwise,
            } => {
                if self.eval_condition(*cond, ctx, factory)? {
                    self.eval(*then, ctx, factory)
                } else if let Some(otherwise) = otherwise {
                    self.eval(*otherwise, ctx, factory)
                } else {
                    Ok(Value::Null)
                }
            }

            NodeKind::ForEach {
                item,
                item_ty,
                iterable,
                body,
            } => {
                let iterable = self.eval(*iterable, ctx, factory)?;
                let mut last = Value::Null;
                for element in items_of(&iterable)? {
                    let element = casting::coerce(element, item_ty)?;
                    let scope = ItemResolverFactory::new(
                        VariableResolver::new(item.clone(), item_ty.clone(), element),
                        factory,
                    );
                    last = self.eval(*body, ctx, &scope)?;
                }
                Ok(last)
            }

            NodeKind::For {
                init,
                cond,
                step,
                body,
            } => {
                let scope = MapVariableResolverFactory::with_parent(factory);
                if let Some(init) = init {
                    self.eval(*init, ctx, &scope)?;
                }
                let mut last = Value::Null;
                loop {
                    if let Some(cond) = cond {
                        if !self.eval_condition(*cond, ctx, &scope)? {
                            break;
                        }
                    }
                    last = self.eval(*body, ctx, &scope)?;
                    if let Some(step) = step {
                        self.eval(*step, ctx, &scope)?;
                    }
                }
                Ok(last)
            }

            NodeKind::While { cond, body, until } => {
                let mut last = Value::Null;
                while self.eval_condition(*cond, ctx, factory)? != *until {
                    last = self.eval(*body, ctx, factory)?;
                }
                Ok(last)
            }

            NodeKind::DoWhile { body, cond, until } => {
                let mut last;
                loop {
                    last = self.eval(*body, ctx, factory)?;
                    if self.eval_condition(*cond, ctx, factory)? == *until {
                        break;
                    }
                }
                Ok(last)
            }

            NodeKind::With { target, entries } => {
                let object = self.eval(*target, ctx, factory)?;
                if object.is_null() {
                    return Err(EvalErrorKind::NullWithTarget.into());
                }
                for entry in entries {
                    match entry {
                        WithEntry::Assign {
                            property,
                            op,
                            value,
                            span,
                        } => {
                            self.with_assign(&object, property, *op, *value, factory)
                                .map_err(|control| match control {
                                    Control::Error(err) => Control::Error(err.or_span(span)),
                                    other => other,
                                })?;
                        }
                        WithEntry::Statement(statement) => {
                            self.eval(*statement, &object, factory)?;
                        }
                    }
                }
                Ok(object)
            }

            NodeKind::Function { name, .. } => {
                let function = Value::Function(Arc::new(Function::Script(ScriptFunction {
                    ast: self.ast.clone(),
                    node: id,
                })));
                if let Some(name) = name {
                    factory.define_local(name, TypeHint::Any, function.clone());
                }
                Ok(function)
            }

            NodeKind::Return(value) => {
                let value = match value {
                    Some(value) => self.eval(*value, ctx, factory)?,
                    None => Value::Null,
                };
                Err(Control::Return(value))
            }

            NodeKind::Intercepted {
                name,
                interceptor,
                statement,
            } => {
                trace!(interceptor = %name, "before intercepted statement");
                interceptor
                    .do_before(node, factory)
                    .map_err(|err| host_error("interceptor", name, err))?;
                let value = self.eval(*statement, ctx, factory)?;
                interceptor
                    .do_after(&value, node, factory)
                    .map_err(|err| host_error("interceptor", name, err))?;
                Ok(value)
            }
        }
    }

    fn eval_condition(&mut self, id: NodeId, ctx: &Value, factory: &dyn VariableResolverFactory) -> Result<bool, Control> {
        let value = self.eval(id, ctx, factory)?;
        Ok(operators::truthy(&value)?)
    }

    fn eval_all(&mut self, ids: &[NodeId], ctx: &Value, factory: &dyn VariableResolverFactory) -> Result<Vec<Value>, Control> {
        ids.iter().map(|id| self.eval(*id, ctx, factory)).collect()
    }

    fn eval_statements(&mut self, statements: &[NodeId], ctx: &Value, factory: &dyn VariableResolverFactory) -> EvalResult {
        let mut last = Value::Null;
        for statement in statements {
            last = self.eval(*statement, ctx, factory)?;
        }
        Ok(last)
    }

    fn lookup_class(&self, name: &EcoString, ctx: &Value, factory: &dyn VariableResolverFactory) -> Result<Arc<Class>, Control> {
        make_lookup(self.config, self.imports, ctx, factory)
            .class(name)
            .ok_or_else(|| EvalErrorKind::UnknownClass(name.clone()).into())
    }

    // ========================================================================
    // Paths and constructors
    // ========================================================================

    /// Evaluates a path or constructor node, replaying its cached accessor
    /// when one exists. A stale replay continues from the segment where it
    /// stopped and publishes the patched accessor.
    fn eval_cached(&mut self, id: NodeId, ctx: &Value, factory: &dyn VariableResolverFactory) -> EvalResult {
        if self.options.mode == ExecutionMode::Interpreted {
            return self.resolve_recording(id, ctx, factory).map(|(value, _)| value);
        }
        let ast = self.ast;
        let node = ast.node(id);
        let config = self.config;

        if let Some(accessor) = node.accessor.get() {
            let resume = match self.replay(id, &accessor, ctx, factory) {
                Ok(value) => return Ok(value),
                Err(Deopt::Failed(control)) => return Err(control),
                Err(Deopt::Stale { reason, resume }) => {
                    debug!(node = id.0, reason, accessor = %accessor, "de-optimizing stale accessor");
                    node.accessor.invalidate(&accessor);
                    resume
                }
            };
            return match node.accessor.try_rebuild() {
                Some(_guard) => {
                    let (value, patched) = config.optimizer.reoptimize_accessor(self, id, resume, ctx, factory)?;
                    node.accessor.publish(patched);
                    Ok(value)
                }
                None => self.resume_recording(id, resume, ctx, factory).map(|(value, _)| value),
            };
        }

        match node.accessor.try_rebuild() {
            Some(_guard) => {
                let (value, accessor) = config.optimizer.optimize_accessor(self, id, ctx, factory)?;
                node.accessor.publish(accessor);
                Ok(value)
            }
            // Rebuilt elsewhere or further up this evaluation.
            None => self.resolve_recording(id, ctx, factory).map(|(value, _)| value),
        }
    }

    /// Resolves a path or constructor node from scratch, recording the
    /// decision taken at every segment.
    pub fn resolve_recording(
        &mut self,
        id: NodeId,
        ctx: &Value,
        factory: &dyn VariableResolverFactory,
    ) -> Result<(Value, Accessor), Control> {
        let ast = self.ast;
        match &ast.node(id).kind {
            NodeKind::Path(path) => self.resolve_path(path, path.segments.len(), ctx, factory),
            NodeKind::New { class, args } => {
                let class = match class {
                    ClassRef::Resolved(class) => class.clone(),
                    ClassRef::Named(name) => self.lookup_class(name, ctx, factory)?,
                    ClassRef::Builtin(ty) => {
                        return Err(EvalErrorKind::UnknownClass(eco_format!("{}", ty)).into());
                    }
                };
                let args = self.eval_all(args, ctx, factory)?;
                let value = instantiate(&class, &args)?;
                Ok((value, Accessor::new(RootStep::Class { class, name: None })))
            }
            _ => {
                let value = self.eval_node(id, ctx, factory)?;
                Ok((value, Accessor::new(RootStep::Expression)))
            }
        }
    }

    /// Continues the resolution a stale replay gave up on, recording from
    /// that point. Nothing the replay already evaluated is evaluated again.
    pub fn resume_recording(
        &mut self,
        id: NodeId,
        resume: Resume,
        ctx: &Value,
        factory: &dyn VariableResolverFactory,
    ) -> Result<(Value, Accessor), Control> {
        let ast = self.ast;
        let NodeKind::Path(path) = &ast.node(id).kind else {
            return self.resolve_recording(id, ctx, factory);
        };
        match resume {
            Resume::Restart => self.resolve_path(path, path.segments.len(), ctx, factory),
            Resume::RootCall { args } => {
                let PathRoot::Call { name, .. } = &path.root else {
                    return self.resolve_path(path, path.segments.len(), ctx, factory);
                };
                let (value, accessor) = self.call_root(name, args, ctx, factory)?;
                self.resolve_segments(&path.segments, 0, value, accessor, None, ctx, factory)
            }
            Resume::Segment {
                accessor,
                value,
                at,
                input,
            } => self.resolve_segments(&path.segments, at, value, accessor, input, ctx, factory),
        }
    }

    /// Resolves the root and the first `limit` segments of `path`.
    fn resolve_path(
        &mut self,
        path: &Path,
        limit: usize,
        ctx: &Value,
        factory: &dyn VariableResolverFactory,
    ) -> Result<(Value, Accessor), Control> {
        let lookup = make_lookup(self.config, self.imports, ctx, factory);
        let segments = &path.segments[..limit];

        let (value, accessor) = match &path.root {
            PathRoot::This => (ctx.clone(), Accessor::new(RootStep::This)),
            PathRoot::Indexed { slot, name } => match factory.get_indexed_variable_resolver(*slot) {
                Some(resolver) => (resolver.get_value(), Accessor::new(RootStep::Indexed(*slot))),
                None => named_root(name, segments, &lookup)?,
            },
            PathRoot::Name(name) => named_root(name, segments, &lookup)?,
            PathRoot::Node(root) => (
                self.eval(*root, ctx, factory)?,
                Accessor::new(RootStep::Expression),
            ),
            PathRoot::Call { name, args } => {
                let args = self.eval_all(args, ctx, factory)?;
                self.call_root(name, args, ctx, factory)?
            }
        };
        let start = accessor.skip.min(segments.len());
        self.resolve_segments(segments, start, value, accessor, None, ctx, factory)
    }

    /// Resolves `name(args)` at the root of a path with evaluated arguments.
    fn call_root(
        &mut self,
        name: &EcoString,
        args: Vec<Value>,
        ctx: &Value,
        factory: &dyn VariableResolverFactory,
    ) -> Result<(Value, Accessor), Control> {
        let lookup = make_lookup(self.config, self.imports, ctx, factory);
        let root = resolve::select_root_call(name, args.len(), &lookup)?;
        let value = resolve::apply_root(&root, &lookup, &args).map_err(settle)?;
        let value = match root {
            RootStep::CallFunction(_) => self.call_function(&value, args, ctx, factory)?,
            _ => value,
        };
        Ok((value, Accessor::new(root)))
    }

    /// Resolves `segments[start..]` from `value`, appending one step per
    /// segment to `accessor`. `pending` is the already evaluated input of
    /// the first segment, if any.
    #[allow(clippy::too_many_arguments)]
    fn resolve_segments(
        &mut self,
        segments: &[Segment],
        start: usize,
        mut value: Value,
        mut accessor: Accessor,
        mut pending: Option<SegmentInput>,
        ctx: &Value,
        factory: &dyn VariableResolverFactory,
    ) -> Result<(Value, Accessor), Control> {
        for segment in segments.iter().skip(start) {
            if value.is_null() {
                return null_hop(segment).map(|value| (value, accessor));
            }
            let input = match pending.take() {
                Some(input) => input,
                None => self.segment_input(segment, ctx, factory)?,
            };
            let (step, next) = resolve::resolve_step(&value, segment, input.as_step_input())?;
            accessor.steps.push(step);
            value = next;
        }
        Ok((value, accessor))
    }

    fn segment_input(
        &mut self,
        segment: &Segment,
        ctx: &Value,
        factory: &dyn VariableResolverFactory,
    ) -> Result<SegmentInput, Control> {
        Ok(match segment {
            Segment::Property { .. } => SegmentInput::None,
            Segment::Index { index, .. } => SegmentInput::Index(self.eval(*index, ctx, factory)?),
            Segment::Method { args, .. } => SegmentInput::Args(self.eval_all(args, ctx, factory)?),
        })
    }

    fn replay(
        &mut self,
        id: NodeId,
        accessor: &Accessor,
        ctx: &Value,
        factory: &dyn VariableResolverFactory,
    ) -> Result<Value, Deopt> {
        let ast = self.ast;
        let lookup = make_lookup(self.config, self.imports, ctx, factory);
        match &ast.node(id).kind {
            NodeKind::New { args, .. } => {
                let RootStep::Class { class, .. } = &accessor.root else {
                    return Err(Deopt::restart("constructor"));
                };
                let args = self.eval_all(args, ctx, factory)?;
                Ok(instantiate(class, &args).map_err(Control::from)?)
            }
            NodeKind::Path(path) => {
                let mut value = match (&path.root, &accessor.root) {
                    (PathRoot::Node(root), RootStep::Expression) => self.eval(*root, ctx, factory)?,
                    (PathRoot::Node(_), _) => return Err(Deopt::restart("root expression")),
                    (PathRoot::Call { args, .. }, root) => {
                        let args = self.eval_all(args, ctx, factory)?;
                        match resolve::apply_root(root, &lookup, &args) {
                            Ok(value) => match root {
                                RootStep::CallFunction(_) => self.call_function(&value, args, ctx, factory)?,
                                _ => value,
                            },
                            Err(Replay::Failed(control)) => return Err(Deopt::Failed(control)),
                            Err(Replay::Stale(reason)) => {
                                return Err(Deopt::Stale {
                                    reason,
                                    resume: Resume::RootCall { args },
                                });
                            }
                        }
                    }
                    (_, root) => match resolve::apply_root(root, &lookup, &[]) {
                        Ok(value) => value,
                        Err(Replay::Failed(control)) => return Err(Deopt::Failed(control)),
                        Err(Replay::Stale(reason)) => return Err(Deopt::restart(reason)),
                    },
                };

                for (at, segment) in path.segments.iter().enumerate().skip(accessor.skip) {
                    if value.is_null() {
                        return Ok(null_hop(segment)?);
                    }
                    let done = at - accessor.skip;
                    let Some(step) = accessor.steps.get(done) else {
                        return Err(Deopt::segment("partial accessor", accessor, done, value, at, None));
                    };
                    let input = self.segment_input(segment, ctx, factory)?;
                    match resolve::apply_step(step, &value, input.as_step_input()) {
                        Ok(next) => value = next,
                        Err(Replay::Failed(control)) => return Err(Deopt::Failed(control)),
                        Err(Replay::Stale(reason)) => {
                            return Err(Deopt::segment(reason, accessor, done, value, at, Some(input)));
                        }
                    }
                }
                Ok(value)
            }
            _ => Err(Deopt::restart("node kind")),
        }
    }

    // ========================================================================
    // Assignment
    // ========================================================================

    /// Writes a bare name: an existing variable, then a property or key of
    /// the root object, else a new variable in the nearest scope.
    fn assign_name(
        &mut self,
        name: &EcoString,
        value: Value,
        ctx: &Value,
        factory: &dyn VariableResolverFactory,
    ) -> Result<(), Control> {
        if let Some(resolver) = factory.get_resolver(name) {
            resolver.set_value(value)?;
            return Ok(());
        }
        let root_member = match ctx {
            Value::Object(obj) => obj.class().property(name).is_some(),
            Value::Map(map) => map.read().get_str(name).is_some(),
            _ => false,
        };
        if root_member {
            let segment = Segment::Property {
                name: name.clone(),
                null_safe: false,
            };
            resolve::assign_segment(ctx, &segment, None, value)?;
        } else {
            factory.create_variable(name, value)?;
        }
        Ok(())
    }

    /// Writes through the last segment of the path node `target`. The
    /// prefix is resolved without the accessor cache.
    fn assign_path(
        &mut self,
        target: NodeId,
        value: Value,
        ctx: &Value,
        factory: &dyn VariableResolverFactory,
    ) -> Result<(), Control> {
        let ast = self.ast;
        let NodeKind::Path(path) = &ast.node(target).kind else {
            return Err(not_assignable(ast.text(target)));
        };
        let Some((last, prefix)) = path.segments.split_last() else {
            return match &path.root {
                PathRoot::Name(name) => self.assign_name(name, value, ctx, factory),
                PathRoot::Indexed { slot, name } => match factory.get_indexed_variable_resolver(*slot) {
                    Some(resolver) => Ok(resolver.set_value(value)?),
                    None => self.assign_name(name, value, ctx, factory),
                },
                _ => Err(not_assignable(ast.text(target))),
            };
        };

        let (container, _) = self.resolve_path(path, prefix.len(), ctx, factory)?;
        if container.is_null() {
            return Err(
                PropertyAccessError::new(last.describe(), "null", PropertyAccessErrorKind::NullSegment).into(),
            );
        }
        let index = match last {
            Segment::Index { index, .. } => Some(self.eval(*index, ctx, factory)?),
            _ => None,
        };
        resolve::assign_segment(&container, last, index.as_ref(), value)?;
        Ok(())
    }

    fn with_assign(
        &mut self,
        object: &Value,
        property: &EcoString,
        op: Option<BinaryOp>,
        value: NodeId,
        factory: &dyn VariableResolverFactory,
    ) -> Result<(), Control> {
        let segment = Segment::Property {
            name: property.clone(),
            null_safe: false,
        };
        let value = self.eval(value, object, factory)?;
        let value = match op {
            Some(op) => {
                let (_, current) = resolve::resolve_step(object, &segment, StepInput::None)?;
                operators::binary(op, &current, &value)?
            }
            None => value,
        };
        resolve::assign_segment(object, &segment, None, value)?;
        Ok(())
    }

    // ========================================================================
    // Functions
    // ========================================================================

    fn call_function(
        &mut self,
        function: &Value,
        args: Vec<Value>,
        ctx: &Value,
        factory: &dyn VariableResolverFactory,
    ) -> EvalResult {
        let Value::Function(function) = function else {
            return Err(EvalErrorKind::NotCallable(function.type_name()).into());
        };
        let function = function.clone();
        let name = function.name();
        trace!(function = %name, argc = args.len(), "invoking function");

        match function.as_ref() {
            Function::Native(native) => {
                if let Some(expected) = native.arity {
                    if expected != args.len() {
                        return Err(EvalErrorKind::Arity {
                            name,
                            expected,
                            found: args.len(),
                        }
                        .into());
                    }
                }
                (native.func)(&args).map_err(|err| host_error("call", &name, err).into())
            }
            Function::Script(script) => {
                let NodeKind::Function { params, body, .. } = &script.ast.node(script.node).kind else {
                    return Err(EvalErrorKind::NotCallable(name).into());
                };
                if args.len() > params.len() {
                    return Err(EvalErrorKind::Arity {
                        name,
                        expected: params.len(),
                        found: args.len(),
                    }
                    .into());
                }
                let params: Vec<(EcoString, TypeHint)> = params
                    .iter()
                    .map(|param| (param.name.clone(), param.ty.clone()))
                    .collect();
                let frame = FunctionVariableResolverFactory::new(name, &params, args, factory)?;
                let mut callee = Evaluator {
                    ast: &script.ast,
                    config: self.config,
                    imports: self.imports,
                    options: self.options,
                    depth: self.depth,
                };
                match callee.eval(*body, ctx, &frame) {
                    Ok(value) | Err(Control::Return(value)) => Ok(value),
                    Err(err) => Err(err),
                }
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Why a cached accessor could not be replayed.
enum Deopt {
    /// The replay ran into a real failure; it is the caller's.
    Failed(Control),
    /// The accessor no longer fits; resolution continues from `resume`.
    Stale { reason: &'static str, resume: Resume },
}

impl Deopt {
    fn restart(reason: &'static str) -> Self {
        Deopt::Stale {
            reason,
            resume: Resume::Restart,
        }
    }

    /// Stale at segment `at`, after `done` steps of `accessor` applied.
    fn segment(
        reason: &'static str,
        accessor: &Accessor,
        done: usize,
        value: Value,
        at: usize,
        input: Option<SegmentInput>,
    ) -> Self {
        let mut kept = Accessor::new(accessor.root.clone());
        kept.skip = accessor.skip;
        kept.steps = accessor.steps[..done].to_vec();
        Deopt::Stale {
            reason,
            resume: Resume::Segment {
                accessor: kept,
                value,
                at,
                input,
            },
        }
    }
}

impl From<Control> for Deopt {
    fn from(control: Control) -> Self {
        Deopt::Failed(control)
    }
}

fn make_lookup<'a>(
    config: &'a ParserConfiguration,
    imports: &'a Imports,
    ctx: &'a Value,
    factory: &'a dyn VariableResolverFactory,
) -> Lookup<'a> {
    Lookup {
        ctx,
        factory,
        imports,
        registry: &config.registry,
        globals: &config.globals,
    }
}

fn named_root(
    name: &EcoString,
    segments: &[Segment],
    lookup: &Lookup<'_>,
) -> Result<(Value, Accessor), Control> {
    let (root, skip) = resolve::select_root(name, segments, lookup)?;
    let value = resolve::apply_root(&root, lookup, &[]).map_err(settle)?;
    let mut accessor = Accessor::new(root);
    accessor.skip = skip;
    Ok((value, accessor))
}

/// A freshly selected root never goes stale; treat it as unresolvable if
/// it does.
fn settle(replay: Replay) -> Control {
    match replay {
        Replay::Failed(control) => control,
        Replay::Stale(reason) => PropertyAccessError::new(
            reason,
            "root",
            PropertyAccessErrorKind::UnresolvableProperty,
        )
        .into(),
    }
}

fn null_hop(segment: &Segment) -> Result<Value, Control> {
    if segment.is_null_safe() {
        Ok(Value::Null)
    } else {
        Err(PropertyAccessError::new(segment.describe(), "null", PropertyAccessErrorKind::NullSegment).into())
    }
}

fn not_assignable(text: &str) -> Control {
    PropertyAccessError::new(text, "expression", PropertyAccessErrorKind::ReadOnly).into()
}

fn host_error(what: &str, target: &EcoString, err: HostError) -> EvalErrorKind {
    EvalErrorKind::Host {
        message: eco_format!("error in {} `{}`: {}", what, target, err),
        source: err,
    }
}

fn instantiate(class: &Arc<Class>, args: &[Value]) -> Result<Value, EvalErrorKind> {
    class
        .instantiate(args)
        .map_err(|err| host_error("constructor of", class.name(), err))
}

fn is_class_instance(value: &Value, class: &Class) -> bool {
    match value {
        Value::Object(obj) => obj.class().is_subclass_of(class),
        _ => false,
    }
}

/// Initial value of a declaration without initializer.
fn default_value(ty: &TypeHint) -> Value {
    match ty {
        TypeHint::Bool => Value::Bool(false),
        TypeHint::Char => Value::Char('\0'),
        TypeHint::Int => Value::Int(0),
        TypeHint::Long => Value::Long(0),
        TypeHint::Float => Value::Float(0.0),
        TypeHint::Double => Value::Double(0.0),
        _ => Value::Null,
    }
}

/// The elements visited by `foreach` and projections. Collections are
/// snapshotted so the body may modify them.
fn items_of(value: &Value) -> Result<Box<dyn Iterator<Item = Value>>, EvalErrorKind> {
    Ok(match value {
        Value::List(list) => Box::new(list.read().clone().into_iter()),
        Value::Array(array) => Box::new(array.items.read().clone().into_iter()),
        Value::Map(map) => Box::new(map.read().values().cloned().collect::<Vec<_>>().into_iter()),
        Value::Str(s) => Box::new(s.chars().collect::<Vec<_>>().into_iter().map(Value::Char)),
        Value::Int(n) => Box::new((1..=*n).map(Value::Int)),
        Value::Long(n) => Box::new((1..=*n).map(Value::Long)),
        other => return Err(EvalErrorKind::NotIterable(other.type_name())),
    })
}
