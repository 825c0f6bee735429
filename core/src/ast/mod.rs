//! Index-addressed syntax tree.
//!
//! Nodes live in a flat arena owned by [`Ast`] and refer to each other by
//! [`NodeId`]. The tree is immutable once the parser hands it over; the only
//! state that changes afterwards is each node's [`AccessorCache`], which is
//! safe to fill concurrently.

use core::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use ecow::EcoString;
use regex::Regex;
use smallvec::SmallVec;

use crate::accessor::AccessorCache;
use crate::interceptor::Interceptor;
use crate::parser::operators::{BinaryOp, UnaryOp};
use crate::parser::syntax::Span;
use crate::values::{Class, TypeHint, Value};

mod sexpr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u16 {
        /// The node is a constant.
        const LITERAL = 1 << 0;
        /// Binary, unary or boolean operator.
        const OPERATOR = 1 << 1;
        /// A bare identifier.
        const IDENTIFIER = 1 << 2;
        /// Writes a variable or property.
        const ASSIGNMENT = 1 << 3;
        /// A property path with more than one hop.
        const DEEP_PROPERTY = 1 << 4;
        /// Took effect at compile time (imports); evaluates to nothing.
        const COMPILE_IMMEDIATE = 1 << 5;
        /// Statement whose value is dropped by its enclosing block.
        const DISCARD = 1 << 6;
        /// A control-flow or function block.
        const BLOCK = 1 << 7;
        /// Contains at least one null-safe hop.
        const NULL_SAFE = 1 << 8;
    }
}

/// Root of a property path.
#[derive(Debug, Clone)]
pub enum PathRoot {
    /// A name resolved at runtime: variable, root property or class.
    Name(EcoString),
    /// A function parameter addressed by compile-time slot.
    Indexed { slot: usize, name: EcoString },
    This,
    /// Any other expression, e.g. `(a + b).toString()` or `[1, 2].size()`.
    Node(NodeId),
    /// `name(args)`: a function variable, or a method of the root object.
    Call { name: EcoString, args: Vec<NodeId> },
}

/// One hop after the root.
#[derive(Debug, Clone)]
pub enum Segment {
    Property { name: EcoString, null_safe: bool },
    Index { index: NodeId, null_safe: bool },
    Method {
        name: EcoString,
        args: Vec<NodeId>,
        null_safe: bool,
    },
}

impl Segment {
    pub fn is_null_safe(&self) -> bool {
        match self {
            Segment::Property { null_safe, .. }
            | Segment::Index { null_safe, .. }
            | Segment::Method { null_safe, .. } => *null_safe,
        }
    }

    /// Short rendering used in error messages.
    pub fn describe(&self) -> EcoString {
        match self {
            Segment::Property { name, .. } => name.clone(),
            Segment::Index { .. } => "[]".into(),
            Segment::Method { name, .. } => ecow::eco_format!("{}()", name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Path {
    pub root: PathRoot,
    pub segments: SmallVec<[Segment; 4]>,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: EcoString,
    pub ty: TypeHint,
}

/// Right-hand side of `instanceof` and target of `new`.
#[derive(Debug, Clone)]
pub enum ClassRef {
    /// A built-in value type (`String`, `int`, `List`, ...).
    Builtin(TypeHint),
    /// A host class resolved at compile time.
    Resolved(Arc<Class>),
    /// Resolved through imports and the registry when evaluated.
    Named(EcoString),
}

/// One entry of a `with` block.
#[derive(Debug, Clone)]
pub enum WithEntry {
    /// `name = value` or `name op= value` applied to the with-object.
    Assign {
        property: EcoString,
        op: Option<BinaryOp>,
        value: NodeId,
        span: Span,
    },
    /// Any other statement, evaluated with the with-object as root.
    Statement(NodeId),
}

pub enum NodeKind {
    Literal(Value),
    /// Property path, variable reference, call chain.
    Path(Path),
    Binary {
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    And {
        lhs: NodeId,
        rhs: NodeId,
    },
    Or {
        lhs: NodeId,
        rhs: NodeId,
    },
    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    Ternary {
        cond: NodeId,
        then: NodeId,
        otherwise: NodeId,
    },
    /// `lhs ~= pattern`, precompiled when the pattern is a literal.
    RegexMatch {
        lhs: NodeId,
        pattern: NodeId,
        compiled: Option<Regex>,
    },
    InstanceOf {
        value: NodeId,
        class: ClassRef,
    },
    Cast {
        ty: TypeHint,
        operand: NodeId,
    },
    IsDef(EcoString),
    InlineList(Vec<NodeId>),
    InlineMap(Vec<(NodeId, NodeId)>),
    InlineArray {
        elem: TypeHint,
        items: Vec<NodeId>,
    },
    New {
        class: ClassRef,
        args: Vec<NodeId>,
    },
    /// `(property in source if filter)`.
    Projection {
        property: NodeId,
        source: NodeId,
        filter: Option<NodeId>,
    },
    /// `name = value` on a plain variable.
    AssignVar {
        name: EcoString,
        value: NodeId,
    },
    /// `param = value` on a compile-time slot.
    AssignIndexed {
        slot: usize,
        name: EcoString,
        value: NodeId,
    },
    /// `path = value` where the last hop is a property or index.
    AssignPath {
        target: NodeId,
        value: NodeId,
    },
    /// `target op= value`; `target` is a `Path` node.
    CompoundAssign {
        target: NodeId,
        op: BinaryOp,
        value: NodeId,
    },
    /// `++x`, `x--`, ...
    IncDec {
        target: NodeId,
        delta: i8,
        prefix: bool,
    },
    /// `int x = 1`, `var y`.
    Declare {
        name: EcoString,
        ty: TypeHint,
        value: Option<NodeId>,
    },
    Import(EcoString),
    /// Statement sequence. `scoped` blocks open a fresh variable scope.
    Block {
        statements: Vec<NodeId>,
        scoped: bool,
    },
    If {
        cond: NodeId,
        then: NodeId,
        otherwise: Option<NodeId>,
    },
    ForEach {
        item: EcoString,
        item_ty: TypeHint,
        iterable: NodeId,
        body: NodeId,
    },
    For {
        init: Option<NodeId>,
        cond: Option<NodeId>,
        step: Option<NodeId>,
        body: NodeId,
    },
    While {
        cond: NodeId,
        body: NodeId,
        until: bool,
    },
    DoWhile {
        body: NodeId,
        cond: NodeId,
        until: bool,
    },
    With {
        target: NodeId,
        entries: Vec<WithEntry>,
    },
    Function {
        name: Option<EcoString>,
        params: Vec<Param>,
        body: NodeId,
    },
    Return(Option<NodeId>),
    Intercepted {
        name: EcoString,
        interceptor: Arc<dyn Interceptor>,
        statement: NodeId,
    },
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Literal(_) => "literal",
            NodeKind::Path(_) => "property",
            NodeKind::Binary { .. } => "binary operation",
            NodeKind::And { .. } => "and",
            NodeKind::Or { .. } => "or",
            NodeKind::Unary { .. } => "unary operation",
            NodeKind::Ternary { .. } => "ternary",
            NodeKind::RegexMatch { .. } => "regex match",
            NodeKind::InstanceOf { .. } => "instanceof",
            NodeKind::Cast { .. } => "cast",
            NodeKind::IsDef(_) => "isdef",
            NodeKind::InlineList(_) => "inline list",
            NodeKind::InlineMap(_) => "inline map",
            NodeKind::InlineArray { .. } => "inline array",
            NodeKind::New { .. } => "constructor",
            NodeKind::Projection { .. } => "projection",
            NodeKind::AssignVar { .. } => "assignment",
            NodeKind::AssignIndexed { .. } => "assignment",
            NodeKind::AssignPath { .. } => "property assignment",
            NodeKind::CompoundAssign { .. } => "compound assignment",
            NodeKind::IncDec { .. } => "increment",
            NodeKind::Declare { .. } => "declaration",
            NodeKind::Import(_) => "import",
            NodeKind::Block { .. } => "block",
            NodeKind::If { .. } => "if",
            NodeKind::ForEach { .. } => "foreach",
            NodeKind::For { .. } => "for",
            NodeKind::While { until: false, .. } => "while",
            NodeKind::While { until: true, .. } => "until",
            NodeKind::DoWhile { .. } => "do",
            NodeKind::With { .. } => "with",
            NodeKind::Function { .. } => "function",
            NodeKind::Return(_) => "return",
            NodeKind::Intercepted { .. } => "interceptor",
        }
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            NodeKind::Path(p) => f.debug_tuple("Path").field(p).finish(),
            NodeKind::Binary { op, lhs, rhs } => f
                .debug_struct("Binary")
                .field("op", op)
                .field("lhs", lhs)
                .field("rhs", rhs)
                .finish(),
            NodeKind::Intercepted {
                name, statement, ..
            } => f
                .debug_struct("Intercepted")
                .field("name", name)
                .field("statement", statement)
                .finish(),
            other => write!(f, "{}", other.name()),
        }
    }
}

pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub flags: NodeFlags,
    /// Statically known result type.
    pub egress: TypeHint,
    pub accessor: AccessorCache,
}

impl Node {
    pub fn is_literal(&self) -> bool {
        self.flags.contains(NodeFlags::LITERAL)
    }

    pub fn literal(&self) -> Option<&Value> {
        match &self.kind {
            NodeKind::Literal(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind)
            .field("span", &self.span)
            .field("flags", &self.flags)
            .field("egress", &self.egress)
            .finish()
    }
}

/// The arena of a compiled expression.
pub struct Ast {
    nodes: Vec<Node>,
    source: Arc<str>,
}

static_assertions::assert_impl_all!(Ast: Send, Sync);

impl Ast {
    pub fn new(source: Arc<str>) -> Self {
        Self {
            nodes: Vec::new(),
            source,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn source_arc(&self) -> &Arc<str> {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn push(&mut self, kind: NodeKind, span: Span, flags: NodeFlags, egress: TypeHint) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            span,
            flags,
            egress,
            accessor: AccessorCache::default(),
        });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Replaces a node in place, keeping its id. Used when the parser
    /// rewrites an already-built operand (folding, assignment targets).
    pub fn replace(&mut self, id: NodeId, kind: NodeKind, flags: NodeFlags, egress: TypeHint) {
        let node = &mut self.nodes[id.index()];
        node.kind = kind;
        node.flags = flags;
        node.egress = egress;
        node.accessor = AccessorCache::default();
    }

    pub fn text(&self, id: NodeId) -> &str {
        self.node(id).span.str_of(&self.source)
    }

    /// Number of nodes reachable from `root`.
    pub fn reachable_count(&self, root: NodeId) -> usize {
        let mut count = 0;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            count += 1;
            self.children(id, &mut stack);
        }
        count
    }

    /// Appends the direct children of `id` to `out`.
    pub fn children(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let opt = |out: &mut Vec<NodeId>, n: &Option<NodeId>| out.extend(n.iter().copied());
        match &self.node(id).kind {
            NodeKind::Literal(_) | NodeKind::IsDef(_) | NodeKind::Import(_) => {}
            NodeKind::Path(path) => {
                match &path.root {
                    PathRoot::Node(n) => out.push(*n),
                    PathRoot::Call { args, .. } => out.extend(args),
                    _ => {}
                }
                for segment in &path.segments {
                    match segment {
                        Segment::Index { index, .. } => out.push(*index),
                        Segment::Method { args, .. } => out.extend(args),
                        Segment::Property { .. } => {}
                    }
                }
            }
            NodeKind::Binary { lhs, rhs, .. }
            | NodeKind::And { lhs, rhs }
            | NodeKind::Or { lhs, rhs } => out.extend([*lhs, *rhs]),
            NodeKind::RegexMatch { lhs, pattern, .. } => out.extend([*lhs, *pattern]),
            NodeKind::Unary { operand, .. } | NodeKind::Cast { operand, .. } => out.push(*operand),
            NodeKind::InstanceOf { value, .. } => out.push(*value),
            NodeKind::Ternary {
                cond,
                then,
                otherwise,
            } => out.extend([*cond, *then, *otherwise]),
            NodeKind::InlineList(items) | NodeKind::InlineArray { items, .. } => out.extend(items),
            NodeKind::InlineMap(entries) => {
                for (k, v) in entries {
                    out.extend([*k, *v]);
                }
            }
            NodeKind::New { args, .. } => out.extend(args),
            NodeKind::Projection {
                property,
                source,
                filter,
            } => {
                out.extend([*property, *source]);
                opt(out, filter);
            }
            NodeKind::AssignVar { value, .. } | NodeKind::AssignIndexed { value, .. } => {
                out.push(*value)
            }
            NodeKind::AssignPath { target, value } | NodeKind::CompoundAssign { target, value, .. } => {
                out.extend([*target, *value])
            }
            NodeKind::IncDec { target, .. } => out.push(*target),
            NodeKind::Declare { value, .. } => opt(out, value),
            NodeKind::Block { statements, .. } => out.extend(statements),
            NodeKind::If {
                cond,
                then,
                otherwise,
            } => {
                out.extend([*cond, *then]);
                opt(out, otherwise);
            }
            NodeKind::ForEach { iterable, body, .. } => out.extend([*iterable, *body]),
            NodeKind::For {
                init,
                cond,
                step,
                body,
            } => {
                opt(out, init);
                opt(out, cond);
                opt(out, step);
                out.push(*body);
            }
            NodeKind::While { cond, body, .. } | NodeKind::DoWhile { body, cond, .. } => {
                out.extend([*cond, *body])
            }
            NodeKind::With { target, entries } => {
                out.push(*target);
                for entry in entries {
                    match entry {
                        WithEntry::Assign { value, .. } => out.push(*value),
                        WithEntry::Statement(n) => out.push(*n),
                    }
                }
            }
            NodeKind::Function { body, .. } => out.push(*body),
            NodeKind::Return(value) => opt(out, value),
            NodeKind::Intercepted { statement, .. } => out.push(*statement),
        }
    }
}

impl fmt::Debug for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ast")
            .field("source", &self.source)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}
