//! S-expression rendering of a subtree, for tests and `--debug-parse`.
//!
//! Spans, flags and cached accessors are left out, so two sources that
//! parse to the same shape render identically.

use core::fmt::{self, Write};

use super::{Ast, ClassRef, NodeId, NodeKind, PathRoot, Segment, WithEntry};

impl Ast {
    /// Renders the subtree rooted at `id`.
    pub fn sexpr(&self, id: NodeId) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_sexpr(&mut out, id);
        out
    }

    fn write_list(&self, out: &mut String, ids: &[NodeId]) -> fmt::Result {
        for id in ids {
            out.push(' ');
            self.write_sexpr(out, *id)?;
        }
        Ok(())
    }

    fn write_opt(&self, out: &mut String, id: Option<NodeId>) -> fmt::Result {
        out.push(' ');
        match id {
            Some(id) => self.write_sexpr(out, id),
            None => {
                out.push('_');
                Ok(())
            }
        }
    }

    fn write_sexpr(&self, out: &mut String, id: NodeId) -> fmt::Result {
        match &self.node(id).kind {
            NodeKind::Literal(value) => write!(out, "{:?}", value),
            NodeKind::Path(path) => {
                let bare = path.segments.is_empty();
                if !bare {
                    out.push_str("(path ");
                }
                match &path.root {
                    PathRoot::Name(name) => out.push_str(name),
                    PathRoot::Indexed { slot, name } => write!(out, "{}#{}", name, slot)?,
                    PathRoot::This => out.push_str("this"),
                    PathRoot::Node(node) => self.write_sexpr(out, *node)?,
                    PathRoot::Call { name, args } => {
                        write!(out, "(call {}", name)?;
                        self.write_list(out, args)?;
                        out.push(')');
                    }
                }
                for segment in &path.segments {
                    let safe = if segment.is_null_safe() { "?" } else { "" };
                    match segment {
                        Segment::Property { name, .. } => write!(out, " .{}{}", safe, name)?,
                        Segment::Index { index, .. } => {
                            out.push_str(" [");
                            self.write_sexpr(out, *index)?;
                            out.push(']');
                        }
                        Segment::Method { name, args, .. } => {
                            write!(out, " (.{}{}", safe, name)?;
                            self.write_list(out, args)?;
                            out.push(')');
                        }
                    }
                }
                if !bare {
                    out.push(')');
                }
                Ok(())
            }
            NodeKind::Binary { op, lhs, rhs } => {
                write!(out, "({}", op)?;
                self.write_list(out, &[*lhs, *rhs])?;
                out.push(')');
                Ok(())
            }
            NodeKind::And { lhs, rhs } => {
                out.push_str("(&&");
                self.write_list(out, &[*lhs, *rhs])?;
                out.push(')');
                Ok(())
            }
            NodeKind::Or { lhs, rhs } => {
                out.push_str("(||");
                self.write_list(out, &[*lhs, *rhs])?;
                out.push(')');
                Ok(())
            }
            NodeKind::Unary { op, operand } => {
                write!(out, "({}", op)?;
                self.write_list(out, &[*operand])?;
                out.push(')');
                Ok(())
            }
            NodeKind::Ternary {
                cond,
                then,
                otherwise,
            } => {
                out.push_str("(?");
                self.write_list(out, &[*cond, *then, *otherwise])?;
                out.push(')');
                Ok(())
            }
            NodeKind::RegexMatch { lhs, pattern, .. } => {
                out.push_str("(~=");
                self.write_list(out, &[*lhs, *pattern])?;
                out.push(')');
                Ok(())
            }
            NodeKind::InstanceOf { value, class } => {
                out.push_str("(instanceof ");
                self.write_sexpr(out, *value)?;
                match class {
                    ClassRef::Builtin(ty) => write!(out, " {})", ty),
                    ClassRef::Resolved(class) => write!(out, " {})", class.name()),
                    ClassRef::Named(name) => write!(out, " {})", name),
                }
            }
            NodeKind::Cast { ty, operand } => {
                write!(out, "(cast {}", ty)?;
                self.write_list(out, &[*operand])?;
                out.push(')');
                Ok(())
            }
            NodeKind::IsDef(name) => write!(out, "(isdef {})", name),
            NodeKind::InlineList(items) => {
                out.push_str("(list");
                self.write_list(out, items)?;
                out.push(')');
                Ok(())
            }
            NodeKind::InlineMap(entries) => {
                out.push_str("(map");
                for (key, value) in entries {
                    out.push_str(" (");
                    self.write_sexpr(out, *key)?;
                    self.write_list(out, &[*value])?;
                    out.push(')');
                }
                out.push(')');
                Ok(())
            }
            NodeKind::InlineArray { elem, items } => {
                write!(out, "(array {}", elem)?;
                self.write_list(out, items)?;
                out.push(')');
                Ok(())
            }
            NodeKind::New { class, args } => {
                match class {
                    ClassRef::Builtin(ty) => write!(out, "(new {}", ty)?,
                    ClassRef::Resolved(class) => write!(out, "(new {}", class.name())?,
                    ClassRef::Named(name) => write!(out, "(new {}", name)?,
                }
                self.write_list(out, args)?;
                out.push(')');
                Ok(())
            }
            NodeKind::Projection {
                property,
                source,
                filter,
            } => {
                out.push_str("(project");
                self.write_list(out, &[*property, *source])?;
                self.write_opt(out, *filter)?;
                out.push(')');
                Ok(())
            }
            NodeKind::AssignVar { name, value } => {
                write!(out, "(= {}", name)?;
                self.write_list(out, &[*value])?;
                out.push(')');
                Ok(())
            }
            NodeKind::AssignIndexed { slot, name, value } => {
                write!(out, "(= {}#{}", name, slot)?;
                self.write_list(out, &[*value])?;
                out.push(')');
                Ok(())
            }
            NodeKind::AssignPath { target, value } => {
                out.push_str("(=");
                self.write_list(out, &[*target, *value])?;
                out.push(')');
                Ok(())
            }
            NodeKind::CompoundAssign { target, op, value } => {
                write!(out, "({}=", op)?;
                self.write_list(out, &[*target, *value])?;
                out.push(')');
                Ok(())
            }
            NodeKind::IncDec {
                target,
                delta,
                prefix,
            } => {
                let op = if *delta > 0 { "++" } else { "--" };
                let fix = if *prefix { "pre" } else { "post" };
                write!(out, "({}{}", fix, op)?;
                self.write_list(out, &[*target])?;
                out.push(')');
                Ok(())
            }
            NodeKind::Declare { name, ty, value } => {
                write!(out, "(declare {} {}", ty, name)?;
                if let Some(value) = value {
                    self.write_list(out, &[*value])?;
                }
                out.push(')');
                Ok(())
            }
            NodeKind::Import(path) => write!(out, "(import {})", path),
            NodeKind::Block { statements, scoped } => {
                out.push_str(if *scoped { "(scope" } else { "(block" });
                self.write_list(out, statements)?;
                out.push(')');
                Ok(())
            }
            NodeKind::If {
                cond,
                then,
                otherwise,
            } => {
                out.push_str("(if");
                self.write_list(out, &[*cond, *then])?;
                self.write_opt(out, *otherwise)?;
                out.push(')');
                Ok(())
            }
            NodeKind::ForEach {
                item,
                item_ty,
                iterable,
                body,
            } => {
                write!(out, "(foreach {} {}", item_ty, item)?;
                self.write_list(out, &[*iterable, *body])?;
                out.push(')');
                Ok(())
            }
            NodeKind::For {
                init,
                cond,
                step,
                body,
            } => {
                out.push_str("(for");
                self.write_opt(out, *init)?;
                self.write_opt(out, *cond)?;
                self.write_opt(out, *step)?;
                self.write_list(out, &[*body])?;
                out.push(')');
                Ok(())
            }
            NodeKind::While { cond, body, until } => {
                out.push_str(if *until { "(until" } else { "(while" });
                self.write_list(out, &[*cond, *body])?;
                out.push(')');
                Ok(())
            }
            NodeKind::DoWhile { body, cond, until } => {
                out.push_str(if *until { "(do-until" } else { "(do-while" });
                self.write_list(out, &[*body, *cond])?;
                out.push(')');
                Ok(())
            }
            NodeKind::With { target, entries } => {
                out.push_str("(with ");
                self.write_sexpr(out, *target)?;
                for entry in entries {
                    match entry {
                        WithEntry::Assign {
                            property, op, value, ..
                        } => {
                            match op {
                                Some(op) => write!(out, " ({}= {}", op, property)?,
                                None => write!(out, " (= {}", property)?,
                            }
                            self.write_list(out, &[*value])?;
                            out.push(')');
                        }
                        WithEntry::Statement(statement) => self.write_list(out, &[*statement])?,
                    }
                }
                out.push(')');
                Ok(())
            }
            NodeKind::Function { name, params, body } => {
                write!(out, "(def {} (", name.as_deref().unwrap_or("_"))?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    out.push_str(&param.name);
                }
                out.push(')');
                self.write_list(out, &[*body])?;
                out.push(')');
                Ok(())
            }
            NodeKind::Return(value) => {
                out.push_str("(return");
                self.write_opt(out, *value)?;
                out.push(')');
                Ok(())
            }
            NodeKind::Intercepted {
                name, statement, ..
            } => {
                write!(out, "(@{}", name)?;
                self.write_list(out, &[*statement])?;
                out.push(')');
                Ok(())
            }
        }
    }
}
