use core::fmt;

use tracing::trace;

use super::{Accessor, Resume};
use crate::ast::NodeId;
use crate::evaluator::{Control, Evaluator};
use crate::resolver::VariableResolverFactory;
use crate::values::Value;

/// Strategy that builds accessors for path and constructor nodes.
///
/// Implementations resolve the node once against live values and return
/// both the value and an accessor able to replay the resolution. The
/// evaluator owns caching, replay and de-optimization.
pub trait AccessorOptimizer: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn optimize_accessor(
        &self,
        eval: &mut Evaluator<'_>,
        node: NodeId,
        ctx: &Value,
        factory: &dyn VariableResolverFactory,
    ) -> Result<(Value, Accessor), Control>;

    /// Rebuilds an accessor whose replay went stale at `resume`. Must not
    /// evaluate again what the replay already evaluated.
    fn reoptimize_accessor(
        &self,
        eval: &mut Evaluator<'_>,
        node: NodeId,
        resume: Resume,
        ctx: &Value,
        factory: &dyn VariableResolverFactory,
    ) -> Result<(Value, Accessor), Control> {
        eval.resume_recording(node, resume, ctx, factory)
    }
}

/// Builds accessors by inspecting runtime values, one segment at a time.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReflectiveAccessorOptimizer;

impl AccessorOptimizer for ReflectiveAccessorOptimizer {
    fn name(&self) -> &str {
        "reflective"
    }

    fn optimize_accessor(
        &self,
        eval: &mut Evaluator<'_>,
        node: NodeId,
        ctx: &Value,
        factory: &dyn VariableResolverFactory,
    ) -> Result<(Value, Accessor), Control> {
        let (value, accessor) = eval.resolve_recording(node, ctx, factory)?;
        trace!(node = node.0, accessor = %accessor, "built accessor");
        Ok((value, accessor))
    }

    fn reoptimize_accessor(
        &self,
        eval: &mut Evaluator<'_>,
        node: NodeId,
        resume: Resume,
        ctx: &Value,
        factory: &dyn VariableResolverFactory,
    ) -> Result<(Value, Accessor), Control> {
        let (value, accessor) = eval.resume_recording(node, resume, ctx, factory)?;
        trace!(node = node.0, accessor = %accessor, "patched accessor");
        Ok((value, accessor))
    }
}
