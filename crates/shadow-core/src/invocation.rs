//! Dual execution of one call
//!
//! An [`Invocation`] runs the reference operation on the caller's arguments
//! and the candidate operation on an independent deep copy, then decides
//! whether the two results diverge.

use crate::binding::MethodBinding;
use crate::compare::{structurally_equal, Comparability, DeepCloner};
use crate::error::CallError;
use crate::render;
use crate::report::{DivergenceNotice, Reporter};
use crate::surface::{CallContext, Operation};
use crate::value::{Callback, Value};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::debug;

/// One call with its reference and candidate results
#[derive(Debug)]
pub struct Invocation {
    method: Arc<MethodBinding>,
    args: Vec<Value>,
    reference_result: Value,
    candidate_result: Option<Value>,
}

impl Invocation {
    /// Run the call
    ///
    /// The argument copy for the candidate is taken before the reference runs,
    /// so mutations made by the reference are not visible to the candidate.
    ///
    /// # Errors
    /// Returns the reference operation's error unchanged. Candidate errors and
    /// panics are absorbed.
    ///
    /// # Panics
    /// Propagates a panic of the reference operation. A candidate panic is
    /// caught, but the process panic hook runs before the unwind is caught,
    /// so the default hook still prints the message to stderr. Install a
    /// quiet hook with [`std::panic::set_hook`] if candidate panics are
    /// expected.
    pub fn invoke(
        method: Arc<MethodBinding>,
        args: &[Value],
        context: &CallContext,
    ) -> Result<Self, CallError> {
        let candidate = if method.ignore_differences() {
            None
        } else {
            method.candidate_fn().cloned()
        };
        let Some(candidate) = candidate else {
            let reference_result = method.call_reference(context, args)?;
            return Ok(Self {
                method,
                args: args.to_vec(),
                reference_result,
                candidate_result: None,
            });
        };

        let mut cloner = DeepCloner::new();
        let mut candidate_args = cloner.clone_all(args);
        let candidate_context = context.deep_clone_with(&mut cloner);

        if let Some(meta) = method.iteration() {
            let index = meta.iteratee_index;
            if method.needs_identity(candidate_args.get(index)) {
                candidate_args[index] = Value::Function(Callback::identity());
            }
        }

        let reference_result = method.call_reference(context, args)?;
        let candidate_result =
            run_isolated(&method, &candidate, &candidate_context, &candidate_args);

        Ok(Self {
            method,
            args: args.to_vec(),
            reference_result,
            candidate_result,
        })
    }

    /// Binding this call went through
    #[inline]
    #[must_use]
    pub fn method(&self) -> &MethodBinding {
        &self.method
    }

    /// Arguments as passed by the caller
    #[inline]
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    #[inline]
    #[must_use]
    pub fn reference_result(&self) -> &Value {
        &self.reference_result
    }

    /// Candidate result; `None` when it was not run or failed
    #[inline]
    #[must_use]
    pub fn candidate_result(&self) -> Option<&Value> {
        self.candidate_result.as_ref()
    }

    /// Whether the results diverge
    ///
    /// An absent candidate result is treated as `undefined`. Bindings that
    /// ignore differences or lack a candidate never diverge.
    #[must_use]
    pub fn results_differ(&self, comparability: &dyn Comparability) -> bool {
        if self.method.ignore_differences() || !self.method.has_candidate() {
            return false;
        }

        let absent = Value::Undefined;
        let candidate = self.candidate_result.as_ref().unwrap_or(&absent);

        if comparability.is_comparable(&self.reference_result) {
            !structurally_equal(&self.reference_result, candidate)
        } else {
            comparability.is_comparable(candidate)
        }
    }

    /// Render this call for a divergence message
    #[must_use]
    pub fn for_display(&self, max_width: usize) -> DivergenceNotice {
        let absent = Value::Undefined;
        DivergenceNotice {
            name: self.method.name().to_string(),
            args: render::args_for_display(&self.args, max_width),
            old_result: render::for_display(&self.reference_result, max_width),
            new_result: render::for_display(
                self.candidate_result.as_ref().unwrap_or(&absent),
                max_width,
            ),
            old_version: self.method.reference_version().to_string(),
            new_version: self.method.candidate_version().to_string(),
        }
    }

    /// Report the rename (if any) and the divergence (if any)
    ///
    /// Returns whether the results diverged.
    pub fn report(&self, reporter: &Reporter) -> bool {
        let config = reporter.config();

        if let Some(notice) = self.method.rename_notice() {
            reporter.report_rename(&notice);
        }

        let diverged = self.results_differ(config.comparability.as_ref());
        if diverged {
            reporter.report_divergence(&self.for_display(config.max_width));
        }
        diverged
    }

    /// Take the reference result
    #[inline]
    #[must_use]
    pub fn into_reference_result(self) -> Value {
        self.reference_result
    }
}

fn run_isolated(
    method: &MethodBinding,
    candidate: &Operation,
    context: &CallContext,
    args: &[Value],
) -> Option<Value> {
    match panic::catch_unwind(AssertUnwindSafe(|| candidate(context, args))) {
        Ok(Ok(result)) => Some(result),
        Ok(Err(error)) => {
            debug!(
                operation = method.name(),
                candidate = method.candidate_name(),
                %error,
                "candidate raised; result treated as absent"
            );
            None
        }
        Err(payload) => {
            debug!(
                operation = method.name(),
                candidate = method.candidate_name(),
                panic = %panic_message(payload.as_ref()),
                "candidate panicked; result treated as absent"
            );
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
