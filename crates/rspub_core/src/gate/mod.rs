//! Resource gates.
//!
//! A gate holds two predicate lists. A resource passes iff it matches at
//! least one accept predicate (an empty accept list accepts everything) and
//! no reject predicate. Gates are assembled by chaining [`GateBuilder`]s.

mod builder;
pub mod predicate;

pub use builder::{DefaultGateBuilder, GateBuilder, ResourceGateBuilder, SelectorGateBuilder};
pub use predicate::{Predicate, SharedPredicate};

use crate::error::GateEvaluationError;
use rspub_model::ResourceDescriptor;
use tracing::warn;

/// An immutable accept/reject filter.
#[derive(Debug, Clone, Default)]
pub struct ResourceGate {
    accept: Vec<SharedPredicate>,
    reject: Vec<SharedPredicate>,
}

impl ResourceGate {
    /// Creates a gate from predicate lists.
    #[must_use]
    pub fn new(accept: Vec<SharedPredicate>, reject: Vec<SharedPredicate>) -> Self {
        Self { accept, reject }
    }

    /// A gate that lets everything through.
    #[must_use]
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// Returns true if the gate has no predicates at all.
    #[must_use]
    pub fn is_accept_all(&self) -> bool {
        self.accept.is_empty() && self.reject.is_empty()
    }

    /// Accept predicates.
    #[must_use]
    pub fn accept(&self) -> &[SharedPredicate] {
        &self.accept
    }

    /// Reject predicates.
    #[must_use]
    pub fn reject(&self) -> &[SharedPredicate] {
        &self.reject
    }

    /// Decides whether a resource passes.
    ///
    /// # Errors
    ///
    /// Returns the first predicate failure.
    pub fn check(&self, resource: &ResourceDescriptor) -> Result<bool, GateEvaluationError> {
        if !self.accept.is_empty() {
            let mut accepted = false;
            for predicate in &self.accept {
                if predicate.evaluate(resource)? {
                    accepted = true;
                    break;
                }
            }
            if !accepted {
                return Ok(false);
            }
        }
        for predicate in &self.reject {
            if predicate.evaluate(resource)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Like [`ResourceGate::check`], treating a failure as a rejection.
    #[must_use]
    pub fn passes(&self, resource: &ResourceDescriptor) -> bool {
        match self.check(resource) {
            Ok(passed) => passed,
            Err(e) => {
                warn!(path = %resource.path.display(), error = %e, "gate predicate failed, rejecting");
                false
            }
        }
    }
}
