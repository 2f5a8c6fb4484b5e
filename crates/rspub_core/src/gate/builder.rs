//! Gate builders.

use super::predicate::{all, any, glob, hidden, not, under, SharedPredicate};
use super::ResourceGate;
use rspub_model::{Configuration, ConfigurationError, Selector};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// One stage of gate assembly.
///
/// Each stage receives the lists built so far and returns new ones. It may
/// extend, replace or prune them.
pub trait GateBuilder: Send + Sync {
    /// Name used in logs and configuration.
    fn name(&self) -> &str;

    /// Builds the accept list.
    fn build_accept(
        &self,
        accept: Vec<SharedPredicate>,
    ) -> Result<Vec<SharedPredicate>, ConfigurationError> {
        Ok(accept)
    }

    /// Builds the reject list.
    fn build_reject(
        &self,
        reject: Vec<SharedPredicate>,
    ) -> Result<Vec<SharedPredicate>, ConfigurationError> {
        Ok(reject)
    }
}

/// Accepts the resource directory and rejects what must never be published.
///
/// Rejected: anything outside the resource directory, hidden files, the
/// metadata directory and `.well-known/resourcesync`.
#[derive(Debug, Clone)]
pub struct DefaultGateBuilder {
    resource_dir: PathBuf,
    metadata_dir: PathBuf,
}

impl DefaultGateBuilder {
    /// Creates the builder for explicit directories.
    pub fn new(resource_dir: impl Into<PathBuf>, metadata_dir: impl Into<PathBuf>) -> Self {
        Self {
            resource_dir: resource_dir.into(),
            metadata_dir: metadata_dir.into(),
        }
    }

    /// Creates the builder for a configuration.
    #[must_use]
    pub fn for_configuration(config: &Configuration) -> Self {
        Self::new(&config.resource_dir, &config.output_dir)
    }
}

impl GateBuilder for DefaultGateBuilder {
    fn name(&self) -> &str {
        "default"
    }

    fn build_accept(
        &self,
        mut accept: Vec<SharedPredicate>,
    ) -> Result<Vec<SharedPredicate>, ConfigurationError> {
        accept.push(under(&self.resource_dir));
        Ok(accept)
    }

    fn build_reject(
        &self,
        mut reject: Vec<SharedPredicate>,
    ) -> Result<Vec<SharedPredicate>, ConfigurationError> {
        reject.push(not(under(&self.resource_dir)));
        reject.push(hidden());
        reject.push(under(&self.metadata_dir));
        reject.push(under(
            self.resource_dir.join(".well-known").join("resourcesync"),
        ));
        Ok(reject)
    }
}

/// Applies include and exclude globs.
///
/// Includes narrow what earlier stages accept: with includes present a
/// resource must match an earlier accept predicate (if any) and an include.
/// Excludes are added to the reject list.
#[derive(Debug, Clone)]
pub struct SelectorGateBuilder {
    selector: Selector,
    base: Option<PathBuf>,
}

impl SelectorGateBuilder {
    /// Creates the builder. Globs match paths relative to `base` when given.
    #[must_use]
    pub fn new(selector: Selector, base: Option<PathBuf>) -> Self {
        Self { selector, base }
    }

    fn globs<'a>(
        &self,
        patterns: impl Iterator<Item = &'a str>,
    ) -> Result<Vec<SharedPredicate>, ConfigurationError> {
        patterns
            .map(|pattern| glob(pattern, self.base.as_deref()))
            .collect()
    }
}

impl GateBuilder for SelectorGateBuilder {
    fn name(&self) -> &str {
        "selector"
    }

    fn build_accept(
        &self,
        accept: Vec<SharedPredicate>,
    ) -> Result<Vec<SharedPredicate>, ConfigurationError> {
        let includes = self.globs(self.selector.includes())?;
        if includes.is_empty() {
            return Ok(accept);
        }
        if accept.is_empty() {
            return Ok(includes);
        }
        Ok(vec![all(vec![any(accept), any(includes)])])
    }

    fn build_reject(
        &self,
        mut reject: Vec<SharedPredicate>,
    ) -> Result<Vec<SharedPredicate>, ConfigurationError> {
        reject.extend(self.globs(self.selector.excludes())?);
        Ok(reject)
    }
}

/// Chains gate builders in registration order.
#[derive(Clone, Default)]
pub struct ResourceGateBuilder {
    builders: Vec<Arc<dyn GateBuilder>>,
}

impl ResourceGateBuilder {
    /// Creates an empty chain. Its gate accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a builder.
    #[must_use]
    pub fn with(mut self, builder: Arc<dyn GateBuilder>) -> Self {
        self.builders.push(builder);
        self
    }

    /// Assembles the chain described by a configuration's gate definition.
    ///
    /// Custom builders are resolved through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::UnknownGateBuilder` for names `lookup`
    /// does not know.
    pub fn for_configuration<F>(config: &Configuration, lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<Arc<dyn GateBuilder>>,
    {
        let mut chain = Self::new();
        if config.gate.defaults {
            chain = chain.with(Arc::new(DefaultGateBuilder::for_configuration(config)));
        }
        if let Some(selector) = &config.gate.selector {
            chain = chain.with(Arc::new(SelectorGateBuilder::new(
                selector.clone(),
                Some(config.resource_dir.clone()),
            )));
        }
        for name in &config.gate.builders {
            let builder =
                lookup(name).ok_or_else(|| ConfigurationError::UnknownGateBuilder(name.clone()))?;
            chain = chain.with(builder);
        }
        Ok(chain)
    }

    /// Names of the chained builders.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.builders.iter().map(|builder| builder.name())
    }

    /// Runs the chain and returns the gate.
    pub fn build(&self) -> Result<ResourceGate, ConfigurationError> {
        let mut accept = Vec::new();
        let mut reject = Vec::new();
        for builder in &self.builders {
            accept = builder.build_accept(accept)?;
            reject = builder.build_reject(reject)?;
        }
        debug!(
            builders = ?self.names().collect::<Vec<_>>(),
            accept = accept.len(),
            reject = reject.len(),
            "built resource gate"
        );
        Ok(ResourceGate::new(accept, reject))
    }
}

impl std::fmt::Debug for ResourceGateBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
