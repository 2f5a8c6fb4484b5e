//! Predicates over resource descriptors.

use crate::error::GateEvaluationError;
use globset::{Glob, GlobMatcher};
use regex::Regex;
use rspub_model::{ConfigurationError, ResourceDescriptor};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// A one-argument test over a resource.
///
/// Predicates are pure: the same descriptor always gives the same answer.
pub trait Predicate: Send + Sync + fmt::Debug {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Tests a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the predicate cannot decide, e.g. a name is not
    /// valid UTF-8. Gates treat this as a rejection.
    fn evaluate(&self, resource: &ResourceDescriptor) -> Result<bool, GateEvaluationError>;
}

/// A predicate shared between gates and builders.
pub type SharedPredicate = Arc<dyn Predicate>;

fn utf8<'a>(
    predicate: &str,
    resource: &ResourceDescriptor,
    value: Option<&'a std::ffi::OsStr>,
) -> Result<&'a str, GateEvaluationError> {
    let value = value.unwrap_or_default();
    value.to_str().ok_or_else(|| {
        GateEvaluationError::new(predicate, &resource.path, "path is not valid UTF-8")
    })
}

/// Matches the path, relative to `base` when it lies below it, against a glob.
#[derive(Debug)]
struct GlobPredicate {
    pattern: String,
    matcher: GlobMatcher,
    base: Option<PathBuf>,
}

impl Predicate for GlobPredicate {
    fn name(&self) -> &str {
        &self.pattern
    }

    fn evaluate(&self, resource: &ResourceDescriptor) -> Result<bool, GateEvaluationError> {
        let path = match &self.base {
            Some(base) => resource.path.strip_prefix(base).unwrap_or(&resource.path),
            None => resource.path.as_path(),
        };
        Ok(self.matcher.is_match(path))
    }
}

/// Matches a regex against the file name or the parent directory.
#[derive(Debug)]
struct RegexPredicate {
    name: &'static str,
    regex: Regex,
    on_directory: bool,
}

impl Predicate for RegexPredicate {
    fn name(&self) -> &str {
        self.name
    }

    fn evaluate(&self, resource: &ResourceDescriptor) -> Result<bool, GateEvaluationError> {
        let value = if self.on_directory {
            utf8(
                self.name,
                resource,
                resource.path.parent().map(Path::as_os_str),
            )?
        } else {
            utf8(self.name, resource, resource.path.file_name())?
        };
        Ok(self.regex.is_match(value))
    }
}

#[derive(Debug)]
struct HiddenPredicate;

impl Predicate for HiddenPredicate {
    fn name(&self) -> &str {
        "hidden"
    }

    fn evaluate(&self, resource: &ResourceDescriptor) -> Result<bool, GateEvaluationError> {
        Ok(resource
            .path
            .file_name()
            .is_some_and(|name| name.as_encoded_bytes().starts_with(b".")))
    }
}

#[derive(Debug)]
struct UnderPredicate {
    dir: PathBuf,
}

impl Predicate for UnderPredicate {
    fn name(&self) -> &str {
        "under"
    }

    fn evaluate(&self, resource: &ResourceDescriptor) -> Result<bool, GateEvaluationError> {
        Ok(resource.path.starts_with(&self.dir))
    }
}

#[derive(Debug)]
struct ModifiedAfterPredicate {
    after: SystemTime,
}

impl Predicate for ModifiedAfterPredicate {
    fn name(&self) -> &str {
        "modified_after"
    }

    fn evaluate(&self, resource: &ResourceDescriptor) -> Result<bool, GateEvaluationError> {
        Ok(resource.modified > self.after)
    }
}

type TestFn = dyn Fn(&ResourceDescriptor) -> Result<bool, String> + Send + Sync;

struct FnPredicate {
    name: String,
    test: Box<TestFn>,
}

impl fmt::Debug for FnPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPredicate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Predicate for FnPredicate {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, resource: &ResourceDescriptor) -> Result<bool, GateEvaluationError> {
        (self.test)(resource)
            .map_err(|message| GateEvaluationError::new(&self.name, &resource.path, message))
    }
}

#[derive(Debug, Clone, Copy)]
enum Combinator {
    Not,
    All,
    Any,
    None,
    OneOf,
}

#[derive(Debug)]
struct Combined {
    combinator: Combinator,
    operands: Vec<SharedPredicate>,
}

impl Predicate for Combined {
    fn name(&self) -> &str {
        match self.combinator {
            Combinator::Not => "not",
            Combinator::All => "all",
            Combinator::Any => "any",
            Combinator::None => "none",
            Combinator::OneOf => "one_of",
        }
    }

    fn evaluate(&self, resource: &ResourceDescriptor) -> Result<bool, GateEvaluationError> {
        match self.combinator {
            Combinator::All => {
                for operand in &self.operands {
                    if !operand.evaluate(resource)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Combinator::Any => {
                for operand in &self.operands {
                    if operand.evaluate(resource)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Combinator::Not | Combinator::None => {
                for operand in &self.operands {
                    if operand.evaluate(resource)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Combinator::OneOf => {
                let mut matched = 0;
                for operand in &self.operands {
                    if operand.evaluate(resource)? {
                        matched += 1;
                        if matched > 1 {
                            return Ok(false);
                        }
                    }
                }
                Ok(matched == 1)
            }
        }
    }
}

/// Glob over the path, relative to `base` when given.
///
/// `*` does not cross `/`; use `**` for any depth.
pub fn glob(pattern: &str, base: Option<&Path>) -> Result<SharedPredicate, ConfigurationError> {
    let matcher = globset::GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob: Glob| glob.compile_matcher())
        .map_err(|e| ConfigurationError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
    Ok(Arc::new(GlobPredicate {
        pattern: pattern.to_string(),
        matcher,
        base: base.map(Path::to_path_buf),
    }))
}

fn regex(pattern: &str) -> Result<Regex, ConfigurationError> {
    Regex::new(pattern).map_err(|e| ConfigurationError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Regex searched in the file name.
pub fn filename_regex(pattern: &str) -> Result<SharedPredicate, ConfigurationError> {
    Ok(Arc::new(RegexPredicate {
        name: "filename_regex",
        regex: regex(pattern)?,
        on_directory: false,
    }))
}

/// Regex searched in the parent directory path.
pub fn directory_regex(pattern: &str) -> Result<SharedPredicate, ConfigurationError> {
    Ok(Arc::new(RegexPredicate {
        name: "directory_regex",
        regex: regex(pattern)?,
        on_directory: true,
    }))
}

/// File name starts with a dot.
#[must_use]
pub fn hidden() -> SharedPredicate {
    Arc::new(HiddenPredicate)
}

/// Path is `dir` or lies below it.
pub fn under(dir: impl Into<PathBuf>) -> SharedPredicate {
    Arc::new(UnderPredicate { dir: dir.into() })
}

/// Modified strictly after `after`.
#[must_use]
pub fn modified_after(after: SystemTime) -> SharedPredicate {
    Arc::new(ModifiedAfterPredicate { after })
}

/// Wraps a closure. An `Err` message becomes a [`GateEvaluationError`].
pub fn from_fn<F>(name: impl Into<String>, test: F) -> SharedPredicate
where
    F: Fn(&ResourceDescriptor) -> Result<bool, String> + Send + Sync + 'static,
{
    Arc::new(FnPredicate {
        name: name.into(),
        test: Box::new(test),
    })
}

fn combine(combinator: Combinator, operands: Vec<SharedPredicate>) -> SharedPredicate {
    Arc::new(Combined {
        combinator,
        operands,
    })
}

/// True if `predicate` is false.
pub fn not(predicate: SharedPredicate) -> SharedPredicate {
    combine(Combinator::Not, vec![predicate])
}

/// True if every operand is true. True for no operands.
pub fn all(operands: Vec<SharedPredicate>) -> SharedPredicate {
    combine(Combinator::All, operands)
}

/// True if some operand is true. False for no operands.
pub fn any(operands: Vec<SharedPredicate>) -> SharedPredicate {
    combine(Combinator::Any, operands)
}

/// True if no operand is true.
pub fn none(operands: Vec<SharedPredicate>) -> SharedPredicate {
    combine(Combinator::None, operands)
}

/// True if exactly one operand is true.
pub fn one_of(operands: Vec<SharedPredicate>) -> SharedPredicate {
    combine(Combinator::OneOf, operands)
}
