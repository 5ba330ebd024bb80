//! Environment variable sources
//!
//! `%env.NAME%` placeholders are answered by an [`Environment`]. The
//! resolver defaults to the process environment; tests and embedders can
//! supply a fixed map, a closure, or layer overrides on top of another
//! source.

use std::collections::HashMap;
use std::sync::Arc;

/// Lookup from variable name to value
pub trait Environment: Send + Sync {
    /// Value of `name`, or `None` when it is unset.
    ///
    /// A variable set to the empty string is `Some("")`.
    fn var(&self, name: &str) -> Option<String>;
}

/// The environment of the running process
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        if name.is_empty() || name.contains('=') || name.contains('\0') {
            return None;
        }
        std::env::var_os(name).map(|value| value.to_string_lossy().into_owned())
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<E: Environment + ?Sized> Environment for Arc<E> {
    fn var(&self, name: &str) -> Option<String> {
        (**self).var(name)
    }
}

/// A closure-based environment
pub struct FnEnvironment<F>
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    func: F,
}

impl<F> FnEnvironment<F>
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Environment for FnEnvironment<F>
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn var(&self, name: &str) -> Option<String> {
        (self.func)(name)
    }
}

/// Explicit overrides consulted before a fallback environment
pub struct Layered {
    overrides: HashMap<String, String>,
    fallback: Arc<dyn Environment>,
}

impl Layered {
    pub fn new(overrides: HashMap<String, String>, fallback: Arc<dyn Environment>) -> Self {
        Self {
            overrides,
            fallback,
        }
    }

    /// Overrides on top of the process environment
    pub fn over_process(overrides: HashMap<String, String>) -> Self {
        Self::new(overrides, Arc::new(ProcessEnvironment))
    }
}

impl Environment for Layered {
    fn var(&self, name: &str) -> Option<String> {
        self.overrides
            .get(name)
            .cloned()
            .or_else(|| self.fallback.var(name))
    }
}
