//! Placeholder resolution
//!
//! [`ParamResolver`] walks a configuration tree and replaces `%name%`
//! tokens with values looked up elsewhere in the same tree, and
//! `%env.NAME%` tokens with environment variables.
//!
//! Lookups always read the tree as it was passed in, never the partially
//! resolved output. A value that is exactly one `%name%` token takes the
//! referenced value with its original type; anywhere else a placeholder is
//! replaced by text. `%%` survives resolution and is collapsed to `%` once
//! each top-level entry is done.

use std::fmt;
use std::sync::Arc;

use crate::env::{Environment, ProcessEnvironment};
use crate::error::{Error, Result};
use crate::placeholder::{self, Segment};
use crate::validator;
use crate::value::{find_in_mapping, Mapping, Value};

/// Default bound on nesting plus placeholder chaining
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Options controlling a resolver
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Deepest combined mapping nesting and placeholder chain allowed.
    ///
    /// Every mapping or sequence level counts one, and so does every link
    /// of a placeholder chain (`a` -> `%b%` -> `%c%` ...). A non-circular
    /// chain longer than this limit therefore fails with `DepthExceeded`
    /// even in a flat tree; raise the limit for such configurations.
    pub max_depth: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Where the walk currently is: the config path for error messages, the
/// parameters being expanded on this chain, and how deep the walk is.
#[derive(Debug, Clone, Default)]
struct Trail {
    path: String,
    chain: Vec<String>,
    depth: usize,
}

impl Trail {
    /// Step into the entry `key` of the current mapping
    fn child(&self, key: &str) -> Self {
        let path = if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        };
        Self {
            path,
            chain: self.chain.clone(),
            depth: self.depth + 1,
        }
    }

    /// Step into element `index` of the current sequence
    fn index(&self, index: usize) -> Self {
        Self {
            path: format!("{}[{}]", self.path, index),
            chain: self.chain.clone(),
            depth: self.depth + 1,
        }
    }

    fn would_cause_cycle(&self, param: &str) -> bool {
        self.chain.iter().any(|p| p == param)
    }

    /// Start expanding `param`, failing if it is already on the chain
    fn follow(&self, param: &str) -> Result<Self> {
        if self.would_cause_cycle(param) {
            return Err(Error::circular_reference(param, &self.chain).or_path(&self.path));
        }
        let mut chain = self.chain.clone();
        chain.push(param.to_string());
        Ok(Self {
            path: self.path.clone(),
            chain,
            depth: self.depth + 1,
        })
    }
}

/// Resolves placeholders in one configuration tree.
///
/// An instance is single-use: the first call to [`resolve`](Self::resolve)
/// does the work, and every later call returns an empty mapping without
/// looking at its argument. Create a new resolver per tree.
pub struct ParamResolver {
    resolved: bool,
    config: Mapping,
    env: Arc<dyn Environment>,
    options: ResolverOptions,
}

impl Default for ParamResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ParamResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamResolver")
            .field("resolved", &self.resolved)
            .field("entries", &self.config.len())
            .field("options", &self.options)
            .finish()
    }
}

impl ParamResolver {
    /// Create a fresh resolver reading the process environment
    pub fn new() -> Self {
        Self {
            resolved: false,
            config: Mapping::new(),
            env: Arc::new(ProcessEnvironment),
            options: ResolverOptions::default(),
        }
    }

    /// Same as [`ParamResolver::new`]
    pub fn create() -> Self {
        Self::new()
    }

    /// Answer `%env.NAME%` placeholders from `env` instead of the process
    pub fn with_environment(mut self, env: impl Environment + 'static) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// Answer `%env.NAME%` placeholders from a shared environment
    pub fn with_shared_environment(mut self, env: Arc<dyn Environment>) -> Self {
        self.env = env;
        self
    }

    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Whether this instance has already been used
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Replace every placeholder in `configuration`.
    ///
    /// Entries are processed in order: the key is resolved, then the value,
    /// then `%%` in the value is collapsed to `%`. When two keys resolve to
    /// the same name the later entry wins.
    ///
    /// Only the first call on an instance resolves anything; later calls
    /// return an empty mapping, even if the first call failed.
    pub fn resolve(&mut self, configuration: Mapping) -> Result<Mapping> {
        if self.resolved {
            log::debug!("Resolver already used, returning an empty mapping");
            return Ok(Mapping::new());
        }
        self.resolved = true;
        self.config = configuration;

        log::debug!("Resolving {} top-level entries", self.config.len());

        let root = Trail::default();
        let mut parameters = Mapping::with_capacity(self.config.len());
        for (key, value) in &self.config {
            let trail = root.child(key);
            let key = self.resolve_key(key, &trail)?;
            let value = self.resolve_value(value, &trail)?;
            parameters.insert(key, unescape_value(value));
        }

        log::debug!("Resolved {} top-level entries", parameters.len());
        Ok(parameters)
    }

    /// Resolve a tree whose top level must be a mapping
    pub fn resolve_tree(&mut self, tree: Value) -> Result<Value> {
        match tree {
            Value::Mapping(map) => self.resolve(map).map(Value::Mapping),
            other => Err(Error::parse(format!(
                "The top level of a configuration must be a mapping, got {}",
                other.type_name()
            ))),
        }
    }

    fn check_depth(&self, trail: &Trail) -> Result<()> {
        if trail.depth > self.options.max_depth {
            return Err(Error::depth_exceeded(self.options.max_depth).or_path(&trail.path));
        }
        Ok(())
    }

    fn resolve_value(&self, value: &Value, trail: &Trail) -> Result<Value> {
        self.check_depth(trail)?;

        match value {
            Value::Mapping(map) => {
                let mut resolved = Mapping::with_capacity(map.len());
                for (key, item) in map {
                    let child = trail.child(key);
                    let key = self.resolve_key(key, &child)?;
                    resolved.insert(key, self.resolve_value(item, &child)?);
                }
                Ok(Value::Mapping(resolved))
            }
            Value::Sequence(seq) => seq
                .iter()
                .enumerate()
                .map(|(i, item)| self.resolve_value(item, &trail.index(i)))
                .collect::<Result<Vec<_>>>()
                .map(Value::Sequence),
            Value::String(s) => self.resolve_string(s, trail),
            Value::Null | Value::Bool(_) | Value::Integer(_) | Value::Float(_) => {
                Ok(value.clone())
            }
        }
    }

    /// Keys go through the same substitution as values but must end up as text
    fn resolve_key(&self, key: &str, trail: &Trail) -> Result<String> {
        if !placeholder::contains_placeholders(key) {
            return Ok(key.to_string());
        }
        match self.resolve_string(key, trail)? {
            Value::String(s) => Ok(s),
            other => validator::coerce_to_string(&other).map_err(|e| e.or_path(&trail.path)),
        }
    }

    fn resolve_string(&self, input: &str, trail: &Trail) -> Result<Value> {
        self.check_depth(trail)?;

        let template = placeholder::parse(input);
        if template.is_literal() {
            return Ok(Value::String(input.to_string()));
        }

        let at = |e: Error| e.or_path(&trail.path);

        if let Some(param) = template.single_param() {
            let next = trail.follow(param)?;
            let target = self.lookup(param).map_err(at)?;
            log::trace!(
                "Substituting {} '{}' for '{}' at '{}'",
                target.type_name(),
                param,
                input,
                trail.path
            );
            return self.resolve_value(target, &next);
        }

        let mut out = String::with_capacity(input.len());
        for segment in template.segments() {
            match *segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Escaped => out.push_str("%%"),
                Segment::Env(name) => {
                    let value = validator::require_env(self.env.as_ref(), name).map_err(at)?;
                    log::trace!("Substituting environment variable '{}' at '{}'", name, trail.path);
                    out.push_str(&value);
                }
                Segment::Param(param) => {
                    let next = trail.follow(param)?;
                    let raw = self
                        .lookup(param)
                        .and_then(validator::coerce_to_string)
                        .map_err(at)?;
                    log::trace!("Expanding '{}' inside '{}' at '{}'", param, input, trail.path);
                    let expanded = match self.resolve_string(&raw, &next)? {
                        Value::String(s) => s,
                        other => validator::coerce_to_string(&other).map_err(at)?,
                    };
                    out.push_str(&expanded);
                }
            }
        }

        Ok(Value::String(out))
    }

    /// First entry named `param` in the original tree
    fn lookup(&self, param: &str) -> Result<&Value> {
        validator::require_found(find_in_mapping(&self.config, param), param)
    }
}

/// Collapse `%%` to `%` in every string leaf; keys are left as they are
fn unescape_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(placeholder::unescape(&s)),
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| (k, unescape_value(v)))
                .collect(),
        ),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(unescape_value).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn map(entries: Vec<(&str, Value)>) -> Mapping {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    fn env(vars: &[(&str, &str)]) -> HashMap<String, String> {
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn resolver() -> ParamResolver {
        ParamResolver::new().with_environment(HashMap::<String, String>::new())
    }

    #[test]
    fn test_trail_paths() {
        let root = Trail::default();
        let child = root.child("directories").child("project");
        assert_eq!(child.path, "directories.project");
        assert_eq!(child.depth, 2);
        assert_eq!(root.child("servers").index(1).path, "servers[1]");
    }

    #[test]
    fn test_trail_cycle_detection() {
        let trail = Trail::default().follow("a").unwrap().follow("b").unwrap();

        assert!(trail.would_cause_cycle("a"));
        assert!(trail.would_cause_cycle("b"));
        assert!(!trail.would_cause_cycle("c"));

        let err = trail.follow("a").unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::CircularReference {
                param: "a".into()
            }
        );
        assert_eq!(err.cause.as_deref(), Some("Chain: a → b → a"));
    }

    #[test]
    fn test_new_and_create_are_fresh() {
        assert!(!ParamResolver::new().is_resolved());
        assert!(!ParamResolver::create().is_resolved());
        assert!(!ParamResolver::default().is_resolved());
        assert_eq!(ParamResolver::new().options().max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_literal_values_untouched() {
        let config = map(vec![
            ("name", "plain".into()),
            ("count", 3.into()),
            ("ratio", 0.5.into()),
            ("enabled", false.into()),
            ("nothing", Value::Null),
        ]);

        assert_eq!(resolver().resolve(config.clone()).unwrap(), config);
    }

    #[test]
    fn test_chained_resolution() {
        let config = map(vec![
            ("HoMe", "myHome".into()),
            ("subhome", "%HoMe%/subhome".into()),
            ("deeper", "%subhome%/deeper".into()),
        ]);

        let resolved = resolver().resolve(config).unwrap();
        assert_eq!(resolved["subhome"], Value::from("myHome/subhome"));
        assert_eq!(resolved["deeper"], Value::from("myHome/subhome/deeper"));
    }

    #[test]
    fn test_whole_placeholder_keeps_type() {
        let config = map(vec![
            ("foo", true.into()),
            ("expfoo", "%foo%".into()),
            ("bar", Value::Null),
            ("expbar", "%bar%".into()),
            ("port", 5432.into()),
            ("expport", "%port%".into()),
        ]);

        let resolved = resolver().resolve(config).unwrap();
        assert_eq!(resolved["expfoo"], Value::Bool(true));
        assert_eq!(resolved["expbar"], Value::Null);
        assert_eq!(resolved["expport"], Value::Integer(5432));
    }

    #[test]
    fn test_whole_placeholder_copies_and_resolves_mapping() {
        let config = map(vec![
            ("name", "svc".into()),
            (
                "defaults",
                Value::Mapping(map(vec![("log", "/var/log/%name%.log".into())])),
            ),
            ("service", "%defaults%".into()),
        ]);

        let resolved = resolver().resolve(config).unwrap();
        assert_eq!(
            resolved["service"],
            Value::Mapping(map(vec![("log", "/var/log/svc.log".into())]))
        );
    }

    #[test]
    fn test_numbers_embedded_as_text() {
        let config = map(vec![
            ("port", 8080.into()),
            ("scale", 1.5.into()),
            ("url", "http://localhost:%port%/?scale=%scale%".into()),
        ]);

        let resolved = resolver().resolve(config).unwrap();
        assert_eq!(
            resolved["url"],
            Value::from("http://localhost:8080/?scale=1.5")
        );
    }

    #[test]
    fn test_same_param_twice_is_not_a_cycle() {
        let config = map(vec![
            ("project", "p".into()),
            ("both", "%project%-%project%".into()),
        ]);

        let resolved = resolver().resolve(config).unwrap();
        assert_eq!(resolved["both"], Value::from("p-p"));
    }

    #[test]
    fn test_escaped_percent() {
        let config = map(vec![
            ("ratio", "100%%".into()),
            ("sentence", "%ratio% sure".into()),
            ("whole", "%ratio%".into()),
            ("bare", "%%".into()),
        ]);

        let resolved = resolver().resolve(config).unwrap();
        assert_eq!(resolved["ratio"], Value::from("100%"));
        assert_eq!(resolved["sentence"], Value::from("100% sure"));
        assert_eq!(resolved["whole"], Value::from("100%"));
        assert_eq!(resolved["bare"], Value::from("%"));
    }

    #[test]
    fn test_keys_are_not_unescaped() {
        let config = map(vec![("50%%", "%%".into())]);

        let resolved = resolver().resolve(config).unwrap();
        assert_eq!(resolved.get("50%%"), Some(&Value::from("%")));
    }

    #[test]
    fn test_env_values_are_terminal() {
        let config = map(vec![
            ("other", "nope".into()),
            ("raw", "%env.RAW%".into()),
        ]);

        let mut resolver =
            ParamResolver::new().with_environment(env(&[("RAW", "%other%")]));
        let resolved = resolver.resolve(config).unwrap();
        // the env value is not scanned again; only the final unescape applies
        assert_eq!(resolved["raw"], Value::from("%other%"));
    }

    #[test]
    fn test_whole_env_placeholder_is_a_string() {
        let config = map(vec![("port", "%env.PORT%".into())]);

        let mut resolver = ParamResolver::new().with_environment(env(&[("PORT", "80")]));
        let resolved = resolver.resolve(config).unwrap();
        assert_eq!(resolved["port"], Value::from("80"));
    }

    #[test]
    fn test_key_resolving_to_number() {
        let config = map(vec![("id", 7.into()), ("%id%", "seven".into())]);

        let resolved = resolver().resolve(config).unwrap();
        assert_eq!(resolved.get("7"), Some(&Value::from("seven")));
    }

    #[test]
    fn test_key_resolving_to_bool_is_rejected() {
        let config = map(vec![("flag", true.into()), ("%flag%", 1.into())]);

        let err = resolver().resolve(config).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidScalar);
        assert_eq!(err.path.as_deref(), Some("%flag%"));
    }

    #[test]
    fn test_colliding_keys_last_write_wins() {
        let config = map(vec![
            ("name", "dup".into()),
            ("dup", "first".into()),
            ("%name%", "second".into()),
        ]);

        let resolved = resolver().resolve(config).unwrap();
        assert_eq!(resolved["dup"], Value::from("second"));
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn test_sequences_are_resolved() {
        let config = map(vec![
            ("host", "db".into()),
            (
                "urls",
                Value::Sequence(vec!["%host%:1".into(), "%host%:2".into(), 3.into()]),
            ),
        ]);

        let resolved = resolver().resolve(config).unwrap();
        assert_eq!(
            resolved["urls"],
            Value::Sequence(vec!["db:1".into(), "db:2".into(), 3.into()])
        );
    }

    #[test]
    fn test_chain_ending_in_bool_cannot_be_embedded() {
        let config = map(vec![
            ("flag", true.into()),
            ("alias", "%flag%".into()),
            ("text", "on: %alias%".into()),
        ]);

        let err = resolver().resolve(config).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidScalar);
        assert_eq!(err.path.as_deref(), Some("text"));
    }

    #[test]
    fn test_error_path_points_at_nested_entry() {
        let config = map(vec![(
            "directories",
            Value::Mapping(map(vec![("project", "%missing%/x".into())])),
        )]);

        let err = resolver().resolve(config).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::NotFound {
                param: "missing".into()
            }
        );
        assert_eq!(err.path.as_deref(), Some("directories.project"));
    }

    #[test]
    fn test_self_reference() {
        let config = map(vec![("me", "%me%".into())]);

        let err = resolver().resolve(config).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::CircularReference {
                param: "me".into()
            }
        );
    }

    #[test]
    fn test_depth_limit() {
        let mut nested = Value::from("leaf");
        for _ in 0..10 {
            nested = Value::Mapping(map(vec![("n", nested)]));
        }
        let config = map(vec![("root", nested)]);

        let mut shallow = resolver().with_options(ResolverOptions { max_depth: 5 });
        let err = shallow.resolve(config.clone()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DepthExceeded { limit: 5 });

        let mut deep = resolver();
        assert!(deep.resolve(config).is_ok());
    }

    #[test]
    fn test_chain_length_counts_toward_depth() {
        let mut config = map(vec![("k10", "end".into())]);
        for i in (0..10).rev() {
            config.insert(format!("k{}", i), Value::from(format!("%k{}%", i + 1)));
        }

        let mut shallow = resolver().with_options(ResolverOptions { max_depth: 5 });
        let err = shallow.resolve(config.clone()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DepthExceeded { limit: 5 });

        let mut raised = resolver().with_options(ResolverOptions { max_depth: 16 });
        let resolved = raised.resolve(config).unwrap();
        assert_eq!(resolved["k0"], Value::from("end"));
    }

    #[test]
    fn test_shared_environment() {
        let shared: Arc<dyn Environment> = Arc::new(env(&[("host", "db")]));
        let config = map(vec![("url", "pg://%env.host%".into())]);

        for _ in 0..2 {
            let mut resolver = ParamResolver::new().with_shared_environment(Arc::clone(&shared));
            let resolved = resolver.resolve(config.clone()).unwrap();
            assert_eq!(resolved["url"], Value::from("pg://db"));
        }
    }

    #[test]
    fn test_failed_resolution_still_uses_up_instance() {
        let mut resolver = resolver();
        assert!(resolver.resolve(map(vec![("a", "%b%".into())])).is_err());
        assert!(resolver.is_resolved());
        assert_eq!(
            resolver.resolve(map(vec![("a", "x".into())])).unwrap(),
            Mapping::new()
        );
    }

    #[test]
    fn test_resolve_tree_requires_mapping() {
        let err = resolver().resolve_tree(Value::from("scalar")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);

        let tree = Value::Mapping(map(vec![("a", "1".into()), ("b", "%a%".into())]));
        let resolved = resolver().resolve_tree(tree).unwrap();
        assert_eq!(resolved.as_mapping().unwrap()["b"], Value::from("1"));
    }

    #[test]
    fn test_debug_does_not_dump_config() {
        let mut resolver = resolver();
        resolver
            .resolve(map(vec![("secret", "hunter2".into())]))
            .unwrap();
        let debug = format!("{:?}", resolver);

        assert!(debug.contains("resolved: true"));
        assert!(!debug.contains("hunter2"));
    }
}
