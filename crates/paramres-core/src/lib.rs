//! paramres-core: placeholder resolution for configuration trees
//!
//! Replaces `%name%` tokens in string values and keys with other values
//! from the same tree, and `%env.NAME%` tokens with environment variables.
//! `%%` is an escaped `%`.
//!
//! # Example
//!
//! ```rust
//! use paramres_core::{ParamResolver, Value};
//!
//! let yaml = r#"
//! home: /srv/app
//! logs: "%home%/logs"
//! debug: false
//! verbose: "%debug%"
//! "#;
//!
//! let tree: Value = serde_yaml::from_str(yaml).unwrap();
//! let resolved = ParamResolver::new().resolve_tree(tree).unwrap();
//! let resolved = resolved.as_mapping().unwrap();
//!
//! assert_eq!(resolved["logs"].as_str(), Some("/srv/app/logs"));
//! assert_eq!(resolved["verbose"].as_bool(), Some(false));
//! ```

pub mod env;
pub mod error;
pub mod placeholder;
pub mod resolver;
pub mod validator;
pub mod value;

pub use env::{Environment, FnEnvironment, Layered, ProcessEnvironment};
pub use error::{Error, ErrorKind, Result};
pub use resolver::{ParamResolver, ResolverOptions};
pub use value::{Mapping, Value};
