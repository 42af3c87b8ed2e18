//! Resolution of dotted names to zero-argument computations.
//!
//! `$evalNow{}` and the offline eval pass never load code by name. They ask
//! an [`Evaluator`], and the shipped [`FunctionRegistry`] only knows the
//! callables registered on it.

use std::collections::BTreeMap;
use std::fmt;
use std::process::Command;
use std::sync::Arc;

use josman_config::EvaluatorConfig;
use tracing::debug;

/// Failure to resolve or run a registered callable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    #[error("class '{class}' is not registered")]
    ClassNotFound { class: String },

    #[error("'{class}' has no registered member '{member}'")]
    MemberNotFound { class: String, member: String },

    #[error("'{class}.{member}' failed: {message}")]
    Invocation {
        class: String,
        member: String,
        message: String,
    },
}

/// Resolves `class_path.member` to a string.
pub trait Evaluator: Send + Sync {
    /// `is_method` is true when the expression ended in `()`.
    fn evaluate(
        &self,
        class_path: &str,
        member: &str,
        is_method: bool,
    ) -> Result<String, EvaluationError>;
}

type Method = Arc<dyn Fn() -> Result<String, String> + Send + Sync>;

#[derive(Default, Clone)]
struct ClassEntry {
    methods: BTreeMap<String, Method>,
    fields: BTreeMap<String, String>,
}

/// Allow-list of static methods and fields, keyed by class path.
#[derive(Default, Clone)]
pub struct FunctionRegistry {
    classes: BTreeMap<String, ClassEntry>,
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (class, entry) in &self.classes {
            let members: Vec<String> = entry
                .methods
                .keys()
                .map(|m| format!("{m}()"))
                .chain(entry.fields.keys().cloned())
                .collect();
            map.entry(class, &members);
        }
        map.finish()
    }
}

impl FunctionRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in members.
    ///
    /// | expression | value |
    /// |------------|-------|
    /// | `std.env.consts.OS` | target operating system |
    /// | `std.env.consts.ARCH` | target architecture |
    /// | `std.env.consts.FAMILY` | target family |
    /// | `josman.Josman.version()` | version of this generator |
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_field("std.env.consts", "OS", std::env::consts::OS);
        registry.register_field("std.env.consts", "ARCH", std::env::consts::ARCH);
        registry.register_field("std.env.consts", "FAMILY", std::env::consts::FAMILY);
        registry.register_method("josman.Josman", "version", || {
            Ok(env!("CARGO_PKG_VERSION").to_owned())
        });
        registry
    }

    /// Built-ins plus the fields and commands of an `[evaluator]` section.
    ///
    /// Keys are full expressions (`com.acme.Consts.GREETING`,
    /// `com.acme.Build.rustc()`); the last dotted segment is the member.
    #[must_use]
    pub fn from_config(config: &EvaluatorConfig) -> Self {
        let mut registry = Self::with_builtins();
        for (expr, value) in &config.fields {
            if let Some((class, member)) = split_member(expr) {
                registry.register_field(class, member, value);
            }
        }
        for (expr, argv) in &config.commands {
            let name = expr.trim().trim_end_matches("()");
            if let Some((class, member)) = split_member(name) {
                let argv = argv.clone();
                registry.register_method(class, member, move || run_command(&argv));
            }
        }
        registry
    }

    pub fn register_method<F>(&mut self, class: &str, member: &str, method: F)
    where
        F: Fn() -> Result<String, String> + Send + Sync + 'static,
    {
        self.classes
            .entry(class.to_owned())
            .or_default()
            .methods
            .insert(member.to_owned(), Arc::new(method));
    }

    pub fn register_field(&mut self, class: &str, member: &str, value: &str) {
        self.classes
            .entry(class.to_owned())
            .or_default()
            .fields
            .insert(member.to_owned(), value.to_owned());
    }
}

impl Evaluator for FunctionRegistry {
    fn evaluate(
        &self,
        class_path: &str,
        member: &str,
        is_method: bool,
    ) -> Result<String, EvaluationError> {
        let entry = self
            .classes
            .get(class_path)
            .ok_or_else(|| EvaluationError::ClassNotFound {
                class: class_path.to_owned(),
            })?;

        if let Some(method) = entry.methods.get(member) {
            return method().map_err(|message| EvaluationError::Invocation {
                class: class_path.to_owned(),
                member: member.to_owned(),
                message,
            });
        }
        if !is_method && let Some(value) = entry.fields.get(member) {
            return Ok(value.clone());
        }
        Err(EvaluationError::MemberNotFound {
            class: class_path.to_owned(),
            member: member.to_owned(),
        })
    }
}

fn split_member(expr: &str) -> Option<(&str, &str)> {
    expr.trim()
        .rsplit_once('.')
        .filter(|(class, member)| !class.is_empty() && !member.is_empty())
}

fn run_command(argv: &[String]) -> Result<String, String> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| "empty command".to_owned())?;
    debug!(program = %program, "Running evaluator command");
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| format!("cannot run '{program}': {e}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "'{program}' exited with {}: {}",
            output.status,
            stderr.trim()
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
}

/// Evaluator handle passed into expression expansion.
#[derive(Clone)]
pub struct EvaluationContext {
    evaluator: Arc<dyn Evaluator>,
}

impl EvaluationContext {
    pub fn new(evaluator: Arc<dyn Evaluator>) -> Self {
        Self { evaluator }
    }

    pub fn evaluator(&self) -> &dyn Evaluator {
        self.evaluator.as_ref()
    }
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self::new(Arc::new(FunctionRegistry::with_builtins()))
    }
}

impl fmt::Debug for EvaluationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationContext").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_builtins() {
        let registry = FunctionRegistry::with_builtins();
        assert_eq!(
            registry.evaluate("std.env.consts", "OS", false).unwrap(),
            std::env::consts::OS
        );
        assert_eq!(
            registry.evaluate("josman.Josman", "version", true).unwrap(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_field_is_not_callable() {
        let registry = FunctionRegistry::with_builtins();
        assert_eq!(
            registry.evaluate("std.env.consts", "OS", true),
            Err(EvaluationError::MemberNotFound {
                class: "std.env.consts".to_owned(),
                member: "OS".to_owned(),
            })
        );
    }

    #[test]
    fn test_bare_reference_prefers_method() {
        let mut registry = FunctionRegistry::new();
        registry.register_field("a.B", "x", "field");
        registry.register_method("a.B", "x", || Ok("method".to_owned()));
        assert_eq!(registry.evaluate("a.B", "x", false).unwrap(), "method");
    }

    #[test]
    fn test_unknown_class_and_member() {
        let registry = FunctionRegistry::with_builtins();
        assert!(matches!(
            registry.evaluate("java.lang.System", "out", false),
            Err(EvaluationError::ClassNotFound { .. })
        ));
        assert!(matches!(
            registry.evaluate("josman.Josman", "nope", true),
            Err(EvaluationError::MemberNotFound { .. })
        ));
    }

    #[test]
    fn test_invocation_failure() {
        let mut registry = FunctionRegistry::new();
        registry.register_method("a.B", "boom", || Err("kaput".to_owned()));
        assert_eq!(
            registry.evaluate("a.B", "boom", true).unwrap_err().to_string(),
            "'a.B.boom' failed: kaput"
        );
    }

    #[test]
    fn test_from_config() {
        let mut config = EvaluatorConfig::default();
        config
            .fields
            .insert("com.acme.Consts.GREETING".to_owned(), "hello".to_owned());
        config
            .commands
            .insert("com.acme.Build.missing()".to_owned(), vec!["josman-no-such-program".to_owned()]);
        let registry = FunctionRegistry::from_config(&config);

        assert_eq!(
            registry.evaluate("com.acme.Consts", "GREETING", false).unwrap(),
            "hello"
        );
        assert!(matches!(
            registry.evaluate("com.acme.Build", "missing", true),
            Err(EvaluationError::Invocation { .. })
        ));
    }
}
