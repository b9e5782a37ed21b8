//! Operation descriptors and the registry that owns them
//!
//! Each `Operation` declares its parameters explicitly, in call order, with
//! optional defaults. Whether a flag is required is derived from that list,
//! never stated separately.

use std::collections::{BTreeSet, HashMap, HashSet};

use reqwest::Method;
use serde_json::{Map, Value};

use crate::error::{DispatchError, RegistryError};
use crate::metadata::{FlagMeta, MetadataTable};
use crate::request::{scalar_to_string, Executor, RequestResult};

/// Name of the generic response selector flag; no operation may use it.
pub const SELECT_PARAM: &str = "select";

/// Parsed call arguments, keyed by parameter name.
pub type CallArgs = Map<String, Value>;

/// A hand-written operation body.
pub type Handler = fn(&Executor, &CallArgs) -> Result<RequestResult, DispatchError>;

/// One formal parameter of an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    pub name: String,
    /// Value used when the flag is absent; `None` makes the parameter required
    pub default: Option<Value>,
}

impl ParameterDescriptor {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, default: Value) -> Self {
        Self {
            name: name.into(),
            default: Some(default),
        }
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn is_required(&self) -> bool {
        !self.has_default()
    }
}

/// Verb + URL template. `{param}` placeholders are filled from the call
/// arguments; every other parameter is sent as a payload field.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    pub method: Method,
    pub path: String,
}

impl RequestTemplate {
    fn placeholders(&self) -> HashSet<&str> {
        let mut names = HashSet::new();
        let mut rest = self.path.as_str();
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            names.insert(&rest[start + 1..start + len]);
            rest = &rest[start + len + 1..];
        }
        names
    }

    fn render_path(&self, args: &CallArgs) -> String {
        let mut path = self.path.clone();
        for name in self.placeholders() {
            let value = args.get(name).map(scalar_to_string).unwrap_or_default();
            path = path.replace(&format!("{{{name}}}"), &urlencoding::encode(&value));
        }
        path
    }

    fn payload(&self, args: &CallArgs) -> Option<CallArgs> {
        let placeholders = self.placeholders();
        let payload: CallArgs = args
            .iter()
            .filter(|(name, _)| !placeholders.contains(name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        (!payload.is_empty()).then_some(payload)
    }
}

/// What running an operation does.
#[derive(Debug, Clone)]
pub enum Action {
    Request(RequestTemplate),
    Custom(Handler),
}

/// One invocable command.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Operation {
    /// snake_case identifier; the CLI token is its hyphenated form
    pub name: String,
    /// Category used for listing only
    pub group: String,
    pub summary: String,
    pub parameters: Vec<ParameterDescriptor>,
    /// Per-operation flag metadata, overlaid on the global table
    pub overrides: MetadataTable,
    pub action: Action,
}

impl Operation {
    /// An operation that sends one request built from `path`.
    pub fn request(
        name: impl Into<String>,
        group: impl Into<String>,
        method: Method,
        path: impl Into<String>,
    ) -> Self {
        Self::with_action(
            name,
            group,
            Action::Request(RequestTemplate {
                method,
                path: path.into(),
            }),
        )
    }

    /// An operation backed by a hand-written handler.
    pub fn custom(name: impl Into<String>, group: impl Into<String>, handler: Handler) -> Self {
        Self::with_action(name, group, Action::Custom(handler))
    }

    fn with_action(name: impl Into<String>, group: impl Into<String>, action: Action) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            summary: String::new(),
            parameters: Vec::new(),
            overrides: MetadataTable::new(),
            action,
        }
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Append a parameter with no default.
    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(ParameterDescriptor::required(name));
        self
    }

    /// Append a parameter whose default is `null`.
    pub fn optional(self, name: impl Into<String>) -> Self {
        self.optional_with(name, Value::Null)
    }

    pub fn optional_with(mut self, name: impl Into<String>, default: Value) -> Self {
        self.parameters
            .push(ParameterDescriptor::optional(name, default));
        self
    }

    /// Override flag metadata for one of this operation's parameters.
    pub fn meta(mut self, param: impl Into<String>, meta: FlagMeta) -> Self {
        self.overrides.insert(param, meta);
        self
    }

    /// CLI token for this operation.
    pub fn command_name(&self) -> String {
        self.name.replace('_', "-")
    }

    /// Run the operation with already-parsed arguments.
    pub fn invoke(
        &self,
        executor: &Executor,
        args: &CallArgs,
    ) -> Result<RequestResult, DispatchError> {
        match &self.action {
            Action::Request(template) => executor.execute(
                template.method.clone(),
                &template.render_path(args),
                template.payload(args),
            ),
            Action::Custom(handler) => handler(executor, args),
        }
    }

    fn validate(&self) -> Result<(), RegistryError> {
        let mut seen = HashSet::new();
        let mut defaults_started = false;
        for param in &self.parameters {
            if param.name == SELECT_PARAM {
                return Err(RegistryError::ReservedParameter {
                    operation: self.name.clone(),
                    param: param.name.clone(),
                });
            }
            if !seen.insert(param.name.as_str()) {
                return Err(RegistryError::DuplicateParameter {
                    operation: self.name.clone(),
                    param: param.name.clone(),
                });
            }
            if param.has_default() {
                defaults_started = true;
            } else if defaults_started {
                return Err(RegistryError::InvalidParameterOrder {
                    operation: self.name.clone(),
                    param: param.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// All declared operations, keyed by name. Populated once at startup.
#[derive(Debug, Default)]
pub struct Registry {
    ops: HashMap<String, Operation>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, op: Operation) -> Result<(), RegistryError> {
        op.validate()?;
        if self.ops.contains_key(&op.name) {
            return Err(RegistryError::DuplicateOperation { name: op.name });
        }
        self.ops.insert(op.name.clone(), op);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Operation> {
        self.ops.get(name)
    }

    pub fn groups(&self) -> BTreeSet<&str> {
        self.ops.values().map(|op| op.group.as_str()).collect()
    }

    /// Operation names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.ops.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
