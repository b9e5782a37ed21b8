//! Parameter metadata → flag construction rules
//!
//! A `MetadataTable` maps parameter names to loosely declared `FlagMeta`
//! entries. The global table and each operation's overrides are both plain
//! tables; the builder overlays them and resolves the final value type.

use std::collections::HashMap;
use std::str::FromStr;

/// How a flag's value is parsed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// `--name value`, kept as a string.
    String,
    /// `--name 42`, parsed as a signed integer.
    Int,
    /// `--name`, presence-only boolean switch.
    Switch,
    /// `--name a b c`, one or more values collected in order.
    List,
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" | "str" => Ok(Self::String),
            "int" => Ok(Self::Int),
            "switch" | "store_true" => Ok(Self::Switch),
            "list" | "nargs+" => Ok(Self::List),
            other => Err(other.to_string()),
        }
    }
}

/// One metadata entry. Every key is optional; unset keys fall through to the
/// table underneath when overlaid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct FlagMeta {
    /// Declared value type name (see [`ValueType`]'s accepted spellings)
    pub value_type: Option<String>,
    pub help: Option<String>,
    pub metavar: Option<String>,
}

impl FlagMeta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for an entry that only carries help text.
    pub fn help_text(help: impl Into<String>) -> Self {
        Self::new().help(help)
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn metavar(mut self, metavar: impl Into<String>) -> Self {
        self.metavar = Some(metavar.into());
        self
    }

    pub fn value_type(mut self, value_type: impl Into<String>) -> Self {
        self.value_type = Some(value_type.into());
        self
    }

    pub fn int(self) -> Self {
        self.value_type("int")
    }

    pub fn switch(self) -> Self {
        self.value_type("switch")
    }

    pub fn list(self) -> Self {
        self.value_type("list")
    }

    /// Replace each key set in `other`; keys `other` leaves unset keep their
    /// current value.
    pub fn overlay(&self, other: &FlagMeta) -> FlagMeta {
        FlagMeta {
            value_type: other.value_type.clone().or_else(|| self.value_type.clone()),
            help: other.help.clone().or_else(|| self.help.clone()),
            metavar: other.metavar.clone().or_else(|| self.metavar.clone()),
        }
    }
}

/// Parameter name → metadata entry.
#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
    entries: HashMap<String, FlagMeta>,
}

impl MetadataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the entry for `param`.
    pub fn with(mut self, param: impl Into<String>, meta: FlagMeta) -> Self {
        self.insert(param, meta);
        self
    }

    pub fn insert(&mut self, param: impl Into<String>, meta: FlagMeta) {
        self.entries.insert(param.into(), meta);
    }

    pub fn get(&self, param: &str) -> Option<&FlagMeta> {
        self.entries.get(param)
    }

    /// Merged metadata for `param`: this table's entry overlaid with the
    /// entry from `overrides`, if any.
    pub fn merged(&self, overrides: &MetadataTable, param: &str) -> FlagMeta {
        let base = self.get(param).cloned().unwrap_or_default();
        match overrides.get(param) {
            Some(over) => base.overlay(over),
            None => base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_type_parses_known_spellings() {
        assert_eq!("string".parse::<ValueType>(), Ok(ValueType::String));
        assert_eq!("int".parse::<ValueType>(), Ok(ValueType::Int));
        assert_eq!("store_true".parse::<ValueType>(), Ok(ValueType::Switch));
        assert_eq!("switch".parse::<ValueType>(), Ok(ValueType::Switch));
        assert_eq!("nargs+".parse::<ValueType>(), Ok(ValueType::List));
    }

    #[test]
    fn value_type_rejects_unknown() {
        assert_eq!("float".parse::<ValueType>(), Err("float".to_string()));
    }

    #[test]
    fn overlay_replaces_only_keys_set_in_override() {
        let base = FlagMeta::help_text("global help").int();
        let over = FlagMeta::help_text("override help");

        let merged = base.overlay(&over);
        assert_eq!(merged.help.as_deref(), Some("override help"));
        assert_eq!(merged.value_type.as_deref(), Some("int"));
        assert!(merged.metavar.is_none());
    }

    #[test]
    fn merged_falls_back_to_global_entry() {
        let global = MetadataTable::new().with("ttl", FlagMeta::help_text("TTL").int());
        let overrides = MetadataTable::new();

        let merged = global.merged(&overrides, "ttl");
        assert_eq!(merged, FlagMeta::help_text("TTL").int());
    }

    #[test]
    fn merged_prefers_operation_override() {
        let global = MetadataTable::new().with("name", FlagMeta::help_text("new name"));
        let overrides = MetadataTable::new().with("name", FlagMeta::help_text("rule name"));

        let merged = global.merged(&overrides, "name");
        assert_eq!(merged.help.as_deref(), Some("rule name"));
    }

    #[test]
    fn merged_unknown_param_is_empty() {
        let merged = MetadataTable::new().merged(&MetadataTable::new(), "anything");
        assert_eq!(merged, FlagMeta::default());
    }
}
