//! Statically serialized expression trees.
//!
//! Decorator arguments, provider records and module definitions are never
//! evaluated. Instead each expression is lowered into an [`AnalyzerValue`]:
//! literals become data, identifiers become symbolic references that remember
//! where they were imported from, and functions are captured as raw source
//! text together with the spans that later code generation rewrites.

use serde::{Deserialize, Serialize};

/// A serialized expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum AnalyzerValue {
    Null,
    Undefined,
    Bool(bool),
    Num(f64),
    Str(String),
    Array(Vec<AnalyzerValue>),
    Record(Vec<RecordEntry>),
    /// `...expr` inside an array literal.
    Spread(Box<AnalyzerValue>),
    SymbolicRef(SymbolRef),
    /// `forwardRef(() => X)`
    ForwardRef(String),
    CallExpr(CallValue),
    NewExpr(NewValue),
    FactoryCapture(FactoryCapture),
    /// Anything that has no static meaning; kept as source text.
    Opaque(String),
}

/// One member of an object literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RecordEntry {
    Property { key: RecordKey, value: AnalyzerValue },
    Spread { value: AnalyzerValue },
}

/// Object literal keys. Computed keys keep their source text and never
/// collide with a static key of the same spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "camelCase")]
pub enum RecordKey {
    Static(String),
    Computed(String),
}

/// Reference to a binding, optionally traced to its import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolRef {
    /// Local name, dotted for member chains (`Config.Token`).
    pub name: String,
    /// Name exported by the source module when imported under an alias.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported: Option<String>,
    /// Resolved import path (or raw specifier) when the root is imported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_source: Option<String>,
}

impl SymbolRef {
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            imported: None,
            import_source: None,
        }
    }

    /// Name as exported by the defining module.
    pub fn export_name(&self) -> &str {
        self.imported.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallValue {
    pub callee: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_source: Option<String>,
    pub args: Vec<AnalyzerValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewValue {
    pub class_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_source: Option<String>,
    pub args: Vec<AnalyzerValue>,
}

/// A function expression kept verbatim for splicing into generated code.
///
/// All offsets are byte offsets relative to the start of `code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactoryCapture {
    pub code: String,
    /// Parameter names in declaration order.
    pub params: Vec<String>,
    /// Free identifiers referring to imports or module-level bindings.
    pub deps: Vec<CapturedDependency>,
    /// `inject()` calls nested in the body.
    pub inject_sites: Vec<CapturedInject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedDependency {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_source: Option<String>,
    pub start: u32,
    pub end: u32,
    /// `{ name }` shorthand property; splicing must expand to `name: <expr>`.
    pub shorthand: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedInject {
    pub site: crate::types::InjectSite,
    pub start: u32,
    pub end: u32,
}

impl AnalyzerValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[AnalyzerValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&[RecordEntry]> {
        match self {
            Self::Record(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a static property of a record. The last occurrence wins, as
    /// it would at runtime.
    pub fn get(&self, key: &str) -> Option<&AnalyzerValue> {
        self.as_record()?.iter().rev().find_map(|entry| match entry {
            RecordEntry::Property {
                key: RecordKey::Static(name),
                value,
            } if name == key => Some(value),
            _ => None,
        })
    }

    /// Whether a record has a static property named `key`.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Symbolic reference payload, also looking through `forwardRef`.
    pub fn as_symbol(&self) -> Option<&SymbolRef> {
        match self {
            Self::SymbolicRef(symbol) => Some(symbol),
            _ => None,
        }
    }

    /// The token a value denotes when used as a DI key: the referenced
    /// binding name, the `forwardRef` target or a string literal.
    pub fn token_name(&self) -> Option<&str> {
        match self {
            Self::SymbolicRef(symbol) => Some(&symbol.name),
            Self::ForwardRef(name) => Some(name),
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_spread(&self) -> bool {
        matches!(self, Self::Spread(_))
    }
}
