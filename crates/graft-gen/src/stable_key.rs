//! Canonical keys for literal and reference data.
//!
//! Keys are used to deduplicate and order values that have no natural
//! ordering (dynamic provider bundles, for instance). References to
//! top-level `const` values are expanded through the program index, which
//! can loop (`const a = { b }; const b = { a };`). Every expanded binding is
//! remembered for the whole call and a second visit renders
//! [`CIRCULAR`] instead of recursing, so a binding that is merely repeated
//! renders the sentinel too.

use graft_analyzer::{AnalyzerValue, ProgramIndex, RecordEntry, RecordKey};
use rustc_hash::FxHashSet as HashSet;
use std::path::{Path, PathBuf};

use crate::imports::quote;
use crate::render::number;

/// Rendered in place of a binding that was already expanded.
pub const CIRCULAR: &str = "[Circular]";

#[derive(Debug, Clone, Copy)]
pub struct StableKey<'a> {
    index: Option<ProgramIndex<'a>>,
}

impl<'a> StableKey<'a> {
    /// Keys that keep references symbolic.
    pub fn shallow() -> Self {
        Self { index: None }
    }

    /// Keys that expand references to top-level `const` values.
    pub fn expanding(index: ProgramIndex<'a>) -> Self {
        Self { index: Some(index) }
    }

    /// Canonical key of `value` as written in `file`.
    pub fn key(&self, file: &Path, value: &AnalyzerValue) -> String {
        let mut visited = HashSet::default();
        let mut out = String::new();
        self.write(file, value, &mut visited, &mut out);
        out
    }

    fn write(
        &self,
        file: &Path,
        value: &AnalyzerValue,
        visited: &mut HashSet<(PathBuf, String)>,
        out: &mut String,
    ) {
        match value {
            AnalyzerValue::Null => out.push_str("null"),
            AnalyzerValue::Undefined => out.push_str("undefined"),
            AnalyzerValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            AnalyzerValue::Num(n) => out.push_str(&number(*n)),
            AnalyzerValue::Str(s) => out.push_str(&quote(s)),
            AnalyzerValue::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    self.write(file, item, visited, out);
                }
                out.push(']');
            }
            AnalyzerValue::Record(entries) => {
                let mut parts: Vec<String> = entries
                    .iter()
                    .map(|entry| {
                        let mut part = String::new();
                        match entry {
                            RecordEntry::Property { key, value } => {
                                match key {
                                    RecordKey::Static(name) => part.push_str(&quote(name)),
                                    RecordKey::Computed(text) => {
                                        part.push('[');
                                        part.push_str(text);
                                        part.push(']');
                                    }
                                }
                                part.push(':');
                                self.write(file, value, visited, &mut part);
                            }
                            RecordEntry::Spread { value } => {
                                part.push_str("...");
                                self.write(file, value, visited, &mut part);
                            }
                        }
                        part
                    })
                    .collect();
                parts.sort();
                out.push('{');
                out.push_str(&parts.join(","));
                out.push('}');
            }
            AnalyzerValue::Spread(inner) => {
                out.push_str("...");
                self.write(file, inner, visited, out);
            }
            AnalyzerValue::SymbolicRef(symbol) => {
                if !self.expand(file, &symbol.name, visited, out) {
                    out.push('@');
                    out.push_str(symbol.export_name());
                    if let Some(source) = &symbol.import_source {
                        out.push_str(" from ");
                        out.push_str(&quote(source));
                    }
                }
            }
            AnalyzerValue::ForwardRef(name) => {
                out.push_str("forwardRef(@");
                out.push_str(name);
                out.push(')');
            }
            AnalyzerValue::CallExpr(call) => {
                out.push_str("call ");
                out.push_str(&call.callee);
                self.write_args(file, &call.args, visited, out);
            }
            AnalyzerValue::NewExpr(new) => {
                out.push_str("new ");
                out.push_str(&new.class_name);
                self.write_args(file, &new.args, visited, out);
            }
            AnalyzerValue::FactoryCapture(capture) => {
                out.push_str("fn ");
                out.push_str(&quote(&capture.code));
            }
            AnalyzerValue::Opaque(text) => {
                out.push_str("opaque ");
                out.push_str(&quote(text));
            }
        }
    }

    fn write_args(
        &self,
        file: &Path,
        args: &[AnalyzerValue],
        visited: &mut HashSet<(PathBuf, String)>,
        out: &mut String,
    ) {
        out.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            self.write(file, arg, visited, out);
        }
        out.push(')');
    }

    /// Expand a reference to a top-level value. Returns false when the
    /// reference does not lead to one.
    fn expand(
        &self,
        file: &Path,
        name: &str,
        visited: &mut HashSet<(PathBuf, String)>,
        out: &mut String,
    ) -> bool {
        let Some(index) = self.index else {
            return false;
        };
        if name.contains('.') {
            return false;
        }
        let Some(target) = index.resolve_binding(file, name) else {
            return false;
        };
        let Some(value) = index
            .file(&target.file)
            .and_then(|analysis| analysis.locals.get(&target.local))
        else {
            return false;
        };
        if !visited.insert((target.file.clone(), target.local.clone())) {
            out.push_str(CIRCULAR);
            return true;
        }
        self.write(&target.file, value, visited, out);
        true
    }
}
