//! Import bookkeeping for generated files.
//!
//! Every symbol generated code touches is imported under a collision-free
//! alias `<Name>__<n>`. Aliases are handed out in request order, which is
//! deterministic because every generator walks sorted views; the import
//! block itself is emitted sorted by specifier.

use graft_analyzer::{ProgramIndex, SymbolRef};
use graft_graph::ClassTarget;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::error::{GenError, Result};
use crate::writer::CodeWriter;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Imported {
    Named(String),
    Namespace,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ImportKey {
    specifier: String,
    imported: Imported,
}

#[derive(Debug)]
pub struct ImportTable<'a> {
    index: ProgramIndex<'a>,
    out_dir: PathBuf,
    aliases: BTreeMap<ImportKey, String>,
    next: usize,
}

impl<'a> ImportTable<'a> {
    pub fn new(index: ProgramIndex<'a>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            index,
            out_dir: out_dir.into(),
            aliases: BTreeMap::new(),
            next: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Alias for `export` of `source` (a path or bare specifier); `None`
    /// imports the module namespace.
    pub fn import(&mut self, source: &str, export: Option<&str>, hint: &str) -> String {
        let key = ImportKey {
            specifier: self.specifier(source),
            imported: match export {
                Some(name) => Imported::Named(name.to_string()),
                None => Imported::Namespace,
            },
        };
        if let Some(alias) = self.aliases.get(&key) {
            return alias.clone();
        }
        let alias = format!("{}__{}", identifier_base(hint), self.next);
        self.next += 1;
        self.aliases.insert(key, alias.clone());
        alias
    }

    /// Expression for the top-level binding `local` as seen from `file`.
    pub fn binding(&mut self, file: &Path, local: &str) -> Result<String> {
        let Some(analysis) = self.index.file(file) else {
            return Err(GenError::UnexportedBinding {
                name: local.to_string(),
                file: file.to_path_buf(),
            });
        };
        if let Some((edge, binding)) = analysis.import_of(local) {
            // packages keep their bare specifier
            let source = if edge.is_relative {
                edge.resolved.clone()
            } else {
                edge.source.clone()
            };
            let export = binding.imported.export_name().map(str::to_string);
            return Ok(self.import(&source, export.as_deref(), local));
        }
        let export = analysis
            .exports
            .iter()
            .find(|(_, target)| target.as_str() == local)
            .map(|(exported, _)| exported.clone());
        match export {
            Some(export) => {
                let source = file.display().to_string();
                Ok(self.import(&source, Some(&export), local))
            }
            None => Err(GenError::UnexportedBinding {
                name: local.to_string(),
                file: file.to_path_buf(),
            }),
        }
    }

    /// Expression for a symbolic reference written in `file`. Member chains
    /// (`Config.Token`) import their root only.
    pub fn symbol(&mut self, file: &Path, symbol: &SymbolRef) -> Result<String> {
        let (root, rest) = split_member(&symbol.name);
        if self.index.file(file).is_some() {
            let alias = self.binding(file, root)?;
            return Ok(format!("{alias}{rest}"));
        }
        match &symbol.import_source {
            Some(source) => {
                let export = symbol.imported.as_deref().unwrap_or(root);
                Ok(format!("{}{rest}", self.import(source, Some(export), root)))
            }
            None => Err(GenError::UnexportedBinding {
                name: symbol.name.clone(),
                file: file.to_path_buf(),
            }),
        }
    }

    /// Alias for `export` of the module `file` imports as `source` (the
    /// resolved path recorded by the analyzer).
    pub fn imported(&mut self, file: &Path, source: &str, export: &str) -> String {
        let edge = self
            .index
            .file(file)
            .and_then(|analysis| analysis.imports.iter().find(|edge| edge.resolved == source));
        let specifier = match edge {
            Some(edge) if !edge.is_relative => edge.source.clone(),
            _ => source.to_string(),
        };
        self.import(&specifier, Some(export), export)
    }

    pub fn class(&mut self, class: &ClassTarget) -> Result<String> {
        match &class.import.export_name {
            Some(export) => Ok(self.import(&class.import.source, Some(export), &class.name)),
            None => Err(GenError::UnexportedBinding {
                name: class.name.clone(),
                file: class
                    .file
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(&class.import.source)),
            }),
        }
    }

    /// Emit the import block, one statement per specifier.
    pub fn write(&self, w: &mut CodeWriter) {
        let mut by_specifier: BTreeMap<&str, Vec<(&Imported, &str)>> = BTreeMap::new();
        for (key, alias) in &self.aliases {
            by_specifier
                .entry(&key.specifier)
                .or_default()
                .push((&key.imported, alias));
        }
        for (specifier, bindings) in by_specifier {
            let quoted = quote(specifier);
            let mut named = Vec::new();
            for (imported, alias) in bindings {
                match imported {
                    Imported::Named(name) => named.push(format!("{name} as {alias}")),
                    Imported::Namespace => {
                        w.line(format!("import * as {alias} from {quoted};"));
                    }
                }
            }
            if !named.is_empty() {
                w.line(format!("import {{ {} }} from {quoted};", named.join(", ")));
            }
        }
    }

    fn specifier(&self, source: &str) -> String {
        let path = Path::new(source);
        if path.is_absolute() {
            relative_specifier(&self.out_dir, path)
        } else {
            source.to_string()
        }
    }
}

/// `./x` style specifier for `target` relative to `from_dir`, with the
/// TypeScript extension mapped to what the emitted module resolves.
pub fn relative_specifier(from_dir: &Path, target: &Path) -> String {
    let from: Vec<Component> = from_dir.components().collect();
    let to: Vec<Component> = target.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..from.len() {
        parts.push("..".to_string());
    }
    for component in &to[common..] {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }
    if let Some(last) = parts.last_mut() {
        *last = strip_ts_extension(last);
    }

    let joined = parts.join("/");
    if joined.starts_with("..") {
        joined
    } else {
        format!("./{joined}")
    }
}

fn strip_ts_extension(name: &str) -> String {
    for (ext, replacement) in [(".d.ts", ""), (".tsx", ""), (".ts", ""), (".mts", ".mjs"), (".cts", ".cjs")] {
        if let Some(stem) = name.strip_suffix(ext) {
            return format!("{stem}{replacement}");
        }
    }
    name.to_string()
}

/// Split `a.b.c` into `("a", ".b.c")`.
pub(crate) fn split_member(name: &str) -> (&str, &str) {
    match name.find('.') {
        Some(dot) => (&name[..dot], &name[dot..]),
        None => (name, ""),
    }
}

fn identifier_base(hint: &str) -> String {
    let base: String = hint
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    match base.chars().next() {
        Some(c) if !c.is_ascii_digit() => base,
        _ => format!("_{base}"),
    }
}

/// Double-quoted string literal.
pub(crate) fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{text}\""))
}
