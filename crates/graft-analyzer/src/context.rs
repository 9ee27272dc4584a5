//! Per-call analysis state.
//!
//! One `AnalyzerContext` exists per analyzed file and is threaded by
//! reference through every extraction pass, so analyses of different files
//! share nothing and can run concurrently.

use oxc_ast::ast::{CallExpression, Expression};
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::Path;

use crate::syntax::{dotted_name, root_name, unwrap_expression};
use crate::types::ImportedName;
use crate::value::SymbolRef;

/// The two factories recognized on the core import source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreFactory {
    DefineModule,
    Inject,
}

impl CoreFactory {
    pub fn export_name(self) -> &'static str {
        match self {
            Self::DefineModule => "defineModule",
            Self::Inject => "inject",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ImportInfo {
    pub resolved: String,
    pub imported: ImportedName,
}

/// Local names under which the core factories are reachable.
#[derive(Debug, Default)]
pub(crate) struct CoreAliases {
    define_module: FxHashSet<String>,
    inject: FxHashSet<String>,
    namespaces: FxHashSet<String>,
}

impl CoreAliases {
    pub fn record_named(&mut self, imported: &str, local: &str) {
        if imported == CoreFactory::DefineModule.export_name() {
            self.define_module.insert(local.to_string());
        } else if imported == CoreFactory::Inject.export_name() {
            self.inject.insert(local.to_string());
        }
    }

    pub fn record_namespace(&mut self, local: &str) {
        self.namespaces.insert(local.to_string());
    }

    fn matches(&self, factory: CoreFactory, callee: &Expression) -> bool {
        match unwrap_expression(callee) {
            Expression::Identifier(id) => {
                let locals = match factory {
                    CoreFactory::DefineModule => &self.define_module,
                    CoreFactory::Inject => &self.inject,
                };
                locals.contains(id.name.as_str())
            }
            Expression::StaticMemberExpression(member) => {
                member.property.name == factory.export_name()
                    && matches!(
                        unwrap_expression(&member.object),
                        Expression::Identifier(ns) if self.namespaces.contains(ns.name.as_str())
                    )
            }
            _ => false,
        }
    }
}

pub(crate) struct AnalyzerContext<'s> {
    pub path: &'s Path,
    pub source: &'s str,
    pub imports: FxHashMap<String, ImportInfo>,
    /// Names declared at module top level (imports excluded).
    pub top_level: FxHashSet<String>,
    pub core: CoreAliases,
}

impl<'s> AnalyzerContext<'s> {
    pub fn new(path: &'s Path, source: &'s str) -> Self {
        Self {
            path,
            source,
            imports: FxHashMap::default(),
            top_level: FxHashSet::default(),
            core: CoreAliases::default(),
        }
    }

    pub fn is_core_call(&self, factory: CoreFactory, call: &CallExpression) -> bool {
        self.core.matches(factory, &call.callee)
    }

    pub fn is_module_scoped(&self, name: &str) -> bool {
        self.imports.contains_key(name) || self.top_level.contains(name)
    }

    pub fn import_source(&self, local: &str) -> Option<String> {
        self.imports
            .get(root_name(local))
            .map(|info| info.resolved.clone())
    }

    /// Symbolic reference for an identifier or dotted member chain.
    pub fn symbol(&self, dotted: &str) -> SymbolRef {
        let root = root_name(dotted);
        let Some(info) = self.imports.get(root) else {
            return SymbolRef::local(dotted);
        };

        let imported = match &info.imported {
            ImportedName::Named(name) if name != root => Some(name.clone()),
            ImportedName::Named(_) => None,
            ImportedName::Default => Some("default".to_string()),
            ImportedName::Namespace => dotted.split('.').nth(1).map(String::from),
        };

        SymbolRef {
            name: dotted.to_string(),
            imported,
            import_source: Some(info.resolved.clone()),
        }
    }

    /// Name as the defining module spells it: `@Svc()` imported as
    /// `{ Injectable as Svc }` is `Injectable`, `@di.Injectable()` is
    /// `Injectable`.
    pub fn canonical_name(&self, dotted: &str) -> String {
        let root = root_name(dotted);
        match self.imports.get(root).map(|info| &info.imported) {
            Some(ImportedName::Named(name)) if dotted == root => name.clone(),
            Some(ImportedName::Namespace) if dotted != root => dotted
                .rsplit('.')
                .next()
                .unwrap_or(dotted)
                .to_string(),
            _ => dotted.to_string(),
        }
    }

    /// Canonical callee name of a call, if the callee is a name.
    pub fn callee_name(&self, callee: &Expression) -> Option<String> {
        dotted_name(callee).map(|name| self.canonical_name(&name))
    }
}
