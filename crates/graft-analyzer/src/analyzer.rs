//! Single-file source analysis.
//!
//! Analysis runs in three passes over one parsed program:
//!
//! 1. bindings: imports, re-exports, the export map and every top-level name
//!    (this fills the [`AnalyzerContext`] the other passes read)
//! 2. declarations: classes, top-level `const` values and module definitions
//! 3. a whole-program walk collecting `inject()` call sites
//!
//! Only import resolution touches the runtime, and only through its
//! synchronous existence/resolution primitives.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Declaration, ExportDefaultDeclarationKind, Expression, ImportDeclaration,
    ImportDeclarationSpecifier, Program, Statement, VariableDeclaration,
};
use oxc_ast_visit::Visit;
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::path::Path;
use std::sync::Arc;

use crate::class::ClassExtractor;
use crate::context::{AnalyzerContext, CoreFactory, ImportInfo};
use crate::error::{AnalyzeResult, AnalyzerDiagnostic, DiagnosticReason};
use crate::expr::ValueSerializer;
use crate::inject::InjectCollector;
use crate::module_def::{definition_from_initializer, resolve_export_names, site};
use crate::resolve::ImportResolver;
use crate::runtime::Runtime;
use crate::syntax::{binding_name, collect_binding_names, module_export_name, unwrap_expression};
use crate::types::{
    FileAnalysis, ImportBinding, ImportEdge, ImportedName, ModuleDefinitionSite, ReExport,
    ReExportKind,
};

/// Default import source of `defineModule` and `inject`.
pub const DEFAULT_CORE_PACKAGE: &str = "@graft/core";

/// Analyzer configuration
#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    /// Import source whose `defineModule` / `inject` exports are recognized
    pub core_package: String,
    /// Source extensions probed when resolving relative imports
    pub extensions: Vec<String>,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            core_package: DEFAULT_CORE_PACKAGE.to_string(),
            extensions: vec!["ts".to_string(), "tsx".to_string(), "mts".to_string()],
        }
    }
}

/// Extracts a [`FileAnalysis`] from one source file.
#[derive(Debug, Clone)]
pub struct SourceAnalyzer {
    runtime: Arc<dyn Runtime>,
    options: AnalyzerOptions,
}

impl SourceAnalyzer {
    pub fn new(runtime: Arc<dyn Runtime>) -> Self {
        Self::with_options(runtime, AnalyzerOptions::default())
    }

    pub fn with_options(runtime: Arc<dyn Runtime>, options: AnalyzerOptions) -> Self {
        Self { runtime, options }
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    pub fn runtime(&self) -> &Arc<dyn Runtime> {
        &self.runtime
    }

    /// Analyze `source` as the contents of `path`.
    pub fn analyze(&self, path: &Path, source: &str) -> AnalyzeResult<FileAnalysis> {
        let allocator = Allocator::default();
        let source_type = SourceType::from_path(path).unwrap_or_else(|_| SourceType::ts());
        let ret = Parser::new(&allocator, source, source_type).parse();

        if let Some(error) = ret.errors.first() {
            return Err(AnalyzerDiagnostic::new(
                path,
                DiagnosticReason::ParseFailed,
                error.to_string(),
            ));
        }

        let analysis = self.analyze_program(path, source, &ret.program)?;
        tracing::debug!(
            path = %path.display(),
            classes = analysis.classes.len(),
            imports = analysis.imports.len(),
            inject_sites = analysis.inject_sites.len(),
            module_definitions = analysis.module_definitions.len(),
            "analyzed file"
        );
        Ok(analysis)
    }

    fn analyze_program(
        &self,
        path: &Path,
        source: &str,
        program: &Program,
    ) -> AnalyzeResult<FileAnalysis> {
        let resolver = ImportResolver::new(self.runtime.as_ref(), &self.options.extensions);
        let mut ctx = AnalyzerContext::new(path, source);
        let mut analysis = FileAnalysis::new(path);

        for stmt in &program.body {
            self.collect_bindings(stmt, &resolver, &mut ctx, &mut analysis);
        }

        let mut sites = Vec::new();
        {
            let extractor = ClassExtractor::new(&ctx);
            let values = ValueSerializer::new(&ctx);

            for stmt in &program.body {
                match stmt {
                    Statement::ClassDeclaration(class) => {
                        analysis.classes.extend(extractor.extract(class, None)?);
                    }
                    Statement::VariableDeclaration(var) => {
                        collect_variables(&ctx, &values, var, &mut analysis, &mut sites);
                    }
                    Statement::ExpressionStatement(stmt) => {
                        if let Expression::CallExpression(call) = unwrap_expression(&stmt.expression) {
                            if ctx.is_core_call(CoreFactory::DefineModule, call) {
                                if let Some(def) = definition_from_initializer(&ctx, None, &stmt.expression) {
                                    sites.push(site(None, def, call.span));
                                }
                            }
                        }
                    }
                    Statement::ExportNamedDeclaration(decl) => match &decl.declaration {
                        Some(Declaration::ClassDeclaration(class)) => {
                            analysis.classes.extend(extractor.extract(class, None)?);
                        }
                        Some(Declaration::VariableDeclaration(var)) => {
                            collect_variables(&ctx, &values, var, &mut analysis, &mut sites);
                        }
                        _ => {}
                    },
                    Statement::ExportDefaultDeclaration(decl) => match &decl.declaration {
                        ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                            analysis.classes.extend(extractor.extract(class, Some("default"))?);
                        }
                        other => {
                            if let Some(expr) = other.as_expression() {
                                if let Some(def) = definition_from_initializer(&ctx, None, expr) {
                                    let mut default_site = site(None, def, decl.span);
                                    default_site.exported_as = vec!["default".to_string()];
                                    default_site.export_name = Some("default".to_string());
                                    sites.push(default_site);
                                }
                            }
                        }
                    },
                    _ => {}
                }
            }
        }

        let mut collector = InjectCollector::new(&ctx);
        collector.visit_program(program);
        analysis.inject_sites = collector.sites;

        resolve_export_names(&mut sites, &analysis.exports);
        analysis.module_definitions = sites;
        Ok(analysis)
    }

    fn collect_bindings(
        &self,
        stmt: &Statement,
        resolver: &ImportResolver,
        ctx: &mut AnalyzerContext,
        analysis: &mut FileAnalysis,
    ) {
        match stmt {
            Statement::ImportDeclaration(decl) => self.import(decl, resolver, ctx, analysis),
            Statement::ExportAllDeclaration(decl) => {
                if decl.export_kind.is_type() {
                    return;
                }
                let source = decl.source.value.to_string();
                let resolved = resolver.resolve(&source, ctx.path);
                let kind = match &decl.exported {
                    Some(name) => ReExportKind::Namespace {
                        exported: module_export_name(name),
                    },
                    None => ReExportKind::Wildcard,
                };
                analysis.re_exports.push(ReExport {
                    source,
                    resolved: resolved.resolved,
                    is_relative: resolved.is_relative,
                    kind,
                });
            }
            Statement::ExportNamedDeclaration(decl) => {
                let type_only = decl.export_kind.is_type();
                if let Some(source) = &decl.source {
                    let source = source.value.to_string();
                    let resolved = resolver.resolve(&source, ctx.path);
                    for spec in decl
                        .specifiers
                        .iter()
                        .filter(|s| !type_only && !s.export_kind.is_type())
                    {
                        analysis.re_exports.push(ReExport {
                            source: source.clone(),
                            resolved: resolved.resolved.clone(),
                            is_relative: resolved.is_relative,
                            kind: ReExportKind::Named {
                                imported: module_export_name(&spec.local),
                                exported: module_export_name(&spec.exported),
                            },
                        });
                    }
                    return;
                }

                if let Some(declaration) = &decl.declaration {
                    for name in declare(declaration, ctx, analysis) {
                        analysis.exports.insert(name.clone(), name);
                    }
                }
                for spec in decl
                    .specifiers
                    .iter()
                    .filter(|s| !type_only && !s.export_kind.is_type())
                {
                    analysis.exports.insert(
                        module_export_name(&spec.exported),
                        module_export_name(&spec.local),
                    );
                }
            }
            Statement::ExportDefaultDeclaration(decl) => {
                let local = match &decl.declaration {
                    ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                        class.id.as_ref().map(|id| id.name.to_string())
                    }
                    ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                        func.id.as_ref().map(|id| id.name.to_string())
                    }
                    other => match other.as_expression().map(unwrap_expression) {
                        Some(Expression::Identifier(id)) => Some(id.name.to_string()),
                        _ => None,
                    },
                };
                if let Some(local) = &local {
                    ctx.top_level.insert(local.clone());
                }
                analysis
                    .exports
                    .insert("default".to_string(), local.unwrap_or_else(|| "default".to_string()));
            }
            other => {
                if let Some(declaration) = other.as_declaration() {
                    declare(declaration, ctx, analysis);
                }
            }
        }
    }

    fn import(
        &self,
        decl: &ImportDeclaration,
        resolver: &ImportResolver,
        ctx: &mut AnalyzerContext,
        analysis: &mut FileAnalysis,
    ) {
        if decl.import_kind.is_type() {
            return;
        }

        let source = decl.source.value.to_string();
        let resolved = resolver.resolve(&source, ctx.path);
        let is_core = source == self.options.core_package;

        let mut bindings = Vec::new();
        for spec in decl.specifiers.iter().flatten() {
            let binding = match spec {
                ImportDeclarationSpecifier::ImportSpecifier(s) => {
                    if s.import_kind.is_type() {
                        continue;
                    }
                    let imported = module_export_name(&s.imported);
                    if is_core {
                        ctx.core.record_named(&imported, &s.local.name);
                    }
                    ImportBinding {
                        local: s.local.name.to_string(),
                        imported: ImportedName::Named(imported),
                    }
                }
                ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => ImportBinding {
                    local: s.local.name.to_string(),
                    imported: ImportedName::Default,
                },
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                    if is_core {
                        ctx.core.record_namespace(&s.local.name);
                    }
                    ImportBinding {
                        local: s.local.name.to_string(),
                        imported: ImportedName::Namespace,
                    }
                }
            };
            ctx.imports.insert(
                binding.local.clone(),
                ImportInfo {
                    resolved: resolved.resolved.clone(),
                    imported: binding.imported.clone(),
                },
            );
            bindings.push(binding);
        }

        analysis.imports.push(ImportEdge {
            source,
            resolved: resolved.resolved,
            is_relative: resolved.is_relative,
            bindings,
        });
    }
}

/// Register the value names a declaration introduces; returns them.
fn declare(
    declaration: &Declaration,
    ctx: &mut AnalyzerContext,
    analysis: &mut FileAnalysis,
) -> Vec<String> {
    let mut names = Vec::new();
    match declaration {
        Declaration::VariableDeclaration(var) => {
            for declarator in &var.declarations {
                collect_binding_names(&declarator.id, &mut names);
            }
        }
        Declaration::FunctionDeclaration(func) => names.extend(func.id.as_ref().map(|id| id.name.to_string())),
        Declaration::ClassDeclaration(class) => names.extend(class.id.as_ref().map(|id| id.name.to_string())),
        Declaration::TSEnumDeclaration(decl) => names.push(decl.id.name.to_string()),
        Declaration::TSInterfaceDeclaration(decl) => {
            let name = decl.id.name.to_string();
            analysis.interfaces.push(name.clone());
            return vec![name];
        }
        _ => {}
    }
    ctx.top_level.extend(names.iter().cloned());
    names
}

fn collect_variables(
    ctx: &AnalyzerContext,
    values: &ValueSerializer,
    var: &VariableDeclaration,
    analysis: &mut FileAnalysis,
    sites: &mut Vec<ModuleDefinitionSite>,
) {
    for declarator in &var.declarations {
        let Some(init) = &declarator.init else {
            continue;
        };
        let name = binding_name(&declarator.id);
        if let Some(name) = name {
            analysis.locals.insert(name.to_string(), values.value(init));
        }
        if let Some(def) = definition_from_initializer(ctx, name, init) {
            sites.push(site(name.map(String::from), def, declarator.span));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::memory::MemoryRuntime;
    use crate::types::InjectKind;
    use crate::value::AnalyzerValue;

    fn analyze(source: &str) -> AnalyzeResult<FileAnalysis> {
        let runtime = Arc::new(
            MemoryRuntime::new("/app")
                .with_file("src/users/service.ts", "")
                .with_file("src/users/repo.ts", ""),
        );
        SourceAnalyzer::new(runtime).analyze(Path::new("/app/src/users/module.ts"), source)
    }

    #[test]
    fn test_parse_failure_is_a_diagnostic() {
        let err = analyze("export const = ;").unwrap_err();
        assert_eq!(err.reason, DiagnosticReason::ParseFailed);
    }

    #[test]
    fn test_type_only_imports_are_skipped() {
        let analysis = analyze(
            "import type { Repo } from './repo';\nimport { type A, UserService } from './service';",
        )
        .unwrap();
        assert_eq!(analysis.imports.len(), 1);
        assert_eq!(analysis.imports[0].resolved, "/app/src/users/service.ts");
        assert_eq!(analysis.imports[0].bindings.len(), 1);
    }

    #[test]
    fn test_renamed_core_factories_are_tracked() {
        let analysis = analyze(
            r#"
            import { defineModule as dm, inject as use } from '@graft/core';
            import * as g from '@graft/core';
            export const users = dm({ name: 'users' });
            const a = use(Repo);
            const b = g.inject(() => Repo);
            const c = inject(Repo);
            "#,
        )
        .unwrap();

        assert_eq!(analysis.module_definitions.len(), 1);
        let def = &analysis.module_definitions[0];
        assert_eq!(def.export_name.as_deref(), Some("users"));
        assert_eq!(def.definition.name.as_deref(), Some("users"));
        assert!(def.definition.name_declared);

        let kinds: Vec<_> = analysis.inject_sites.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![InjectKind::Token, InjectKind::Thunk]);
    }

    #[test]
    fn test_module_binding_object_literal() {
        let analysis = analyze("const module = { providers: [A, ...extra] };\nexport { module };").unwrap();
        let def = &analysis.module_definitions[0];
        assert!(def.is_exported());
        assert!(!def.definition.name_declared);
        assert_eq!(def.definition.providers.len(), 2);
        assert!(def.definition.providers[1].is_spread());
    }

    #[test]
    fn test_export_default_definition() {
        let analysis = analyze(
            "import { defineModule } from '@graft/core';\nexport default defineModule({ name: 'x' });",
        )
        .unwrap();
        assert_eq!(
            analysis.module_definitions[0].export_name.as_deref(),
            Some("default")
        );
    }

    #[test]
    fn test_exports_and_re_exports() {
        let analysis = analyze(
            r#"
            export * from './service';
            export * as repo from './repo';
            export { X as Y } from './service';
            const local = 1;
            export { local as alias };
            export class Thing {}
            export interface Shape {}
            "#,
        )
        .unwrap();

        assert_eq!(analysis.re_exports.len(), 3);
        assert_eq!(analysis.re_exports[0].kind, ReExportKind::Wildcard);
        assert_eq!(analysis.exports.get("alias").map(String::as_str), Some("local"));
        assert_eq!(analysis.exports.get("Thing").map(String::as_str), Some("Thing"));
        assert_eq!(analysis.interfaces, vec!["Shape".to_string()]);
        assert_eq!(analysis.locals.get("local"), Some(&AnalyzerValue::Num(1.0)));
    }
}
