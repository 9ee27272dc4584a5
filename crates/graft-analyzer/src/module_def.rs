//! Module-definition extraction.

use oxc_ast::ast::{Argument, Expression};
use std::collections::BTreeMap;

use crate::context::{AnalyzerContext, CoreFactory};
use crate::expr::ValueSerializer;
use crate::syntax::unwrap_expression;
use crate::types::{ModuleDefinition, ModuleDefinitionSite, SourceSpan};
use crate::value::AnalyzerValue;

/// Binding name that designates a module definition without a call.
pub const MODULE_BINDING: &str = "module";

/// Parse a module definition from a binding initializer.
///
/// A `defineModule(...)` call counts under any binding name; a plain object
/// literal counts only when bound to `module`.
pub(crate) fn definition_from_initializer(
    ctx: &AnalyzerContext,
    binding: Option<&str>,
    init: &Expression,
) -> Option<ModuleDefinition> {
    match unwrap_expression(init) {
        Expression::CallExpression(call) if ctx.is_core_call(CoreFactory::DefineModule, call) => {
            let arg = match call.arguments.first() {
                Some(Argument::SpreadElement(_)) | None => None,
                Some(arg) => arg.as_expression(),
            };
            Some(parse_definition(ctx, arg))
        }
        expr @ Expression::ObjectExpression(_) if binding == Some(MODULE_BINDING) => {
            Some(parse_definition(ctx, Some(expr)))
        }
        _ => None,
    }
}

fn parse_definition(ctx: &AnalyzerContext, arg: Option<&Expression>) -> ModuleDefinition {
    let raw = arg
        .map(|expr| ValueSerializer::new(ctx).value(expr))
        .unwrap_or(AnalyzerValue::Undefined);

    let name = raw.get("name").and_then(|v| v.as_str()).map(String::from);
    let providers = match raw.get("providers") {
        Some(AnalyzerValue::Array(items)) => items.clone(),
        Some(other @ AnalyzerValue::SymbolicRef(_)) => vec![AnalyzerValue::Spread(Box::new(other.clone()))],
        _ => Vec::new(),
    };
    let adapters = raw.get("adapters").cloned();

    ModuleDefinition {
        name_declared: name.is_some(),
        name,
        providers,
        adapters,
        raw,
    }
}

pub(crate) fn site(
    local: Option<String>,
    definition: ModuleDefinition,
    span: oxc_span::Span,
) -> ModuleDefinitionSite {
    ModuleDefinitionSite {
        local,
        exported_as: Vec::new(),
        export_name: None,
        definition,
        span: SourceSpan::from(span),
    }
}

/// Apply the file's exported-name -> local map to every definition site.
///
/// A local exported under several aliases takes the lexicographically
/// smallest one as its canonical export name.
pub(crate) fn resolve_export_names(
    sites: &mut [ModuleDefinitionSite],
    exports: &BTreeMap<String, String>,
) {
    for site in sites.iter_mut() {
        let Some(local) = site.local.as_deref() else {
            continue;
        };
        let aliases: Vec<String> = exports
            .iter()
            .filter(|(_, target)| target.as_str() == local)
            .map(|(exported, _)| exported.clone())
            .collect();
        site.export_name = aliases.first().cloned();
        site.exported_as = aliases;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site_for(local: &str) -> ModuleDefinitionSite {
        site(
            Some(local.to_string()),
            ModuleDefinition {
                name: None,
                name_declared: false,
                providers: Vec::new(),
                adapters: None,
                raw: AnalyzerValue::Undefined,
            },
            oxc_span::Span::new(0, 0),
        )
    }

    #[test]
    fn test_smallest_alias_wins() {
        let mut sites = vec![site_for("users")];
        let exports = BTreeMap::from([
            ("zeta".to_string(), "users".to_string()),
            ("module".to_string(), "users".to_string()),
            ("other".to_string(), "other".to_string()),
        ]);

        resolve_export_names(&mut sites, &exports);

        assert_eq!(sites[0].export_name.as_deref(), Some("module"));
        assert_eq!(sites[0].exported_as, vec!["module".to_string(), "zeta".to_string()]);
    }

    #[test]
    fn test_unexported_local() {
        let mut sites = vec![site_for("hidden")];
        resolve_export_names(&mut sites, &BTreeMap::new());
        assert!(!sites[0].is_exported());
    }
}
