//! Static field reader for adapter classes.
//!
//! The adapter class source is re-parsed with a full tree and only literal
//! data is accepted: string literals, arrays, object literals, `true` and
//! identifier references.

use graft_analyzer::oxc::ast::{
    ArrayExpressionElement, Class, ClassElement, Declaration, ExportDefaultDeclarationKind,
    Expression, MethodDefinition, MethodDefinitionKind, ObjectExpression, ObjectPropertyKind,
    PropertyKey, Statement,
};
use graft_analyzer::oxc::{Allocator, GetSpan, Parser, SourceType};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{AdapterError, Result};
use crate::static_spec::{AdapterStaticSpec, EntryDecorators, PipelineSpec, RuntimeHooks};

/// Parse `source` and read the static shape of class `class_name`.
pub fn read_adapter_class(
    path: &Path,
    source: &str,
    class_name: &str,
    package: &str,
) -> Result<AdapterStaticSpec> {
    let allocator = Allocator::default();
    let source_type = SourceType::from_path(path).unwrap_or_else(|_| SourceType::ts());
    let ret = Parser::new(&allocator, source, source_type).parse();
    if let Some(error) = ret.errors.first() {
        return Err(AdapterError::ParseFailed {
            file: path.to_path_buf(),
            message: error.to_string(),
        });
    }

    let class = ret
        .program
        .body
        .iter()
        .find_map(|stmt| declared_class(stmt, class_name))
        .ok_or_else(|| AdapterError::UnresolvedAdapterClass {
            class: class_name.to_string(),
            file: path.to_path_buf(),
        })?;

    StaticFields::collect(class, source).read(class_name, package, path.to_path_buf())
}

fn declared_class<'b, 'a>(stmt: &'b Statement<'a>, name: &str) -> Option<&'b Class<'a>> {
    let class = match stmt {
        Statement::ClassDeclaration(class) => class,
        Statement::ExportNamedDeclaration(export) => match &export.declaration {
            Some(Declaration::ClassDeclaration(class)) => class,
            _ => return None,
        },
        Statement::ExportDefaultDeclaration(export) => match &export.declaration {
            ExportDefaultDeclarationKind::ClassDeclaration(class) => class,
            _ => return None,
        },
        _ => return None,
    };
    let id = class.id.as_ref()?;
    (id.name.as_str() == name).then_some(&**class)
}

/// A static member's value: a property initializer or the single returned
/// expression of a static method.
struct StaticFields<'b, 'a> {
    source: &'b str,
    fields: BTreeMap<String, &'b Expression<'a>>,
    /// Static methods whose body is not a single `return`.
    opaque_methods: Vec<String>,
}

impl<'b, 'a> StaticFields<'b, 'a> {
    fn collect(class: &'b Class<'a>, source: &'b str) -> Self {
        let mut fields = BTreeMap::new();
        let mut opaque_methods = Vec::new();
        for element in &class.body.body {
            match element {
                ClassElement::PropertyDefinition(prop) if prop.r#static => {
                    let (Some(name), Some(value)) = (key_name(&prop.key, prop.computed), &prop.value) else {
                        continue;
                    };
                    fields.insert(name, value);
                }
                ClassElement::MethodDefinition(method)
                    if method.r#static && matches!(method.kind, MethodDefinitionKind::Method) =>
                {
                    let Some(name) = key_name(&method.key, method.computed) else {
                        continue;
                    };
                    match single_return(method) {
                        Some(value) => {
                            fields.insert(name, value);
                        }
                        None => opaque_methods.push(name),
                    }
                }
                _ => {}
            }
        }
        Self {
            source,
            fields,
            opaque_methods,
        }
    }

    fn require(&self, class: &str, field: &str) -> Result<&'b Expression<'a>> {
        self.fields
            .get(field)
            .copied()
            .ok_or_else(|| AdapterError::MissingStaticField {
                class: class.to_string(),
                field: field.to_string(),
            })
    }

    fn read(&self, class: &str, package: &str, file: PathBuf) -> Result<AdapterStaticSpec> {
        let adapter_id = string_literal(self.require(class, "adapterId")?)
            .ok_or_else(|| AdapterError::InvalidAdapterId {
                class: class.to_string(),
            })?;

        let middleware_phase_order = self.phase_order(class)?;
        let supported_middleware_phases = self.supported_phases(class, &middleware_phase_order)?;
        let entry_decorators = self.entry_decorators(class)?;
        let runtime = self.runtime_hooks(class)?;
        let pipeline = self.pipeline(class)?;

        if pipeline.middlewares.len() != middleware_phase_order.len() {
            return Err(AdapterError::PipelineLengthMismatch {
                class: class.to_string(),
                middlewares: pipeline.middlewares.len(),
                phases: middleware_phase_order.len(),
            });
        }

        Ok(AdapterStaticSpec {
            adapter_id,
            class_name: class.to_string(),
            package: package.to_string(),
            file,
            pipeline,
            middleware_phase_order,
            supported_middleware_phases,
            entry_decorators,
            runtime,
        })
    }

    fn phase_order(&self, class: &str) -> Result<Vec<String>> {
        let invalid = |reason: &str| AdapterError::InvalidPhaseOrder {
            class: class.to_string(),
            reason: reason.to_string(),
        };
        let elements = array_elements(self.require(class, "middlewarePhaseOrder")?)
            .ok_or_else(|| invalid("expected an array literal"))?;
        let mut order: Vec<String> = Vec::new();
        for element in elements {
            let phase = element
                .and_then(string_literal)
                .ok_or_else(|| invalid("every phase must be a string literal"))?;
            if !order.contains(&phase) {
                order.push(phase);
            }
        }
        Ok(order)
    }

    fn supported_phases(&self, class: &str, order: &[String]) -> Result<BTreeMap<String, bool>> {
        let invalid = |reason: String| AdapterError::InvalidSupportedPhases {
            class: class.to_string(),
            reason,
        };
        let Expression::ObjectExpression(object) = self.require(class, "supportedMiddlewarePhases")? else {
            return Err(invalid("expected an object literal".to_string()));
        };

        let mut phases = BTreeMap::new();
        for (key, value) in object_entries(object).map_err(invalid)? {
            if !matches!(value, Expression::BooleanLiteral(b) if b.value) {
                return Err(invalid(format!("'{key}' must be `true`")));
            }
            phases.insert(key, true);
        }

        let declared: Vec<&String> = phases.keys().collect();
        let mut expected: Vec<&String> = order.iter().collect();
        expected.sort();
        if declared != expected {
            return Err(invalid(format!(
                "keys [{}] do not match middlewarePhaseOrder [{}]",
                join(declared),
                join(expected)
            )));
        }
        Ok(phases)
    }

    fn entry_decorators(&self, class: &str) -> Result<EntryDecorators> {
        let invalid = |reason: String| AdapterError::InvalidEntryDecorators {
            class: class.to_string(),
            reason,
        };
        let Expression::ObjectExpression(object) = self.require(class, "entryDecorators")? else {
            return Err(invalid("expected an object literal".to_string()));
        };
        let entries: BTreeMap<String, &Expression> = object_entries(object).map_err(invalid)?.into_iter().collect();

        let controller = entries
            .get("controller")
            .and_then(|value| identifier(value))
            .ok_or_else(|| invalid("'controller' must be an identifier".to_string()))?;
        let handler = entries
            .get("handler")
            .and_then(|value| array_elements(value))
            .ok_or_else(|| invalid("'handler' must be an array of identifiers".to_string()))?
            .into_iter()
            .map(|element| {
                element
                    .and_then(identifier)
                    .ok_or_else(|| invalid("'handler' must be an array of identifiers".to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(EntryDecorators { controller, handler })
    }

    fn runtime_hooks(&self, class: &str) -> Result<RuntimeHooks> {
        let invalid = |reason: String| AdapterError::InvalidRuntimeHooks {
            class: class.to_string(),
            reason,
        };
        let Expression::ObjectExpression(object) = self.require(class, "runtime")? else {
            return Err(invalid("expected an object literal".to_string()));
        };
        let entries: BTreeMap<String, &Expression> = object_entries(object).map_err(invalid)?.into_iter().collect();
        let hook = |name: &str| {
            entries
                .get(name)
                .and_then(|value| identifier(value))
                .ok_or_else(|| invalid(format!("'{name}' must be an identifier")))
        };
        Ok(RuntimeHooks {
            start: hook("start")?,
            stop: hook("stop")?,
        })
    }

    fn pipeline(&self, class: &str) -> Result<PipelineSpec> {
        let invalid = |reason: String| AdapterError::InvalidPipeline {
            class: class.to_string(),
            reason,
        };
        if self.opaque_methods.iter().any(|m| m == "pipeline") {
            return Err(invalid("static pipeline() must be a single return of an object literal".to_string()));
        }
        let Expression::ObjectExpression(object) = self.require(class, "pipeline")? else {
            return Err(invalid("expected an object literal".to_string()));
        };
        let entries: BTreeMap<String, &Expression> = object_entries(object).map_err(invalid)?.into_iter().collect();

        let list = |name: &str| -> Result<Vec<String>> {
            let elements = entries
                .get(name)
                .and_then(|value| array_elements(value))
                .ok_or_else(|| invalid(format!("'{name}' must be an array literal")))?;
            elements
                .into_iter()
                .map(|element| {
                    element
                        .map(|expr| self.reference(expr))
                        .ok_or_else(|| invalid(format!("'{name}' may not contain spreads or holes")))
                })
                .collect()
        };

        Ok(PipelineSpec {
            middlewares: list("middlewares")?,
            guards: list("guards")?,
            pipes: list("pipes")?,
            handler: entries
                .get("handler")
                .map(|expr| self.reference(expr))
                .ok_or_else(|| invalid("'handler' is required".to_string()))?,
        })
    }

    /// Dotted name of a reference, else its source text.
    fn reference(&self, expr: &Expression) -> String {
        dotted(expr).unwrap_or_else(|| {
            let span = expr.span();
            self.source
                .get(span.start as usize..span.end as usize)
                .unwrap_or_default()
                .to_string()
        })
    }
}

fn key_name(key: &PropertyKey, computed: bool) -> Option<String> {
    match key {
        PropertyKey::StringLiteral(s) => Some(s.value.to_string()),
        _ if computed => None,
        _ => key.static_name().map(|name| name.to_string()),
    }
}

fn single_return<'b, 'a>(method: &'b MethodDefinition<'a>) -> Option<&'b Expression<'a>> {
    let body = method.value.body.as_ref()?;
    if body.statements.len() != 1 {
        return None;
    }
    match &body.statements[0] {
        Statement::ReturnStatement(ret) => ret.argument.as_ref().map(strip_parens),
        _ => None,
    }
}

fn strip_parens<'b, 'a>(mut expr: &'b Expression<'a>) -> &'b Expression<'a> {
    loop {
        expr = match expr {
            Expression::ParenthesizedExpression(e) => &e.expression,
            Expression::TSAsExpression(e) => &e.expression,
            Expression::TSSatisfiesExpression(e) => &e.expression,
            _ => return expr,
        };
    }
}

fn string_literal(expr: &Expression) -> Option<String> {
    match strip_parens(expr) {
        Expression::StringLiteral(s) => Some(s.value.to_string()),
        Expression::TemplateLiteral(t) if t.expressions.is_empty() && t.quasis.len() == 1 => {
            t.quasis[0].value.cooked.as_ref().map(|c| c.to_string())
        }
        _ => None,
    }
}

fn identifier(expr: &Expression) -> Option<String> {
    match strip_parens(expr) {
        Expression::Identifier(id) => Some(id.name.to_string()),
        _ => None,
    }
}

fn dotted(expr: &Expression) -> Option<String> {
    match strip_parens(expr) {
        Expression::Identifier(id) => Some(id.name.to_string()),
        Expression::StaticMemberExpression(member) => {
            Some(format!("{}.{}", dotted(&member.object)?, member.property.name))
        }
        _ => None,
    }
}

/// Elements of an array literal; `None` entries are spreads or holes.
fn array_elements<'b, 'a>(expr: &'b Expression<'a>) -> Option<Vec<Option<&'b Expression<'a>>>> {
    match strip_parens(expr) {
        Expression::ArrayExpression(array) => Some(
            array
                .elements
                .iter()
                .map(|element| match element {
                    ArrayExpressionElement::SpreadElement(_) | ArrayExpressionElement::Elision(_) => None,
                    other => other.as_expression(),
                })
                .collect(),
        ),
        _ => None,
    }
}

/// Static `key: value` pairs of an object literal, in source order.
fn object_entries<'b, 'a>(
    object: &'b ObjectExpression<'a>,
) -> std::result::Result<Vec<(String, &'b Expression<'a>)>, String> {
    object
        .properties
        .iter()
        .map(|property| match property {
            ObjectPropertyKind::ObjectProperty(prop) => key_name(&prop.key, prop.computed)
                .map(|key| (key, &prop.value))
                .ok_or_else(|| "computed keys are not allowed".to_string()),
            ObjectPropertyKind::SpreadProperty(_) => Err("spread properties are not allowed".to_string()),
        })
        .collect()
}

fn join(items: Vec<&String>) -> String {
    items.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTTP_ADAPTER: &str = r#"
import { Controller, Get, Post } from './decorators';
import { cors, auth } from './middlewares';
export class HttpAdapter {
  static adapterId = 'http';
  static middlewarePhaseOrder = ['global', 'route', 'global'];
  static supportedMiddlewarePhases = { global: true, route: true };
  static entryDecorators = { controller: Controller, handler: [Get, Post] };
  static runtime = { start: startServer, stop: stopServer };
  static pipeline() {
    return { middlewares: [cors, auth], guards: [], pipes: [], handler: dispatch };
  }
}
"#;

    fn read(source: &str) -> Result<AdapterStaticSpec> {
        read_adapter_class(Path::new("/pkg/http/index.ts"), source, "HttpAdapter", "@graft/http")
    }

    #[test]
    fn test_reads_full_adapter() {
        let spec = read(HTTP_ADAPTER).unwrap();
        assert_eq!(spec.adapter_id, "http");
        assert_eq!(spec.middleware_phase_order, vec!["global", "route"]);
        assert!(spec.supports_phase("route"));
        assert_eq!(spec.entry_decorators.controller, "Controller");
        assert_eq!(spec.entry_decorators.handler, vec!["Get", "Post"]);
        assert_eq!(spec.runtime.start, "startServer");
        assert_eq!(spec.pipeline.middlewares, vec!["cors", "auth"]);
        assert_eq!(spec.pipeline.handler, "dispatch");
    }

    #[test]
    fn test_phase_keys_must_match_order() {
        let source = HTTP_ADAPTER.replace("{ global: true, route: true }", "{ global: true }");
        let err = read(&source).unwrap_err();
        assert!(matches!(err, AdapterError::InvalidSupportedPhases { .. }), "{err}");

        let source = HTTP_ADAPTER.replace("{ global: true, route: true }", "{ global: true, route: 1 }");
        assert!(matches!(read(&source).unwrap_err(), AdapterError::InvalidSupportedPhases { .. }));
    }

    #[test]
    fn test_pipeline_length_must_match_phases() {
        let source = HTTP_ADAPTER.replace("[cors, auth]", "[cors]");
        let err = read(&source).unwrap_err();
        assert!(matches!(
            err,
            AdapterError::PipelineLengthMismatch { middlewares: 1, phases: 2, .. }
        ));
    }

    #[test]
    fn test_missing_and_malformed_fields() {
        let source = HTTP_ADAPTER.replace("static adapterId = 'http';", "");
        assert!(matches!(
            read(&source).unwrap_err(),
            AdapterError::MissingStaticField { field, .. } if field == "adapterId"
        ));

        let source = HTTP_ADAPTER.replace("static adapterId = 'http';", "static adapterId = makeId();");
        assert!(matches!(read(&source).unwrap_err(), AdapterError::InvalidAdapterId { .. }));

        let source = HTTP_ADAPTER.replace("handler: [Get, Post]", "handler: Get");
        assert!(matches!(read(&source).unwrap_err(), AdapterError::InvalidEntryDecorators { .. }));

        let source = HTTP_ADAPTER.replace("stop: stopServer", "stop: 'stop'");
        assert!(matches!(read(&source).unwrap_err(), AdapterError::InvalidRuntimeHooks { .. }));
    }

    #[test]
    fn test_unknown_class() {
        let err = read_adapter_class(Path::new("/pkg/a.ts"), "export class Other {}", "HttpAdapter", "pkg")
            .unwrap_err();
        assert!(matches!(err, AdapterError::UnresolvedAdapterClass { .. }));
    }
}
