//! Class metadata extraction.

use oxc_ast::ast::{
    Argument, CallExpression, Class, ClassElement, Decorator, Expression, FormalParameter,
    MethodDefinition, MethodDefinitionKind, PropertyDefinition, TSLiteral, TSType,
    TSTypeAnnotation, TSTypeParameterInstantiation,
};
use oxc_ast_visit::{Visit, walk};
use oxc_span::GetSpan;

use crate::context::AnalyzerContext;
use crate::error::{AnalyzeResult, AnalyzerDiagnostic, DiagnosticReason};
use crate::expr::ValueSerializer;
use crate::syntax::{
    dotted_name, parameter_is_optional, parameter_is_property, parameter_name,
    parameter_type_annotation, slice, static_key_name, ts_type_name, unwrap_expression,
};
use crate::types::{
    ClassMetadata, ConfigureMetadata, DecoratorMetadata, Heritage, HeritageClause,
    MethodMetadata, MiddlewareRef, MiddlewareRegistration, ParameterMetadata, PropertyMetadata,
    SourceSpan, TypeArgument, TypeRef,
};

pub(crate) struct ClassExtractor<'c, 's> {
    ctx: &'c AnalyzerContext<'s>,
    values: ValueSerializer<'c, 's>,
}

impl<'c, 's> ClassExtractor<'c, 's> {
    pub fn new(ctx: &'c AnalyzerContext<'s>) -> Self {
        Self {
            ctx,
            values: ValueSerializer::new(ctx),
        }
    }

    /// Extract one class. `fallback_name` names anonymous default exports.
    pub fn extract(
        &self,
        class: &Class,
        fallback_name: Option<&str>,
    ) -> AnalyzeResult<Option<ClassMetadata>> {
        let name = match (&class.id, fallback_name) {
            (Some(id), _) => id.name.to_string(),
            (None, Some(name)) => name.to_string(),
            (None, None) => return Ok(None),
        };

        let mut constructor = None;
        let mut methods = Vec::new();
        let mut properties = Vec::new();
        let mut configure = ConfigureMetadata::default();

        for element in &class.body.body {
            match element {
                ClassElement::MethodDefinition(method) => match method.kind {
                    MethodDefinitionKind::Constructor => {
                        constructor = Some(self.parameters(&method.value.params.items));
                    }
                    MethodDefinitionKind::Method => {
                        if !method.r#static && self.method_name(method).as_deref() == Some("configure") {
                            configure = self.configure(&name, method)?;
                        }
                        if let Some(meta) = self.method(method) {
                            methods.push(meta);
                        }
                    }
                    _ => {}
                },
                ClassElement::PropertyDefinition(prop) => properties.push(self.property(prop)),
                _ => {}
            }
        }

        Ok(Some(ClassMetadata {
            name,
            span: SourceSpan::from(class.span),
            is_abstract: class.r#abstract,
            heritage: self.heritage(class),
            decorators: self.decorators(&class.decorators),
            constructor,
            methods,
            properties,
            configure,
        }))
    }

    pub fn decorators(&self, decorators: &[Decorator]) -> Vec<DecoratorMetadata> {
        decorators.iter().filter_map(|d| self.decorator(d)).collect()
    }

    fn decorator(&self, decorator: &Decorator) -> Option<DecoratorMetadata> {
        match unwrap_expression(&decorator.expression) {
            Expression::CallExpression(call) => {
                let local = dotted_name(&call.callee)?;
                Some(DecoratorMetadata {
                    name: self.ctx.canonical_name(&local),
                    import_source: self.ctx.import_source(&local),
                    is_call: true,
                    args: self.values.arguments(&call.arguments),
                })
            }
            expr => {
                let local = dotted_name(expr)?;
                Some(DecoratorMetadata {
                    name: self.ctx.canonical_name(&local),
                    import_source: self.ctx.import_source(&local),
                    is_call: false,
                    args: Vec::new(),
                })
            }
        }
    }

    fn parameters(&self, params: &[FormalParameter]) -> Vec<ParameterMetadata> {
        params
            .iter()
            .enumerate()
            .map(|(index, param)| ParameterMetadata {
                index,
                name: parameter_name(param),
                type_ref: parameter_type_annotation(param).map(|t| self.type_ref(t)),
                decorators: self.decorators(&param.decorators),
                optional: parameter_is_optional(param),
                is_property: parameter_is_property(param),
            })
            .collect()
    }

    fn method_name(&self, method: &MethodDefinition) -> Option<String> {
        static_key_name(&method.key, method.computed)
    }

    fn method(&self, method: &MethodDefinition) -> Option<MethodMetadata> {
        let decorators = self.decorators(&method.decorators);
        let params = self.parameters(&method.value.params.items);
        let has_param_decorators = params.iter().any(|p| !p.decorators.is_empty());
        if decorators.is_empty() && !has_param_decorators {
            return None;
        }

        let (name, computed) = match self.method_name(method) {
            Some(name) => (name, false),
            None => (format!("__computed_{}", method.span.start), true),
        };

        Some(MethodMetadata {
            name,
            computed,
            is_static: method.r#static,
            decorators,
            params,
        })
    }

    fn property(&self, prop: &PropertyDefinition) -> PropertyMetadata {
        let name = static_key_name(&prop.key, prop.computed)
            .unwrap_or_else(|| format!("__computed_{}", prop.span.start));
        PropertyMetadata {
            name,
            is_static: prop.r#static,
            optional: prop.optional,
            type_ref: prop.type_annotation.as_deref().map(|t| self.type_ref(t)),
            decorators: self.decorators(&prop.decorators),
        }
    }

    fn heritage(&self, class: &Class) -> Heritage {
        let extends = class.super_class.as_ref().and_then(|expr| {
            let name = dotted_name(expr)?;
            Some(HeritageClause {
                import_source: self.ctx.import_source(&name),
                type_arguments: self.type_arguments(class.super_type_arguments.as_deref()),
                name,
            })
        });

        let implements = class
            .implements
            .iter()
            .map(|clause| {
                let name = ts_type_name(&clause.expression);
                HeritageClause {
                    import_source: self.ctx.import_source(&name),
                    type_arguments: self.type_arguments(clause.type_arguments.as_deref()),
                    name,
                }
            })
            .collect();

        Heritage {
            extends,
            implements,
        }
    }

    fn type_arguments(&self, args: Option<&TSTypeParameterInstantiation>) -> Vec<TypeArgument> {
        args.map(|args| args.params.iter().map(|t| self.type_argument(t)).collect())
            .unwrap_or_default()
    }

    fn type_argument(&self, ty: &TSType) -> TypeArgument {
        match ty {
            TSType::TSTypeReference(reference) => {
                let name = ts_type_name(&reference.type_name);
                TypeArgument::Reference {
                    import_source: self.ctx.import_source(&name),
                    type_arguments: self.type_arguments(reference.type_arguments.as_deref()),
                    name,
                }
            }
            TSType::TSLiteralType(literal) => match &literal.literal {
                TSLiteral::StringLiteral(s) => TypeArgument::Literal {
                    value: s.value.to_string(),
                },
                _ => TypeArgument::Other {
                    text: slice(self.ctx.source, ty.span()).to_string(),
                },
            },
            TSType::TSUnionType(union) => TypeArgument::Union {
                members: union.types.iter().map(|t| self.type_argument(t)).collect(),
            },
            _ => TypeArgument::Other {
                text: slice(self.ctx.source, ty.span()).to_string(),
            },
        }
    }

    fn type_ref(&self, annotation: &TSTypeAnnotation) -> TypeRef {
        let ty = &annotation.type_annotation;
        let name = match ty {
            TSType::TSTypeReference(reference) => Some(ts_type_name(&reference.type_name)),
            _ => None,
        };
        TypeRef {
            import_source: name.as_deref().and_then(|n| self.ctx.import_source(n)),
            name,
            text: slice(self.ctx.source, ty.span()).to_string(),
        }
    }

    fn configure(&self, class_name: &str, method: &MethodDefinition) -> AnalyzeResult<ConfigureMetadata> {
        let Some(body) = &method.value.body else {
            return Ok(ConfigureMetadata::default());
        };

        let mut walker = ConfigureWalker {
            extractor: self,
            class_name,
            metadata: ConfigureMetadata::default(),
            error: None,
        };
        walker.visit_function_body(body);

        match walker.error {
            Some(err) => Err(err),
            None => Ok(walker.metadata),
        }
    }
}

/// Deep walk of a `configure()` body for `addMiddlewares` / `addErrorFilters`.
struct ConfigureWalker<'e, 'c, 's> {
    extractor: &'e ClassExtractor<'c, 's>,
    class_name: &'e str,
    metadata: ConfigureMetadata,
    error: Option<AnalyzerDiagnostic>,
}

impl ConfigureWalker<'_, '_, '_> {
    fn fail(&mut self, reason: DiagnosticReason, message: String) {
        if self.error.is_none() {
            self.error = Some(AnalyzerDiagnostic::new(
                self.extractor.ctx.path,
                reason,
                message,
            ));
        }
    }

    /// Literal array of `Ident` or `Ident.withOptions(...)`.
    fn refs(&self, arg: &Argument) -> Option<Vec<MiddlewareRef>> {
        let Some(Expression::ArrayExpression(array)) = arg.as_expression().map(unwrap_expression)
        else {
            return None;
        };

        let mut refs = Vec::new();
        for element in &array.elements {
            let expr = element.as_expression().map(unwrap_expression)?;
            refs.push(self.reference(expr)?);
        }
        Some(refs)
    }

    fn reference(&self, expr: &Expression) -> Option<MiddlewareRef> {
        let ctx = self.extractor.ctx;
        match expr {
            Expression::Identifier(id) => Some(MiddlewareRef {
                name: id.name.to_string(),
                import_source: ctx.import_source(&id.name),
                options: None,
            }),
            Expression::CallExpression(call) => {
                let Expression::StaticMemberExpression(member) = unwrap_expression(&call.callee)
                else {
                    return None;
                };
                let Expression::Identifier(id) = unwrap_expression(&member.object) else {
                    return None;
                };
                if member.property.name != "withOptions" || call.arguments.len() > 1 {
                    return None;
                }
                let options = self.extractor.values.arguments(&call.arguments).into_iter().next();
                Some(MiddlewareRef {
                    name: id.name.to_string(),
                    import_source: ctx.import_source(&id.name),
                    options,
                })
            }
            _ => None,
        }
    }

    fn add_middlewares(&mut self, call: &CallExpression) {
        let class_name = self.class_name;
        if call.arguments.len() != 2 {
            self.fail(
                DiagnosticReason::InvalidMiddlewareShape,
                format!("{class_name}.configure(): addMiddlewares expects (lifecycle, [middlewares])"),
            );
            return;
        }

        let lifecycle = match call.arguments[0].as_expression().map(unwrap_expression) {
            Some(Expression::StringLiteral(s)) => s.value.to_string(),
            _ => {
                self.fail(
                    DiagnosticReason::InvalidLifecycle,
                    format!("{class_name}.configure(): addMiddlewares lifecycle must be a string literal"),
                );
                return;
            }
        };

        match self.refs(&call.arguments[1]) {
            Some(refs) => self
                .metadata
                .middlewares
                .push(MiddlewareRegistration { lifecycle, refs }),
            None => self.fail(
                DiagnosticReason::InvalidMiddlewareShape,
                format!(
                    "{class_name}.configure(): addMiddlewares('{lifecycle}', ...) accepts only an array literal of identifiers or identifier.withOptions(...)"
                ),
            ),
        }
    }

    fn add_error_filters(&mut self, call: &CallExpression) {
        let class_name = self.class_name;
        let refs = if call.arguments.len() == 1 {
            self.refs(&call.arguments[0])
        } else {
            None
        };

        match refs {
            Some(refs) => self.metadata.error_filters.extend(refs),
            None => self.fail(
                DiagnosticReason::InvalidErrorFilterShape,
                format!(
                    "{class_name}.configure(): addErrorFilters accepts only an array literal of identifiers or identifier.withOptions(...)"
                ),
            ),
        }
    }
}

impl<'a> Visit<'a> for ConfigureWalker<'_, '_, '_> {
    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let Expression::StaticMemberExpression(member) = unwrap_expression(&call.callee) {
            match member.property.name.as_str() {
                "addMiddlewares" => {
                    self.add_middlewares(call);
                    return;
                }
                "addErrorFilters" => {
                    self.add_error_filters(call);
                    return;
                }
                _ => {}
            }
        }
        walk::walk_call_expression(self, call);
    }
}
