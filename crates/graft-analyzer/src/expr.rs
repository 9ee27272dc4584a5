//! Lowering expressions into [`AnalyzerValue`] trees.

use oxc_ast::ast::{
    Argument, ArrayExpressionElement, ArrowFunctionExpression, BindingIdentifier,
    CallExpression, Expression, FormalParameters, Function, IdentifierReference,
    ObjectExpression, ObjectProperty, ObjectPropertyKind, PropertyKey, TSType, UnaryOperator,
};
use oxc_ast_visit::{Visit, walk};
use oxc_span::{GetSpan, Span};
use rustc_hash::FxHashSet;

use crate::context::{AnalyzerContext, CoreFactory};
use crate::inject::{classify_inject, thunk_target};
use crate::syntax::{collect_binding_names, dotted_name, slice, static_key_name, unwrap_expression};
use crate::value::{
    AnalyzerValue, CallValue, CapturedDependency, CapturedInject, FactoryCapture, NewValue,
    RecordEntry, RecordKey,
};

pub(crate) struct ValueSerializer<'c, 's> {
    ctx: &'c AnalyzerContext<'s>,
}

impl<'c, 's> ValueSerializer<'c, 's> {
    pub fn new(ctx: &'c AnalyzerContext<'s>) -> Self {
        Self { ctx }
    }

    pub fn value(&self, expr: &Expression) -> AnalyzerValue {
        let expr = unwrap_expression(expr);
        match expr {
            Expression::NullLiteral(_) => AnalyzerValue::Null,
            Expression::BooleanLiteral(b) => AnalyzerValue::Bool(b.value),
            Expression::NumericLiteral(n) => AnalyzerValue::Num(n.value),
            Expression::StringLiteral(s) => AnalyzerValue::Str(s.value.to_string()),
            Expression::TemplateLiteral(tpl) if tpl.expressions.is_empty() => {
                let text = tpl
                    .quasis
                    .iter()
                    .filter_map(|q| q.value.cooked.as_ref())
                    .map(|c| c.to_string())
                    .collect::<String>();
                AnalyzerValue::Str(text)
            }
            Expression::UnaryExpression(unary) => match unary.operator {
                UnaryOperator::UnaryNegation => match self.value(&unary.argument) {
                    AnalyzerValue::Num(n) => AnalyzerValue::Num(-n),
                    _ => self.opaque(expr.span()),
                },
                UnaryOperator::Void => AnalyzerValue::Undefined,
                _ => self.opaque(expr.span()),
            },
            Expression::Identifier(id) if id.name == "undefined" => AnalyzerValue::Undefined,
            Expression::Identifier(_) | Expression::StaticMemberExpression(_) => {
                match dotted_name(expr) {
                    Some(name) => AnalyzerValue::SymbolicRef(self.ctx.symbol(&name)),
                    None => self.opaque(expr.span()),
                }
            }
            Expression::ArrayExpression(array) => AnalyzerValue::Array(
                array
                    .elements
                    .iter()
                    .map(|element| match element {
                        ArrayExpressionElement::SpreadElement(spread) => {
                            AnalyzerValue::Spread(Box::new(self.value(&spread.argument)))
                        }
                        ArrayExpressionElement::Elision(_) => AnalyzerValue::Undefined,
                        other => match other.as_expression() {
                            Some(e) => self.value(e),
                            None => AnalyzerValue::Undefined,
                        },
                    })
                    .collect(),
            ),
            Expression::ObjectExpression(object) => self.record(object),
            Expression::ArrowFunctionExpression(arrow) => {
                AnalyzerValue::FactoryCapture(self.capture_arrow(arrow))
            }
            Expression::FunctionExpression(func) => {
                AnalyzerValue::FactoryCapture(self.capture_function(func))
            }
            Expression::CallExpression(call) => self.call(call),
            Expression::NewExpression(new) => match dotted_name(&new.callee) {
                Some(class_name) => AnalyzerValue::NewExpr(NewValue {
                    import_source: self.ctx.import_source(&class_name),
                    class_name,
                    args: self.arguments(&new.arguments),
                }),
                None => self.opaque(expr.span()),
            },
            _ => self.opaque(expr.span()),
        }
    }

    pub fn arguments(&self, args: &[Argument]) -> Vec<AnalyzerValue> {
        args.iter()
            .map(|arg| match arg {
                Argument::SpreadElement(spread) => {
                    AnalyzerValue::Spread(Box::new(self.value(&spread.argument)))
                }
                other => match other.as_expression() {
                    Some(e) => self.value(e),
                    None => AnalyzerValue::Undefined,
                },
            })
            .collect()
    }

    fn record(&self, object: &ObjectExpression) -> AnalyzerValue {
        let entries = object
            .properties
            .iter()
            .map(|property| match property {
                ObjectPropertyKind::ObjectProperty(prop) => RecordEntry::Property {
                    key: self.record_key(&prop.key, prop.computed),
                    value: self.value(&prop.value),
                },
                ObjectPropertyKind::SpreadProperty(spread) => RecordEntry::Spread {
                    value: self.value(&spread.argument),
                },
            })
            .collect();
        AnalyzerValue::Record(entries)
    }

    fn record_key(&self, key: &PropertyKey, computed: bool) -> RecordKey {
        if computed {
            return RecordKey::Computed(slice(self.ctx.source, key.span()).to_string());
        }
        match static_key_name(key, false) {
            Some(name) => RecordKey::Static(name),
            None => RecordKey::Computed(slice(self.ctx.source, key.span()).to_string()),
        }
    }

    fn call(&self, call: &CallExpression) -> AnalyzerValue {
        let Some(callee) = self.ctx.callee_name(&call.callee) else {
            return self.opaque(call.span);
        };

        if callee == "forwardRef" && call.arguments.len() == 1 {
            let target = call.arguments[0]
                .as_expression()
                .map(unwrap_expression)
                .and_then(thunk_target);
            if let Some(name) = target {
                return AnalyzerValue::ForwardRef(name);
            }
        }

        let import_source = dotted_name(&call.callee).and_then(|name| self.ctx.import_source(&name));
        AnalyzerValue::CallExpr(CallValue {
            callee,
            import_source,
            args: self.arguments(&call.arguments),
        })
    }

    fn opaque(&self, span: Span) -> AnalyzerValue {
        AnalyzerValue::Opaque(slice(self.ctx.source, span).to_string())
    }

    pub fn capture_arrow(&self, arrow: &ArrowFunctionExpression) -> FactoryCapture {
        let mut collector = FreeVariableCollector::new(self.ctx);
        collector.visit_formal_parameters(&arrow.params);
        collector.visit_function_body(&arrow.body);
        self.finish_capture(arrow.span, &arrow.params, collector)
    }

    pub fn capture_function(&self, func: &Function) -> FactoryCapture {
        let mut collector = FreeVariableCollector::new(self.ctx);
        if let Some(id) = &func.id {
            collector.bound.insert(id.name.to_string());
        }
        collector.visit_formal_parameters(&func.params);
        if let Some(body) = &func.body {
            collector.visit_function_body(body);
        }
        self.finish_capture(func.span, &func.params, collector)
    }

    fn finish_capture(
        &self,
        span: Span,
        params: &FormalParameters,
        collector: FreeVariableCollector,
    ) -> FactoryCapture {
        let base = span.start;
        let mut param_names = Vec::new();
        for param in &params.items {
            collect_binding_names(&param.pattern, &mut param_names);
        }

        let deps = collector
            .references
            .iter()
            .filter(|r| !collector.bound.contains(&r.name) && self.ctx.is_module_scoped(&r.name))
            .map(|r| {
                let symbol = self.ctx.symbol(&r.name);
                CapturedDependency {
                    name: r.name.clone(),
                    imported: symbol.imported,
                    import_source: symbol.import_source,
                    start: r.span.start - base,
                    end: r.span.end - base,
                    shorthand: r.shorthand,
                }
            })
            .collect();

        let inject_sites = collector
            .injects
            .into_iter()
            .map(|(site, span)| CapturedInject {
                site,
                start: span.start - base,
                end: span.end - base,
            })
            .collect();

        FactoryCapture {
            code: slice(self.ctx.source, span).to_string(),
            params: param_names,
            deps,
            inject_sites,
        }
    }
}

struct Reference {
    name: String,
    span: Span,
    shorthand: bool,
}

/// Gathers identifier references, inner bindings and `inject()` calls of a
/// function. Type positions are skipped entirely.
struct FreeVariableCollector<'c, 's> {
    ctx: &'c AnalyzerContext<'s>,
    references: Vec<Reference>,
    bound: FxHashSet<String>,
    injects: Vec<(crate::types::InjectSite, Span)>,
}

impl<'c, 's> FreeVariableCollector<'c, 's> {
    fn new(ctx: &'c AnalyzerContext<'s>) -> Self {
        Self {
            ctx,
            references: Vec::new(),
            bound: FxHashSet::default(),
            injects: Vec::new(),
        }
    }
}

impl<'a> Visit<'a> for FreeVariableCollector<'_, '_> {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        self.references.push(Reference {
            name: ident.name.to_string(),
            span: ident.span,
            shorthand: false,
        });
    }

    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'a>) {
        self.bound.insert(ident.name.to_string());
    }

    fn visit_object_property(&mut self, prop: &ObjectProperty<'a>) {
        if prop.shorthand {
            if let Expression::Identifier(id) = &prop.value {
                self.references.push(Reference {
                    name: id.name.to_string(),
                    span: prop.span,
                    shorthand: true,
                });
                return;
            }
        }
        walk::walk_object_property(self, prop);
    }

    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if self.ctx.is_core_call(CoreFactory::Inject, call) {
            self.injects.push((classify_inject(call, self.ctx, None), call.span));
            return;
        }
        walk::walk_call_expression(self, call);
    }

    fn visit_ts_type(&mut self, _ty: &TSType<'a>) {}
}
