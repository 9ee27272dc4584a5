//! `inject()` call classification and file-wide collection.

use oxc_ast::ast::{Argument, CallExpression, Class, Expression};
use oxc_ast_visit::{Visit, walk};

use crate::context::{AnalyzerContext, CoreFactory};
use crate::syntax::{single_returned_expression, unwrap_expression};
use crate::types::{InjectKind, InjectSite, SourceSpan};

/// Classify one `inject(...)` call.
///
/// Only `inject(Token)` and single-statement thunks returning an
/// identifier (`inject(() => Token)`, `inject(function () { return Token })`)
/// carry a static token.
pub(crate) fn classify_inject(
    call: &CallExpression,
    ctx: &AnalyzerContext,
    enclosing_class: Option<&str>,
) -> InjectSite {
    let (kind, token) = if call.arguments.len() == 1 {
        match &call.arguments[0] {
            Argument::SpreadElement(_) => (InjectKind::Invalid, None),
            arg => match arg.as_expression().map(unwrap_expression) {
                Some(Expression::Identifier(id)) => {
                    (InjectKind::Token, Some(id.name.to_string()))
                }
                Some(expr) => match thunk_target(expr) {
                    Some(name) => (InjectKind::Thunk, Some(name)),
                    None => (InjectKind::Invalid, None),
                },
                None => (InjectKind::Invalid, None),
            },
        }
    } else {
        (InjectKind::Invalid, None)
    };

    InjectSite {
        kind,
        import_source: token.as_deref().and_then(|t| ctx.import_source(t)),
        token,
        span: SourceSpan::from(call.span),
        enclosing_class: enclosing_class.map(String::from),
    }
}

/// Identifier returned by a zero-argument single-statement function.
pub(crate) fn thunk_target(expr: &Expression) -> Option<String> {
    let returned = match expr {
        Expression::ArrowFunctionExpression(arrow) => {
            single_returned_expression(&arrow.body.statements, arrow.expression)
        }
        Expression::FunctionExpression(func) => func
            .body
            .as_ref()
            .and_then(|body| single_returned_expression(&body.statements, false)),
        _ => None,
    }?;

    match unwrap_expression(returned) {
        Expression::Identifier(id) => Some(id.name.to_string()),
        _ => None,
    }
}

/// Collects every `inject()` call in a program, remembering the class it
/// sits in.
pub(crate) struct InjectCollector<'c, 's> {
    ctx: &'c AnalyzerContext<'s>,
    classes: Vec<String>,
    pub sites: Vec<InjectSite>,
}

impl<'c, 's> InjectCollector<'c, 's> {
    pub fn new(ctx: &'c AnalyzerContext<'s>) -> Self {
        Self {
            ctx,
            classes: Vec::new(),
            sites: Vec::new(),
        }
    }
}

impl<'a> Visit<'a> for InjectCollector<'_, '_> {
    fn visit_class(&mut self, class: &Class<'a>) {
        let name = class
            .id
            .as_ref()
            .map(|id| id.name.to_string())
            .unwrap_or_else(|| "default".to_string());
        self.classes.push(name);
        walk::walk_class(self, class);
        self.classes.pop();
    }

    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if self.ctx.is_core_call(CoreFactory::Inject, call) {
            let site = classify_inject(call, self.ctx, self.classes.last().map(String::as_str));
            self.sites.push(site);
        }
        walk::walk_call_expression(self, call);
    }
}
