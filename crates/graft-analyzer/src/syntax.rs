//! Small accessors over the oxc AST shared by the extraction passes.

use oxc_ast::ast::{
    BindingPattern, Expression, FormalParameter, ModuleExportName, PropertyKey, Statement,
    TSTypeAnnotation, TSTypeName,
};

/// Source text covered by `span`.
pub fn slice(source: &str, span: oxc_span::Span) -> &str {
    source
        .get(span.start as usize..span.end as usize)
        .unwrap_or_default()
}

/// Strip parentheses and type-only wrappers (`as`, `satisfies`, `!`, `<T>x`).
pub fn unwrap_expression<'b, 'a>(mut expr: &'b Expression<'a>) -> &'b Expression<'a> {
    loop {
        expr = match expr {
            Expression::ParenthesizedExpression(e) => &e.expression,
            Expression::TSAsExpression(e) => &e.expression,
            Expression::TSSatisfiesExpression(e) => &e.expression,
            Expression::TSNonNullExpression(e) => &e.expression,
            Expression::TSTypeAssertion(e) => &e.expression,
            _ => return expr,
        };
    }
}

/// Dotted name for identifiers and static member chains (`a.b.c`).
pub fn dotted_name(expr: &Expression) -> Option<String> {
    match unwrap_expression(expr) {
        Expression::Identifier(id) => Some(id.name.to_string()),
        Expression::StaticMemberExpression(member) => {
            let object = dotted_name(&member.object)?;
            Some(format!("{}.{}", object, member.property.name))
        }
        _ => None,
    }
}

/// Leftmost identifier of a dotted name.
pub fn root_name(dotted: &str) -> &str {
    dotted.split('.').next().unwrap_or(dotted)
}

pub fn module_export_name(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::IdentifierName(id) => id.name.to_string(),
        ModuleExportName::IdentifierReference(id) => id.name.to_string(),
        ModuleExportName::StringLiteral(s) => s.value.to_string(),
    }
}

/// Static name of a non-computed property key.
pub fn static_key_name(key: &PropertyKey, computed: bool) -> Option<String> {
    if computed {
        return match key {
            PropertyKey::StringLiteral(s) => Some(s.value.to_string()),
            _ => None,
        };
    }
    key.static_name().map(|name| name.to_string())
}

/// Identifier bound by a simple `const x = ...` pattern.
pub fn binding_name<'b>(pattern: &'b BindingPattern) -> Option<&'b str> {
    match pattern {
        BindingPattern::BindingIdentifier(id) => Some(id.name.as_str()),
        _ => None,
    }
}

/// Every identifier a pattern binds.
pub fn collect_binding_names(pattern: &BindingPattern, out: &mut Vec<String>) {
    match pattern {
        BindingPattern::BindingIdentifier(id) => out.push(id.name.to_string()),
        BindingPattern::ObjectPattern(obj) => {
            for prop in &obj.properties {
                collect_binding_names(&prop.value, out);
            }
            if let Some(rest) = &obj.rest {
                collect_binding_names(&rest.argument, out);
            }
        }
        BindingPattern::ArrayPattern(arr) => {
            for pattern in arr.elements.iter().flatten() {
                collect_binding_names(pattern, out);
            }
            if let Some(rest) = &arr.rest {
                collect_binding_names(&rest.argument, out);
            }
        }
        BindingPattern::AssignmentPattern(assign) => collect_binding_names(&assign.left, out),
    }
}

pub fn parameter_type_annotation<'b, 'a>(
    param: &'b FormalParameter<'a>,
) -> Option<&'b TSTypeAnnotation<'a>> {
    param.type_annotation.as_deref()
}

pub fn parameter_is_optional(param: &FormalParameter) -> bool {
    param.optional || matches!(param.pattern, BindingPattern::AssignmentPattern(_))
}

/// Parameter properties carry an accessibility modifier or `readonly`.
pub fn parameter_is_property(param: &FormalParameter) -> bool {
    param.accessibility.is_some() || param.readonly || param.r#override
}

pub fn parameter_name(param: &FormalParameter) -> Option<String> {
    match &param.pattern {
        BindingPattern::BindingIdentifier(id) => Some(id.name.to_string()),
        BindingPattern::AssignmentPattern(assign) => binding_name(&assign.left).map(String::from),
        _ => None,
    }
}

pub fn ts_type_name(name: &TSTypeName) -> String {
    match name {
        TSTypeName::IdentifierReference(id) => id.name.to_string(),
        TSTypeName::QualifiedName(q) => format!("{}.{}", ts_type_name(&q.left), q.right.name),
        _ => "this".to_string(),
    }
}

/// The single returned identifier of an arrow or function body, if that is
/// all the body does.
pub fn single_returned_expression<'b, 'a>(
    statements: &'b [Statement<'a>],
    is_expression_body: bool,
) -> Option<&'b Expression<'a>> {
    if statements.len() != 1 {
        return None;
    }
    match &statements[0] {
        Statement::ExpressionStatement(stmt) if is_expression_body => Some(&stmt.expression),
        Statement::ReturnStatement(ret) => ret.argument.as_ref(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_name() {
        assert_eq!(root_name("g.inject"), "g");
        assert_eq!(root_name("inject"), "inject");
    }

    #[test]
    fn test_slice_out_of_range_is_empty() {
        assert_eq!(slice("abc", oxc_span::Span::new(1, 3)), "bc");
        assert_eq!(slice("abc", oxc_span::Span::new(2, 10)), "");
    }
}
