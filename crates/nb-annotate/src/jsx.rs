//! Function-component annotation.
//!
//! Parses the source with OXC (markup expressions enabled), locates the
//! default-exported component function, injects the path attribute into the
//! opening tag of the first returned element, and re-emits code plus a
//! source map tied to the original file.
//!
//! Export shapes handled, first match wins:
//!
//! 1. `export default function Home() { … }`
//! 2. `export default () => <div/>` (expression- or block-bodied)
//! 3. `const Home = () => …; export default Home`
//! 4. `const Home = () => …; export default memo(Home)`: the first
//!    identifier inside the exported expression that resolves to a
//!    function-valued declaration is annotated.
//!
//! Within a function body only the first `return` statement found in
//! traversal order is considered; later returns (for example the final
//! return after an early conditional return) are intentionally left alone.
//! Fragments cannot carry attributes, so a fragment-returning component
//! passes through unchanged.

use crate::COMPONENT_PATH_ATTR;
use nb_core::TransformOutput;
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_ast::AstBuilder;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_parser::Parser;
use oxc_span::{Atom, SourceType, SPAN};
use std::path::Path;

/// Annotate a `.jsx`/`.tsx` component file.
///
/// Returns `None` when no modification was made: unsupported shape, fragment
/// root, attribute already present, or a parse failure (logged, never
/// propagated).
pub(crate) fn annotate_function_component(
    source: &str,
    file: &Path,
    value: &str,
) -> Option<TransformOutput> {
    let allocator = Allocator::default();
    let source_type = match SourceType::from_path(file) {
        Ok(st) => st,
        Err(_) => return None,
    };

    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        tracing::warn!(
            "Skipping component annotation for {}: {:?}",
            file.display(),
            ret.errors[0]
        );
        return None;
    }

    let mut program = ret.program;
    let strategy = pick_strategy(&program)?;

    let ast = AstBuilder::new(&allocator);
    let injected = apply_strategy(&ast, &mut program, &strategy, value);
    if !injected {
        return None;
    }

    let generated = Codegen::new()
        .with_options(CodegenOptions {
            source_map_path: Some(file.to_path_buf()),
            ..CodegenOptions::default()
        })
        .build(&program);

    let map = generated.map.map(|m| m.to_json_string());
    Some(TransformOutput {
        code: generated.code,
        map,
    })
}

/// How the default export reaches its component function.
enum Strategy {
    /// `export default function …`
    DeclarationBody,
    /// `export default () => …` / `export default function() {…}` inline
    InlineExpression,
    /// The component is a previously declared name
    Named(String),
}

fn pick_strategy(program: &Program) -> Option<Strategy> {
    for stmt in &program.body {
        let Statement::ExportDefaultDeclaration(export) = stmt else {
            continue;
        };
        return match &export.declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(_) => Some(Strategy::DeclarationBody),
            ExportDefaultDeclarationKind::ArrowFunctionExpression(_)
            | ExportDefaultDeclarationKind::FunctionExpression(_) => {
                Some(Strategy::InlineExpression)
            }
            ExportDefaultDeclarationKind::Identifier(ident) => {
                declares_function(program, &ident.name)
                    .then(|| Strategy::Named(ident.name.to_string()))
            }
            ExportDefaultDeclarationKind::CallExpression(call) => {
                first_function_reference(program, call).map(Strategy::Named)
            }
            _ => None,
        };
    }
    None
}

/// Scan a wrapped export (`export default memo(Home)`) left to right for the
/// first identifier that resolves to a function-valued declaration.
fn first_function_reference(program: &Program, call: &CallExpression) -> Option<String> {
    if let Expression::Identifier(ident) = &call.callee {
        if declares_function(program, &ident.name) {
            return Some(ident.name.to_string());
        }
    }
    for arg in &call.arguments {
        match arg {
            Argument::Identifier(ident) if declares_function(program, &ident.name) => {
                return Some(ident.name.to_string());
            }
            Argument::CallExpression(inner) => {
                if let Some(name) = first_function_reference(program, inner) {
                    return Some(name);
                }
            }
            _ => {}
        }
    }
    None
}

/// Does the top level declare `name` as a function value?
fn declares_function(program: &Program, name: &str) -> bool {
    program.body.iter().any(|stmt| match stmt {
        Statement::VariableDeclaration(decl) => declarator_is_function(decl, name),
        Statement::FunctionDeclaration(func) => {
            func.id.as_ref().is_some_and(|id| id.name == name)
        }
        Statement::ExportNamedDeclaration(export) => match &export.declaration {
            Some(Declaration::VariableDeclaration(decl)) => declarator_is_function(decl, name),
            Some(Declaration::FunctionDeclaration(func)) => {
                func.id.as_ref().is_some_and(|id| id.name == name)
            }
            _ => false,
        },
        _ => false,
    })
}

fn declarator_is_function(decl: &VariableDeclaration, name: &str) -> bool {
    decl.declarations.iter().any(|d| {
        matches!(&d.id.kind, BindingPatternKind::BindingIdentifier(id) if id.name == name)
            && matches!(
                &d.init,
                Some(Expression::ArrowFunctionExpression(_))
                    | Some(Expression::FunctionExpression(_))
            )
    })
}

fn apply_strategy<'a>(
    ast: &AstBuilder<'a>,
    program: &mut Program<'a>,
    strategy: &Strategy,
    value: &str,
) -> bool {
    match strategy {
        Strategy::DeclarationBody | Strategy::InlineExpression => {
            for stmt in program.body.iter_mut() {
                let Statement::ExportDefaultDeclaration(export) = stmt else {
                    continue;
                };
                return match &mut export.declaration {
                    ExportDefaultDeclarationKind::FunctionDeclaration(func) => func
                        .body
                        .as_mut()
                        .map(|body| annotate_body(ast, body, value))
                        .unwrap_or(false),
                    ExportDefaultDeclarationKind::ArrowFunctionExpression(arrow) => {
                        annotate_arrow(ast, arrow, value)
                    }
                    ExportDefaultDeclarationKind::FunctionExpression(func) => func
                        .body
                        .as_mut()
                        .map(|body| annotate_body(ast, body, value))
                        .unwrap_or(false),
                    _ => false,
                };
            }
            false
        }
        Strategy::Named(name) => annotate_named(ast, program, name, value),
    }
}

/// Annotate a previously declared function value.
fn annotate_named<'a>(
    ast: &AstBuilder<'a>,
    program: &mut Program<'a>,
    name: &str,
    value: &str,
) -> bool {
    for stmt in program.body.iter_mut() {
        let found = match stmt {
            Statement::VariableDeclaration(decl) => {
                annotate_declarator(ast, decl, name, value)
            }
            Statement::FunctionDeclaration(func)
                if func.id.as_ref().is_some_and(|id| id.name == name) =>
            {
                func.body
                    .as_mut()
                    .map(|body| annotate_body(ast, body, value))
                    .unwrap_or(false)
            }
            Statement::ExportNamedDeclaration(export) => match &mut export.declaration {
                Some(Declaration::VariableDeclaration(decl)) => {
                    annotate_declarator(ast, decl, name, value)
                }
                Some(Declaration::FunctionDeclaration(func))
                    if func.id.as_ref().is_some_and(|id| id.name == name) =>
                {
                    func.body
                        .as_mut()
                        .map(|body| annotate_body(ast, body, value))
                        .unwrap_or(false)
                }
                _ => false,
            },
            _ => false,
        };
        if found {
            return true;
        }
    }
    false
}

fn annotate_declarator<'a>(
    ast: &AstBuilder<'a>,
    decl: &mut VariableDeclaration<'a>,
    name: &str,
    value: &str,
) -> bool {
    for declarator in decl.declarations.iter_mut() {
        let matches_name = matches!(
            &declarator.id.kind,
            BindingPatternKind::BindingIdentifier(id) if id.name == name
        );
        if !matches_name {
            continue;
        }
        return match &mut declarator.init {
            Some(Expression::ArrowFunctionExpression(arrow)) => annotate_arrow(ast, arrow, value),
            Some(Expression::FunctionExpression(func)) => func
                .body
                .as_mut()
                .map(|body| annotate_body(ast, body, value))
                .unwrap_or(false),
            _ => false,
        };
    }
    false
}

fn annotate_arrow<'a>(
    ast: &AstBuilder<'a>,
    arrow: &mut ArrowFunctionExpression<'a>,
    value: &str,
) -> bool {
    if arrow.expression {
        // Expression-bodied arrow: the body is the returned expression.
        if let Some(Statement::ExpressionStatement(stmt)) = arrow.body.statements.first_mut() {
            return annotate_expression(ast, &mut stmt.expression, value);
        }
        false
    } else {
        annotate_body(ast, &mut arrow.body, value)
    }
}

/// Block algorithm: the first `return` found in traversal order decides the
/// outcome, whatever it returns.
fn annotate_body<'a>(ast: &AstBuilder<'a>, body: &mut FunctionBody<'a>, value: &str) -> bool {
    let Some(ret) = first_return(&mut body.statements) else {
        return false;
    };
    let Some(argument) = ret.argument.as_mut() else {
        return false;
    };
    annotate_expression(ast, argument, value)
}

fn first_return<'a, 'b>(
    stmts: &'b mut oxc_allocator::Vec<'a, Statement<'a>>,
) -> Option<&'b mut ReturnStatement<'a>> {
    for stmt in stmts.iter_mut() {
        if let Some(found) = first_return_in_statement(stmt) {
            return Some(found);
        }
    }
    None
}

fn first_return_in_statement<'a, 'b>(
    stmt: &'b mut Statement<'a>,
) -> Option<&'b mut ReturnStatement<'a>> {
    match stmt {
        Statement::ReturnStatement(ret) => Some(&mut **ret),
        Statement::BlockStatement(block) => first_return(&mut block.body),
        Statement::IfStatement(if_stmt) => {
            if first_return_in_statement(&mut if_stmt.consequent).is_some() {
                return first_return_in_statement(&mut if_stmt.consequent);
            }
            if_stmt
                .alternate
                .as_mut()
                .and_then(first_return_in_statement)
        }
        Statement::ForStatement(for_stmt) => first_return_in_statement(&mut for_stmt.body),
        Statement::ForInStatement(for_stmt) => first_return_in_statement(&mut for_stmt.body),
        Statement::ForOfStatement(for_stmt) => first_return_in_statement(&mut for_stmt.body),
        Statement::WhileStatement(while_stmt) => first_return_in_statement(&mut while_stmt.body),
        Statement::DoWhileStatement(do_stmt) => first_return_in_statement(&mut do_stmt.body),
        Statement::LabeledStatement(labeled) => first_return_in_statement(&mut labeled.body),
        Statement::TryStatement(try_stmt) => {
            if first_return(&mut try_stmt.block.body).is_some() {
                return first_return(&mut try_stmt.block.body);
            }
            let handler_has_return = try_stmt
                .handler
                .as_mut()
                .map(|handler| first_return(&mut handler.body.body).is_some())
                .unwrap_or(false);
            if handler_has_return {
                return first_return(&mut try_stmt.handler.as_mut().unwrap().body.body);
            }
            try_stmt
                .finalizer
                .as_mut()
                .and_then(|f| first_return(&mut f.body))
        }
        _ => None,
    }
}

fn annotate_expression<'a>(
    ast: &AstBuilder<'a>,
    expr: &mut Expression<'a>,
    value: &str,
) -> bool {
    match unwrap_parens(expr) {
        Expression::JSXElement(element) => {
            inject_attribute(ast, &mut element.opening_element, value)
        }
        // Fragments cannot carry attributes.
        Expression::JSXFragment(_) => false,
        _ => false,
    }
}

fn unwrap_parens<'a, 'b>(expr: &'b mut Expression<'a>) -> &'b mut Expression<'a> {
    match expr {
        Expression::ParenthesizedExpression(paren) => unwrap_parens(&mut paren.expression),
        other => other,
    }
}

/// Prepend the path attribute unless the tag already carries one.
fn inject_attribute<'a>(
    ast: &AstBuilder<'a>,
    opening: &mut JSXOpeningElement<'a>,
    value: &str,
) -> bool {
    let already_present = opening.attributes.iter().any(|item| {
        matches!(
            item,
            JSXAttributeItem::Attribute(attr)
                if matches!(&attr.name, JSXAttributeName::Identifier(id) if id.name == COMPONENT_PATH_ATTR)
        )
    });
    if already_present {
        return false;
    }

    let attr_name = ast.jsx_attribute_name_identifier(SPAN, Atom::from(COMPONENT_PATH_ATTR));
    let value_atom: &str = ast.allocator.alloc_str(value);
    let attr_value =
        JSXAttributeValue::StringLiteral(ast.alloc(ast.string_literal(SPAN, value_atom, None)));
    let attr = ast.jsx_attribute(SPAN, attr_name, Some(attr_value));
    opening
        .attributes
        .insert(0, JSXAttributeItem::Attribute(ast.alloc(attr)));
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALUE: &str = "js/pages/Home.tsx";

    fn annotate(source: &str) -> Option<TransformOutput> {
        annotate_function_component(source, Path::new("/srv/app/js/pages/Home.tsx"), VALUE)
    }

    #[test]
    fn annotates_exported_function_declaration() {
        let out = annotate("export default function Home() { return <div>home</div>; }")
            .expect("annotated");
        assert!(out.code.contains(r#"data-nb-component="js/pages/Home.tsx""#));
        assert!(out.map.is_some());
    }

    #[test]
    fn annotates_expression_bodied_arrow() {
        let out = annotate("export default () => <section>hi</section>;").expect("annotated");
        assert!(out
            .code
            .contains(r#"<section data-nb-component="js/pages/Home.tsx">"#));
    }

    #[test]
    fn annotates_block_bodied_arrow() {
        let out =
            annotate("export default () => { const x = 1; return <main>{x}</main>; };")
                .expect("annotated");
        assert!(out.code.contains("data-nb-component"));
    }

    #[test]
    fn annotates_parenthesized_return() {
        let out = annotate(
            "export default function Home() {\n  return (\n    <div>\n      <p>hi</p>\n    </div>\n  );\n}",
        )
        .expect("annotated");
        assert!(out.code.contains("data-nb-component"));
    }

    #[test]
    fn resolves_bare_identifier_export() {
        let out = annotate("const Home = () => <div>home</div>;\nexport default Home;")
            .expect("annotated");
        assert!(out.code.contains("data-nb-component"));
    }

    #[test]
    fn resolves_wrapped_identifier_export() {
        let out = annotate(
            "import { memo } from 'react';\nconst Home = () => <div>home</div>;\nexport default memo(Home);",
        )
        .expect("annotated");
        assert!(out.code.contains("data-nb-component"));
    }

    #[test]
    fn resolves_nested_wrapped_export() {
        let out = annotate(
            "import { memo, forwardRef } from 'react';\nconst Home = () => <div/>;\nexport default memo(forwardRef(Home));",
        )
        .expect("annotated");
        assert!(out.code.contains("data-nb-component"));
    }

    #[test]
    fn fragments_pass_through_unchanged() {
        assert!(annotate(
            "export default function Home() { return <><h1>a</h1><p>b</p></>; }"
        )
        .is_none());
    }

    #[test]
    fn annotates_first_return_only() {
        let out = annotate(
            "export default function Home({ error }) {\n  if (error) {\n    return <Alert>{error}</Alert>;\n  }\n  return <Page/>;\n}",
        )
        .expect("annotated");
        assert!(out
            .code
            .contains(r#"<Alert data-nb-component="js/pages/Home.tsx">"#));
        assert!(!out.code.contains("<Page data-nb-component"));
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let first =
            annotate("export default function Home() { return <div>home</div>; }").unwrap();
        assert!(annotate(&first.code).is_none());
    }

    #[test]
    fn unresolvable_exports_pass_through() {
        assert!(annotate("export default somethingImported;").is_none());
        assert!(annotate("export default class Home {}").is_none());
        assert!(annotate("const x = 1;").is_none());
    }

    #[test]
    fn non_markup_returns_pass_through() {
        assert!(annotate("export default function make() { return { a: 1 }; }").is_none());
    }

    #[test]
    fn parse_failures_pass_through() {
        assert!(annotate("export default function Home( { return <div; }").is_none());
    }
}
