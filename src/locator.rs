use crate::error::Result;
use crate::utils::{parse_module, slice_lines, LineIndex};
use rustpython_ast::{Expr, Stmt};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A top-level function found in a source unit.
///
/// Two flavors exist: an explicit `def`/`async def`, and a lambda bound by
/// a top-level single-target assignment. Line numbers are 1-indexed and
/// inclusive, so the source slice is `lines[start_line-1..end_line]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    /// The declared name (def name, or the assignment target for a lambda).
    pub name: String,
    /// First line of the definition.
    pub start_line: usize,
    /// Last line of the definition.
    pub end_line: usize,
}

/// Lists the top-level functions of a source unit, in declaration order.
///
/// Only direct children of the module root count. Explicit definitions come
/// first, then lambda-bound names, each group in declaration order (the
/// two-pass construction). Names may repeat: a def and a lambda sharing a
/// name are both reported.
pub fn top_level_functions(source: &str) -> Result<Vec<FunctionDescriptor>> {
    let module = parse_module(source, Path::new("<string>"))?;
    let index = LineIndex::new(source);
    let mut descriptors = Vec::new();

    // First pass: explicit function definitions.
    for stmt in &module.body {
        match stmt {
            Stmt::FunctionDef(node) => {
                descriptors.push(FunctionDescriptor {
                    name: node.name.to_string(),
                    start_line: index.line_index(node.range.start()),
                    end_line: index.line_index(node.range.end()),
                });
            }
            Stmt::AsyncFunctionDef(node) => {
                descriptors.push(FunctionDescriptor {
                    name: node.name.to_string(),
                    start_line: index.line_index(node.range.start()),
                    end_line: index.line_index(node.range.end()),
                });
            }
            _ => {}
        }
    }

    // Second pass: top-level single-target lambda assignments.
    for stmt in &module.body {
        if let Stmt::Assign(node) = stmt {
            if node.targets.len() != 1 {
                continue;
            }
            if let (Some(Expr::Name(target)), Expr::Lambda(_)) =
                (node.targets.first(), &*node.value)
            {
                descriptors.push(FunctionDescriptor {
                    name: target.id.to_string(),
                    start_line: index.line_index(node.range.start()),
                    end_line: index.line_index(node.range.end()),
                });
            }
        }
    }

    Ok(descriptors)
}

/// Lists the names of all top-level functions, in declaration order.
pub fn enumerate_functions(source: &str) -> Result<Vec<String>> {
    Ok(top_level_functions(source)?
        .into_iter()
        .map(|d| d.name)
        .collect())
}

/// Extracts the exact source slice of the named function.
///
/// Walks the entire tree depth-first, nested scopes included, and returns
/// the first definition or lambda that matches. For a lambda the match is a
/// heuristic: the name must appear in the text of the assignment lines that
/// surround the lambda, which is not guaranteed unique. When two nested
/// functions share a name, whichever comes first in traversal order wins;
/// callers needing the inner one must disambiguate by scope themselves.
///
/// A file that does not parse is an error; a name that does not match
/// anything is `Ok(None)`.
pub fn locate_function(source: &str, name: &str) -> Result<Option<String>> {
    let module = parse_module(source, Path::new("<string>"))?;
    let index = LineIndex::new(source);

    Ok(find_in_stmts(&module.body, name, source, &index)
        .map(|(start, end)| slice_lines(source, start, end)))
}

/// Depth-first search over statements for a matching def or lambda.
/// Returns the `(start_line, end_line)` span of the first hit.
fn find_in_stmts(
    stmts: &[Stmt],
    name: &str,
    source: &str,
    index: &LineIndex,
) -> Option<(usize, usize)> {
    for stmt in stmts {
        if let Some(span) = find_in_stmt(stmt, name, source, index) {
            return Some(span);
        }
    }
    None
}

fn find_in_stmt(
    stmt: &Stmt,
    name: &str,
    source: &str,
    index: &LineIndex,
) -> Option<(usize, usize)> {
    match stmt {
        Stmt::FunctionDef(node) => {
            if node.name.as_str() == name {
                return Some(span_of(node.range.start(), node.range.end(), index));
            }
            find_in_stmts(&node.body, name, source, index)
        }
        Stmt::AsyncFunctionDef(node) => {
            if node.name.as_str() == name {
                return Some(span_of(node.range.start(), node.range.end(), index));
            }
            find_in_stmts(&node.body, name, source, index)
        }
        Stmt::ClassDef(node) => find_in_stmts(&node.body, name, source, index),
        Stmt::Assign(node) => find_lambda_in_expr(&node.value, name, source, index),
        Stmt::AnnAssign(node) => node
            .value
            .as_ref()
            .and_then(|value| find_lambda_in_expr(value, name, source, index)),
        Stmt::AugAssign(node) => find_lambda_in_expr(&node.value, name, source, index),
        Stmt::Return(node) => node
            .value
            .as_ref()
            .and_then(|value| find_lambda_in_expr(value, name, source, index)),
        Stmt::Expr(node) => find_lambda_in_expr(&node.value, name, source, index),
        Stmt::If(node) => find_lambda_in_expr(&node.test, name, source, index)
            .or_else(|| find_in_stmts(&node.body, name, source, index))
            .or_else(|| find_in_stmts(&node.orelse, name, source, index)),
        Stmt::For(node) => find_lambda_in_expr(&node.iter, name, source, index)
            .or_else(|| find_in_stmts(&node.body, name, source, index))
            .or_else(|| find_in_stmts(&node.orelse, name, source, index)),
        Stmt::While(node) => find_lambda_in_expr(&node.test, name, source, index)
            .or_else(|| find_in_stmts(&node.body, name, source, index))
            .or_else(|| find_in_stmts(&node.orelse, name, source, index)),
        Stmt::With(node) => find_in_stmts(&node.body, name, source, index),
        Stmt::AsyncWith(node) => find_in_stmts(&node.body, name, source, index),
        Stmt::Try(node) => find_in_stmts(&node.body, name, source, index)
            .or_else(|| {
                node.handlers.iter().find_map(|handler| {
                    let rustpython_ast::ExceptHandler::ExceptHandler(handler_node) = handler;
                    find_in_stmts(&handler_node.body, name, source, index)
                })
            })
            .or_else(|| find_in_stmts(&node.orelse, name, source, index))
            .or_else(|| find_in_stmts(&node.finalbody, name, source, index)),
        Stmt::Match(node) => find_lambda_in_expr(&node.subject, name, source, index).or_else(|| {
            node.cases
                .iter()
                .find_map(|case| find_in_stmts(&case.body, name, source, index))
        }),
        _ => None,
    }
}

/// Searches an expression tree for a lambda matching the name heuristic.
fn find_lambda_in_expr(
    expr: &Expr,
    name: &str,
    source: &str,
    index: &LineIndex,
) -> Option<(usize, usize)> {
    match expr {
        Expr::Lambda(node) => {
            let (start, end) = span_of(node.range.start(), node.range.end(), index);
            // Heuristic match: the declared name lives in the assignment
            // text around the lambda, e.g. "shaggy = lambda x: x ** 2".
            let surrounding = slice_lines(source, start, end);
            if surrounding.contains(name) {
                return Some((start, end));
            }
            find_lambda_in_expr(&node.body, name, source, index)
        }
        Expr::Call(node) => find_lambda_in_expr(&node.func, name, source, index)
            .or_else(|| {
                node.args
                    .iter()
                    .find_map(|arg| find_lambda_in_expr(arg, name, source, index))
            })
            .or_else(|| {
                node.keywords
                    .iter()
                    .find_map(|kw| find_lambda_in_expr(&kw.value, name, source, index))
            }),
        Expr::BoolOp(node) => node
            .values
            .iter()
            .find_map(|value| find_lambda_in_expr(value, name, source, index)),
        Expr::BinOp(node) => find_lambda_in_expr(&node.left, name, source, index)
            .or_else(|| find_lambda_in_expr(&node.right, name, source, index)),
        Expr::UnaryOp(node) => find_lambda_in_expr(&node.operand, name, source, index),
        Expr::IfExp(node) => find_lambda_in_expr(&node.test, name, source, index)
            .or_else(|| find_lambda_in_expr(&node.body, name, source, index))
            .or_else(|| find_lambda_in_expr(&node.orelse, name, source, index)),
        Expr::Dict(node) => node
            .keys
            .iter()
            .flatten()
            .find_map(|key| find_lambda_in_expr(key, name, source, index))
            .or_else(|| {
                node.values
                    .iter()
                    .find_map(|value| find_lambda_in_expr(value, name, source, index))
            }),
        Expr::List(node) => node
            .elts
            .iter()
            .find_map(|elt| find_lambda_in_expr(elt, name, source, index)),
        Expr::Set(node) => node
            .elts
            .iter()
            .find_map(|elt| find_lambda_in_expr(elt, name, source, index)),
        Expr::Tuple(node) => node
            .elts
            .iter()
            .find_map(|elt| find_lambda_in_expr(elt, name, source, index)),
        Expr::Attribute(node) => find_lambda_in_expr(&node.value, name, source, index),
        Expr::Subscript(node) => find_lambda_in_expr(&node.value, name, source, index)
            .or_else(|| find_lambda_in_expr(&node.slice, name, source, index)),
        Expr::Await(node) => find_lambda_in_expr(&node.value, name, source, index),
        Expr::Yield(node) => node
            .value
            .as_ref()
            .and_then(|value| find_lambda_in_expr(value, name, source, index)),
        Expr::YieldFrom(node) => find_lambda_in_expr(&node.value, name, source, index),
        Expr::Compare(node) => find_lambda_in_expr(&node.left, name, source, index)
            .or_else(|| {
                node.comparators
                    .iter()
                    .find_map(|cmp| find_lambda_in_expr(cmp, name, source, index))
            }),
        _ => None,
    }
}

fn span_of(
    start: rustpython_ast::TextSize,
    end: rustpython_ast::TextSize,
    index: &LineIndex,
) -> (usize, usize) {
    (index.line_index(start), index.line_index(end))
}
