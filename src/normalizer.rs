use crate::classifier::PackageClassifier;
use crate::error::{Error, Result};
use crate::imports::ImportKind;
use crate::utils::{parse_module, LineIndex};
use log::debug;
use rustpython_ast::{Arguments, Expr, Stmt};
use rustpython_parser::text_size::TextRange;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// A single text replacement: the byte range in the original source and
/// the text that takes its place.
type Edit = (Range<usize>, String);

/// Rewrite state threaded through one file's normalization pass: the alias
/// table built from local imports, and the edits accumulated so far. Each
/// file gets a fresh context; nothing is shared across recursion levels.
#[derive(Default)]
struct RewriteCtx {
    /// Local name in use -> fully qualified replacement (`namespace.symbol`).
    aliases: HashMap<String, String>,
    edits: Vec<Edit>,
}

/// Rewrites a file into a self-contained, alias-free form.
///
/// Pip and system imports survive; local imports are replaced by the
/// imported file's own normalized text, inlined under a synthetic
/// namespace class, and every use-site reference to an alias introduced
/// that way is rewritten to the qualified attribute path. The output
/// contains no import statement that resolves to a local file.
pub struct Normalizer<'a> {
    classifier: &'a PackageClassifier,
}

impl<'a> Normalizer<'a> {
    pub fn new(classifier: &'a PackageClassifier) -> Self {
        Self { classifier }
    }

    /// Normalizes the file at `path`, recursively inlining its local
    /// imports. Untouched code keeps its original formatting; only import
    /// statements and alias references are rewritten.
    pub fn normalize_file(&self, path: &Path) -> Result<String> {
        let mut visited = HashSet::new();
        self.normalize_inner(path, &mut visited)
    }

    fn normalize_inner(&self, path: &Path, visited: &mut HashSet<PathBuf>) -> Result<String> {
        let canon = canonical(path);
        visited.insert(canon.clone());

        let source = fs::read_to_string(path)?;
        let module = parse_module(&source, path)?;
        let index = LineIndex::new(&source);

        let mut ctx = RewriteCtx::default();
        for stmt in &module.body {
            self.rewrite_stmt(stmt, path, &index, &mut ctx, visited)?;
        }

        visited.remove(&canon);
        Ok(apply_edits(&source, ctx.edits))
    }

    /// Produces the inlined namespace text for one local import target.
    /// A target already on the recursion path would cycle forever, so it
    /// inlines as an empty namespace instead.
    fn inline_local(
        &self,
        target: &Path,
        namespace: &str,
        visited: &mut HashSet<PathBuf>,
    ) -> Result<String> {
        let normalized = if visited.contains(&canonical(target)) {
            debug!("circular local import of {}, inlining empty", target.display());
            "pass".to_string()
        } else {
            self.normalize_inner(target, visited)?
        };
        wrap_in_namespace(&normalized, namespace)
    }

    fn rewrite_stmt(
        &self,
        stmt: &Stmt,
        file: &Path,
        index: &LineIndex,
        ctx: &mut RewriteCtx,
        visited: &mut HashSet<PathBuf>,
    ) -> Result<()> {
        match stmt {
            Stmt::Import(node) => {
                let mut pieces = Vec::new();
                for alias in &node.names {
                    match self.classifier.classify_name(alias.name.as_str(), file)? {
                        ImportKind::Local(target) => {
                            // A dotted target namespaces under its last
                            // component; `class pkg.sub:` is not a thing.
                            let namespace = alias
                                .name
                                .split('.')
                                .last()
                                .unwrap_or(alias.name.as_str())
                                .to_string();
                            match &alias.asname {
                                Some(asname) => {
                                    ctx.aliases.insert(asname.to_string(), namespace.clone());
                                }
                                None if alias.name.contains('.') => {
                                    // Use sites spell the dotted path.
                                    ctx.aliases
                                        .insert(alias.name.to_string(), namespace.clone());
                                }
                                None => {}
                            }
                            pieces.push(self.inline_local(&target, &namespace, visited)?);
                        }
                        // Pip and system imports survive, alias included.
                        ImportKind::Pip(_) | ImportKind::System(_) => match &alias.asname {
                            Some(asname) => {
                                pieces.push(format!("import {} as {}", alias.name, asname));
                            }
                            None => pieces.push(format!("import {}", alias.name)),
                        },
                    }
                }
                let indent = " ".repeat(index.column(node.range.start()));
                let replacement = indent_continuations(&pieces.join("\n"), &indent);
                ctx.edits.push((to_byte_range(node.range), replacement));
            }
            Stmt::ImportFrom(node) => {
                // `from . import x` carries no module name; each imported
                // name is itself a candidate sibling module.
                let Some(module_name) = &node.module else {
                    let mut pieces = Vec::new();
                    for alias in &node.names {
                        match self.classifier.classify_name(alias.name.as_str(), file)? {
                            ImportKind::Local(target) => {
                                let namespace = alias.name.to_string();
                                if let Some(asname) = &alias.asname {
                                    ctx.aliases.insert(asname.to_string(), namespace.clone());
                                }
                                pieces.push(self.inline_local(&target, &namespace, visited)?);
                            }
                            ImportKind::Pip(_) | ImportKind::System(_) => match &alias.asname {
                                Some(asname) => pieces
                                    .push(format!("from . import {} as {}", alias.name, asname)),
                                None => pieces.push(format!("from . import {}", alias.name)),
                            },
                        }
                    }
                    let indent = " ".repeat(index.column(node.range.start()));
                    ctx.edits.push((
                        to_byte_range(node.range),
                        indent_continuations(&pieces.join("\n"), &indent),
                    ));
                    return Ok(());
                };
                if let ImportKind::Local(target) =
                    self.classifier.classify_name(module_name.as_str(), file)?
                {
                    let namespace = module_name
                        .split('.')
                        .last()
                        .unwrap_or(module_name.as_str())
                        .to_string();
                    for alias in &node.names {
                        let used = alias.asname.as_ref().unwrap_or(&alias.name);
                        ctx.aliases
                            .insert(used.to_string(), format!("{}.{}", namespace, alias.name));
                    }
                    let inlined = self.inline_local(&target, &namespace, visited)?;
                    let indent = " ".repeat(index.column(node.range.start()));
                    ctx.edits
                        .push((to_byte_range(node.range), indent_continuations(&inlined, &indent)));
                }
                // Pip and system from-imports pass through unchanged.
            }
            Stmt::FunctionDef(node) => {
                for decorator in &node.decorator_list {
                    rewrite_expr(decorator, ctx);
                }
                rewrite_arguments(&node.args, ctx);
                if let Some(returns) = &node.returns {
                    rewrite_expr(returns, ctx);
                }
                for stmt in &node.body {
                    self.rewrite_stmt(stmt, file, index, ctx, visited)?;
                }
            }
            Stmt::AsyncFunctionDef(node) => {
                for decorator in &node.decorator_list {
                    rewrite_expr(decorator, ctx);
                }
                rewrite_arguments(&node.args, ctx);
                if let Some(returns) = &node.returns {
                    rewrite_expr(returns, ctx);
                }
                for stmt in &node.body {
                    self.rewrite_stmt(stmt, file, index, ctx, visited)?;
                }
            }
            Stmt::ClassDef(node) => {
                for base in &node.bases {
                    rewrite_expr(base, ctx);
                }
                for stmt in &node.body {
                    self.rewrite_stmt(stmt, file, index, ctx, visited)?;
                }
            }
            Stmt::Assign(node) => {
                for target in &node.targets {
                    rewrite_expr(target, ctx);
                }
                rewrite_expr(&node.value, ctx);
            }
            Stmt::AugAssign(node) => {
                rewrite_expr(&node.target, ctx);
                rewrite_expr(&node.value, ctx);
            }
            Stmt::AnnAssign(node) => {
                rewrite_expr(&node.target, ctx);
                rewrite_expr(&node.annotation, ctx);
                if let Some(value) = &node.value {
                    rewrite_expr(value, ctx);
                }
            }
            Stmt::Return(node) => {
                if let Some(value) = &node.value {
                    rewrite_expr(value, ctx);
                }
            }
            Stmt::Delete(node) => {
                for target in &node.targets {
                    rewrite_expr(target, ctx);
                }
            }
            Stmt::Expr(node) => rewrite_expr(&node.value, ctx),
            Stmt::If(node) => {
                rewrite_expr(&node.test, ctx);
                for stmt in &node.body {
                    self.rewrite_stmt(stmt, file, index, ctx, visited)?;
                }
                for stmt in &node.orelse {
                    self.rewrite_stmt(stmt, file, index, ctx, visited)?;
                }
            }
            Stmt::For(node) => {
                rewrite_expr(&node.target, ctx);
                rewrite_expr(&node.iter, ctx);
                for stmt in &node.body {
                    self.rewrite_stmt(stmt, file, index, ctx, visited)?;
                }
                for stmt in &node.orelse {
                    self.rewrite_stmt(stmt, file, index, ctx, visited)?;
                }
            }
            Stmt::AsyncFor(node) => {
                rewrite_expr(&node.target, ctx);
                rewrite_expr(&node.iter, ctx);
                for stmt in &node.body {
                    self.rewrite_stmt(stmt, file, index, ctx, visited)?;
                }
                for stmt in &node.orelse {
                    self.rewrite_stmt(stmt, file, index, ctx, visited)?;
                }
            }
            Stmt::While(node) => {
                rewrite_expr(&node.test, ctx);
                for stmt in &node.body {
                    self.rewrite_stmt(stmt, file, index, ctx, visited)?;
                }
                for stmt in &node.orelse {
                    self.rewrite_stmt(stmt, file, index, ctx, visited)?;
                }
            }
            Stmt::With(node) => {
                for item in &node.items {
                    rewrite_expr(&item.context_expr, ctx);
                }
                for stmt in &node.body {
                    self.rewrite_stmt(stmt, file, index, ctx, visited)?;
                }
            }
            Stmt::AsyncWith(node) => {
                for item in &node.items {
                    rewrite_expr(&item.context_expr, ctx);
                }
                for stmt in &node.body {
                    self.rewrite_stmt(stmt, file, index, ctx, visited)?;
                }
            }
            Stmt::Try(node) => {
                for stmt in &node.body {
                    self.rewrite_stmt(stmt, file, index, ctx, visited)?;
                }
                for handler in &node.handlers {
                    let rustpython_ast::ExceptHandler::ExceptHandler(handler_node) = handler;
                    if let Some(type_) = &handler_node.type_ {
                        rewrite_expr(type_, ctx);
                    }
                    for stmt in &handler_node.body {
                        self.rewrite_stmt(stmt, file, index, ctx, visited)?;
                    }
                }
                for stmt in &node.orelse {
                    self.rewrite_stmt(stmt, file, index, ctx, visited)?;
                }
                for stmt in &node.finalbody {
                    self.rewrite_stmt(stmt, file, index, ctx, visited)?;
                }
            }
            Stmt::Match(node) => {
                rewrite_expr(&node.subject, ctx);
                for case in &node.cases {
                    if let Some(guard) = &case.guard {
                        rewrite_expr(guard, ctx);
                    }
                    for stmt in &case.body {
                        self.rewrite_stmt(stmt, file, index, ctx, visited)?;
                    }
                }
            }
            Stmt::Raise(node) => {
                if let Some(exc) = &node.exc {
                    rewrite_expr(exc, ctx);
                }
                if let Some(cause) = &node.cause {
                    rewrite_expr(cause, ctx);
                }
            }
            Stmt::Assert(node) => {
                rewrite_expr(&node.test, ctx);
                if let Some(msg) = &node.msg {
                    rewrite_expr(msg, ctx);
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Rewrites alias references in a function signature: parameter
/// annotations and default values, plus variadic-parameter annotations.
fn rewrite_arguments(args: &Arguments, ctx: &mut RewriteCtx) {
    for arg in args
        .posonlyargs
        .iter()
        .chain(args.args.iter())
        .chain(args.kwonlyargs.iter())
    {
        if let Some(annotation) = &arg.as_arg().annotation {
            rewrite_expr(annotation, ctx);
        }
        if let Some(default) = &arg.default {
            rewrite_expr(default, ctx);
        }
    }
    for vararg in args.vararg.iter().chain(args.kwarg.iter()) {
        if let Some(annotation) = &vararg.annotation {
            rewrite_expr(annotation, ctx);
        }
    }
}

/// The dotted text of a pure name/attribute chain, e.g. `pkg.sub`.
fn dotted_path(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Name(node) => Some(node.id.to_string()),
        Expr::Attribute(node) => Some(format!("{}.{}", dotted_path(&node.value)?, node.attr)),
        _ => None,
    }
}

/// Rewrites alias references inside one expression tree.
fn rewrite_expr(expr: &Expr, ctx: &mut RewriteCtx) {
    match expr {
        Expr::Name(node) => {
            if let Some(replacement) = ctx.aliases.get(node.id.as_str()) {
                ctx.edits
                    .push((to_byte_range(node.range), replacement.clone()));
            }
        }
        Expr::Attribute(node) => {
            // A whole dotted path can be aliased (`import pkg.sub` inlined
            // as namespace `sub`); the longest match replaces this node
            // outright.
            if let Some(path) = dotted_path(expr) {
                if let Some(replacement) = ctx.aliases.get(&path) {
                    ctx.edits
                        .push((to_byte_range(node.range), replacement.clone()));
                    return;
                }
            }
            // Otherwise rewriting the root name of the chain is enough:
            // `alias.member` becomes `namespace.symbol.member` with the
            // member text left in place.
            if let Expr::Name(base) = &*node.value {
                if let Some(replacement) = ctx.aliases.get(base.id.as_str()) {
                    ctx.edits
                        .push((to_byte_range(base.range), replacement.clone()));
                    return;
                }
            }
            rewrite_expr(&node.value, ctx);
        }
        Expr::Call(node) => {
            rewrite_expr(&node.func, ctx);
            for arg in &node.args {
                rewrite_expr(arg, ctx);
            }
            for keyword in &node.keywords {
                rewrite_expr(&keyword.value, ctx);
            }
        }
        Expr::BoolOp(node) => {
            for value in &node.values {
                rewrite_expr(value, ctx);
            }
        }
        Expr::BinOp(node) => {
            rewrite_expr(&node.left, ctx);
            rewrite_expr(&node.right, ctx);
        }
        Expr::UnaryOp(node) => rewrite_expr(&node.operand, ctx),
        Expr::Lambda(node) => {
            rewrite_arguments(&node.args, ctx);
            rewrite_expr(&node.body, ctx);
        }
        Expr::IfExp(node) => {
            rewrite_expr(&node.test, ctx);
            rewrite_expr(&node.body, ctx);
            rewrite_expr(&node.orelse, ctx);
        }
        Expr::Dict(node) => {
            for key in node.keys.iter().flatten() {
                rewrite_expr(key, ctx);
            }
            for value in &node.values {
                rewrite_expr(value, ctx);
            }
        }
        Expr::Set(node) => {
            for elt in &node.elts {
                rewrite_expr(elt, ctx);
            }
        }
        Expr::ListComp(node) => {
            rewrite_expr(&node.elt, ctx);
            for gen in &node.generators {
                rewrite_expr(&gen.iter, ctx);
                for if_expr in &gen.ifs {
                    rewrite_expr(if_expr, ctx);
                }
            }
        }
        Expr::SetComp(node) => {
            rewrite_expr(&node.elt, ctx);
            for gen in &node.generators {
                rewrite_expr(&gen.iter, ctx);
                for if_expr in &gen.ifs {
                    rewrite_expr(if_expr, ctx);
                }
            }
        }
        Expr::DictComp(node) => {
            rewrite_expr(&node.key, ctx);
            rewrite_expr(&node.value, ctx);
            for gen in &node.generators {
                rewrite_expr(&gen.iter, ctx);
                for if_expr in &gen.ifs {
                    rewrite_expr(if_expr, ctx);
                }
            }
        }
        Expr::GeneratorExp(node) => {
            rewrite_expr(&node.elt, ctx);
            for gen in &node.generators {
                rewrite_expr(&gen.iter, ctx);
                for if_expr in &gen.ifs {
                    rewrite_expr(if_expr, ctx);
                }
            }
        }
        Expr::Await(node) => rewrite_expr(&node.value, ctx),
        Expr::Yield(node) => {
            if let Some(value) = &node.value {
                rewrite_expr(value, ctx);
            }
        }
        Expr::YieldFrom(node) => rewrite_expr(&node.value, ctx),
        Expr::Compare(node) => {
            rewrite_expr(&node.left, ctx);
            for comparator in &node.comparators {
                rewrite_expr(comparator, ctx);
            }
        }
        Expr::Subscript(node) => {
            rewrite_expr(&node.value, ctx);
            rewrite_expr(&node.slice, ctx);
        }
        Expr::Starred(node) => rewrite_expr(&node.value, ctx),
        Expr::FormattedValue(node) => rewrite_expr(&node.value, ctx),
        Expr::JoinedStr(node) => {
            for value in &node.values {
                rewrite_expr(value, ctx);
            }
        }
        Expr::List(node) => {
            for elt in &node.elts {
                rewrite_expr(elt, ctx);
            }
        }
        Expr::Tuple(node) => {
            for elt in &node.elts {
                rewrite_expr(elt, ctx);
            }
        }
        Expr::Slice(node) => {
            if let Some(lower) = &node.lower {
                rewrite_expr(lower, ctx);
            }
            if let Some(upper) = &node.upper {
                rewrite_expr(upper, ctx);
            }
            if let Some(step) = &node.step {
                rewrite_expr(step, ctx);
            }
        }
        _ => {}
    }
}

/// Wraps normalized module code in a synthetic namespace: a class holding
/// the module's top-level symbols, immediately instantiated under the same
/// name so members stay reachable via ordinary attribute access.
pub fn wrap_in_namespace(code: &str, name: &str) -> Result<String> {
    if name.is_empty() || name.contains(char::is_whitespace) || name.contains('.') {
        return Err(Error::InvalidName(name.to_string()));
    }
    let indented = code
        .split('\n')
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(format!("class {name}:\n{indented}\n{name} = {name}()"))
}

/// Applies the collected edits back-to-front so earlier byte offsets stay
/// valid while later ranges are replaced.
fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    let mut output = source.to_string();
    for (range, text) in edits {
        output.replace_range(range, &text);
    }
    output
}

/// Indents every line after the first, so multi-line replacements inside
/// an indented block line up with the statement they replace.
fn indent_continuations(text: &str, indent: &str) -> String {
    if indent.is_empty() {
        return text.to_string();
    }
    let mut lines = text.split('\n');
    let first = lines.next().unwrap_or("").to_string();
    std::iter::once(first)
        .chain(lines.map(|line| format!("{indent}{line}")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn to_byte_range(range: TextRange) -> Range<usize> {
    range.start().to_usize()..range.end().to_usize()
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
