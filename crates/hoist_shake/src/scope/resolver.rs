use std::collections::HashSet;
use std::mem;

use indexmap::IndexMap;
use swc_core::ecma::ast::{
    ArrowExpr, AssignExpr, AssignOp, AssignTarget, BindingIdent, BlockStmt, BlockStmtOrExpr,
    CallExpr, Callee, CatchClause, ClassExpr, Constructor, Decl, DefaultDecl, ExportSpecifier,
    Expr, ExprStmt, FnExpr, ForHead, ForInStmt, ForOfStmt, ForStmt, Function, GetterProp,
    ImportSpecifier, MemberProp, Module, ModuleDecl, ModuleExportName, ModuleItem, NamedExport,
    ParamOrTsParamProp, Pat, Prop, SetterProp, SimpleAssignTarget, StaticBlock, Stmt,
    SwitchStmt, VarDecl, VarDeclKind, VarDeclOrExpr, VarDeclarator,
};
use swc_core::ecma::visit::{Visit, VisitWith};

use super::declared_names::{lexical_names, pat_names, var_hoisted_names};
use super::{
    AssignId, AssignSite, Binding, DeclSite, Declaration, DeclaratorId, Occurrence, Scope,
    ScopeResolver,
};
use crate::shake::purity::{is_pure_class, is_pure_expr, is_pure_init};

/// Resolves the program scope of a module by walking its AST.
///
/// Names declared in nested function, block, catch, class and loop scopes
/// shadow the top-level binding of the same name.
pub struct TopLevelResolver {
    wildcard_helper: String,
    strict_assignments: bool,
}

impl TopLevelResolver {
    pub fn new(wildcard_helper: impl Into<String>, strict_assignments: bool) -> Self {
        Self {
            wildcard_helper: wildcard_helper.into(),
            strict_assignments,
        }
    }
}

impl ScopeResolver for TopLevelResolver {
    fn crawl(&self, module: &Module) -> Scope {
        let mut crawler = Crawler {
            wildcard_helper: &self.wildcard_helper,
            strict_assignments: self.strict_assignments,
            bindings: collect_top_level_names(module),
            shadows: vec![],
            function_depth: 0,
            next_assign: 0,
            next_declarator: 0,
            discard_next: false,
            expr_stmt_in_list: false,
            var_decl_in_list: false,
            in_assign_pattern: false,
        };
        module.visit_with(&mut crawler);
        Scope::from_bindings(crawler.bindings.into_values())
    }
}

/// Registers every program-scope name in declaration order. Declarations
/// that can never be deleted get an opaque site here, the others are
/// attached while crawling.
fn collect_top_level_names(module: &Module) -> IndexMap<String, Binding> {
    let mut bindings: IndexMap<String, Binding> = IndexMap::new();
    let mut register = |name: String, opaque: bool| {
        let binding = bindings
            .entry(name.clone())
            .or_insert_with(|| Binding::new(name));
        if opaque {
            binding.declarations.push(DeclSite::opaque());
        }
    };

    for module_item in &module.body {
        match module_item {
            ModuleItem::Stmt(Stmt::Decl(decl)) => match decl {
                Decl::Var(var_decl) => {
                    let mut names = vec![];
                    for declarator in &var_decl.decls {
                        pat_names(&declarator.name, &mut names);
                    }
                    names.into_iter().for_each(|name| register(name, false));
                }
                Decl::Fn(fn_decl) => register(fn_decl.ident.sym.to_string(), false),
                Decl::Class(class_decl) => register(class_decl.ident.sym.to_string(), false),
                Decl::Using(using_decl) => {
                    let mut names = vec![];
                    for declarator in &using_decl.decls {
                        pat_names(&declarator.name, &mut names);
                    }
                    names.into_iter().for_each(|name| register(name, true));
                }
                _ => {}
            },
            ModuleItem::Stmt(stmt) => {
                let mut names = var_hoisted_names(stmt).into_iter().collect::<Vec<_>>();
                names.sort();
                names.into_iter().for_each(|name| register(name, false));
            }
            ModuleItem::ModuleDecl(module_decl) => {
                let mut names = vec![];
                match module_decl {
                    ModuleDecl::Import(import_decl) => {
                        for specifier in &import_decl.specifiers {
                            let local = match specifier {
                                ImportSpecifier::Named(named) => &named.local,
                                ImportSpecifier::Default(default) => &default.local,
                                ImportSpecifier::Namespace(namespace) => &namespace.local,
                            };
                            names.push(local.sym.to_string());
                        }
                    }
                    ModuleDecl::ExportDecl(export_decl) => match &export_decl.decl {
                        // exported declarators are marked opaque while crawling
                        Decl::Var(var_decl) => {
                            let mut exported = vec![];
                            for declarator in &var_decl.decls {
                                pat_names(&declarator.name, &mut exported);
                            }
                            exported.into_iter().for_each(|name| register(name, false));
                        }
                        Decl::Fn(fn_decl) => names.push(fn_decl.ident.sym.to_string()),
                        Decl::Class(class_decl) => names.push(class_decl.ident.sym.to_string()),
                        _ => {}
                    },
                    ModuleDecl::ExportDefaultDecl(export_default) => match &export_default.decl {
                        DefaultDecl::Fn(fn_expr) => {
                            names.extend(fn_expr.ident.iter().map(|ident| ident.sym.to_string()))
                        }
                        DefaultDecl::Class(class_expr) => names
                            .extend(class_expr.ident.iter().map(|ident| ident.sym.to_string())),
                        _ => {}
                    },
                    _ => {}
                }
                names.into_iter().for_each(|name| register(name, true));
            }
        }
    }

    bindings
}

struct Crawler<'a> {
    wildcard_helper: &'a str,
    strict_assignments: bool,
    bindings: IndexMap<String, Binding>,
    shadows: Vec<HashSet<String>>,
    // nesting of function scopes, `var` only reaches the program scope at 0
    function_depth: u32,
    next_assign: u32,
    next_declarator: u32,
    // the next visited expression's value is unused
    discard_next: bool,
    // the next visited expression statement sits in a statement list
    expr_stmt_in_list: bool,
    // the next visited variable declaration sits in a statement list or a
    // `for` init, where its declarators can be deleted one by one
    var_decl_in_list: bool,
    in_assign_pattern: bool,
}

impl Crawler<'_> {
    fn is_shadowed(&self, name: &str) -> bool {
        self.shadows.iter().any(|names| names.contains(name))
    }

    fn resolves_to_top_level(&self, name: &str) -> bool {
        !self.is_shadowed(name) && self.bindings.contains_key(name)
    }

    fn is_declared(&self, name: &str) -> bool {
        self.is_shadowed(name) || self.bindings.contains_key(name)
    }

    fn declare(&mut self, name: &str, site: DeclSite) {
        if let Some(binding) = self.bindings.get_mut(name) {
            binding.declarations.push(site);
        }
    }

    /// Only an identifier declarator in a statement list can be deleted on
    /// its own.
    fn declare_declarator(
        &mut self,
        id: DeclaratorId,
        declarator: &VarDeclarator,
        in_list: bool,
    ) {
        match &declarator.name {
            Pat::Ident(ident) if in_list && !self.is_shadowed(&ident.id.sym) => {
                let pure =
                    is_pure_init(declarator.init.as_deref(), &|name| self.is_declared(name));
                self.declare(
                    &ident.id.sym,
                    DeclSite {
                        declaration: Declaration::Declarator(id),
                        pure,
                    },
                );
            }
            pat => {
                let mut names = vec![];
                pat_names(pat, &mut names);
                for name in names {
                    self.declare(&name, DeclSite::opaque());
                }
            }
        }
    }

    fn record(&mut self, name: &str, occurrence: Occurrence) {
        if self.is_shadowed(name) {
            return;
        }
        if let Some(binding) = self.bindings.get_mut(name) {
            if occurrence.is_constant_violation() {
                binding.constant_violations.push(occurrence);
            } else {
                binding.references.push(occurrence);
            }
        }
    }

    fn with_shadow(&mut self, names: HashSet<String>, f: impl FnOnce(&mut Self)) {
        self.shadows.push(names);
        f(self);
        self.shadows.pop();
    }

    fn is_pure(&self, expr: &Expr) -> bool {
        is_pure_expr(expr, &|name| self.resolves_to_top_level(name))
    }

    fn visit_assign(&mut self, assign: &AssignExpr, discarded: bool) {
        let id = AssignId(self.next_assign);
        self.next_assign += 1;

        let plain = assign.op == AssignOp::Assign;
        match &assign.left {
            AssignTarget::Simple(SimpleAssignTarget::Ident(ident)) => {
                let name = ident.id.sym.to_string();
                if plain {
                    let value_pure = !self.strict_assignments || self.is_pure(&assign.right);
                    self.record(
                        &name,
                        Occurrence::BareAssignment(AssignSite {
                            id,
                            discarded,
                            value_pure,
                        }),
                    );
                } else {
                    // compound assignment reads the binding first
                    self.record(&name, Occurrence::Reference);
                }
            }
            AssignTarget::Simple(SimpleAssignTarget::Member(member)) => {
                match &*member.obj {
                    Expr::Ident(obj) if plain => {
                        let value_pure = !self.strict_assignments
                            || (self.is_pure(&assign.right)
                                && match &member.prop {
                                    MemberProp::Computed(computed) => self.is_pure(&computed.expr),
                                    _ => true,
                                });
                        self.record(
                            &obj.sym.to_string(),
                            Occurrence::PropertyAccessObject(AssignSite {
                                id,
                                discarded,
                                value_pure,
                            }),
                        );
                    }
                    obj => obj.visit_with(self),
                }
                member.prop.visit_with(self);
            }
            AssignTarget::Pat(pat) => {
                let in_assign_pattern = mem::replace(&mut self.in_assign_pattern, true);
                pat.visit_with(self);
                self.in_assign_pattern = in_assign_pattern;
            }
            left => left.visit_with(self),
        }

        assign.right.visit_with(self);
    }

    /// `helper(dest, source)` with an identifier as `source`
    fn wildcard_source<'c>(&self, call: &'c CallExpr) -> Option<&'c str> {
        let Callee::Expr(callee) = &call.callee else {
            return None;
        };
        match &**callee {
            Expr::Ident(ident) if &*ident.sym == self.wildcard_helper => {}
            _ => return None,
        }
        match call.args.get(1) {
            Some(arg) if arg.spread.is_none() => match &*arg.expr {
                Expr::Ident(source) => Some(&*source.sym),
                _ => None,
            },
            _ => None,
        }
    }

    /// Parameters are visited under their own names only, the body also
    /// under its hoisted `var` names. `head` visits everything evaluated in
    /// the parameter scope.
    fn visit_function_scope(
        &mut self,
        params: HashSet<String>,
        head: impl FnOnce(&mut Self),
        body: Option<&BlockStmt>,
    ) {
        self.function_depth += 1;
        self.with_shadow(params, |this| {
            head(this);
            if let Some(body) = body {
                this.with_shadow(var_hoisted_names(body), |this| body.visit_with(this));
            }
        });
        self.function_depth -= 1;
    }
}

impl Visit for Crawler<'_> {
    fn visit_module_items(&mut self, items: &[ModuleItem]) {
        for (item, module_item) in items.iter().enumerate() {
            match module_item {
                ModuleItem::Stmt(Stmt::Decl(Decl::Fn(fn_decl))) => {
                    // the body only runs when called
                    self.declare(
                        &fn_decl.ident.sym,
                        DeclSite {
                            declaration: Declaration::Function { item },
                            pure: true,
                        },
                    );
                }
                ModuleItem::Stmt(Stmt::Decl(Decl::Class(class_decl))) => {
                    let pure = is_pure_class(&class_decl.class, &|name| self.is_declared(name));
                    self.declare(
                        &class_decl.ident.sym,
                        DeclSite {
                            declaration: Declaration::Class { item },
                            pure,
                        },
                    );
                }
                _ => {}
            }

            self.expr_stmt_in_list = matches!(module_item, ModuleItem::Stmt(Stmt::Expr(_)));
            self.var_decl_in_list =
                matches!(module_item, ModuleItem::Stmt(Stmt::Decl(Decl::Var(_))));
            module_item.visit_with(self);
        }
    }

    fn visit_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.expr_stmt_in_list = matches!(stmt, Stmt::Expr(_));
            self.var_decl_in_list = matches!(stmt, Stmt::Decl(Decl::Var(_)));
            stmt.visit_with(self);
        }
    }

    fn visit_expr_stmt(&mut self, expr_stmt: &ExprStmt) {
        self.discard_next = mem::take(&mut self.expr_stmt_in_list);
        expr_stmt.expr.visit_with(self);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        let discarded = mem::take(&mut self.discard_next);
        let in_assign_pattern = mem::take(&mut self.in_assign_pattern);

        match expr {
            Expr::Ident(ident) => self.record(&ident.sym.to_string(), Occurrence::Reference),
            Expr::Assign(assign) => self.visit_assign(assign, discarded),
            Expr::Paren(paren) => {
                self.discard_next = discarded;
                paren.expr.visit_with(self);
            }
            Expr::Seq(seq) => {
                // dropping leading elements in front of `obj.method` would
                // change the callee's `this`
                let last_is_member_like = seq.exprs.last().map_or(false, |last| {
                    let mut last = &**last;
                    while let Expr::Paren(paren) = last {
                        last = &*paren.expr;
                    }
                    match last {
                        Expr::Member(_) | Expr::SuperProp(_) | Expr::OptChain(_) => true,
                        Expr::Ident(ident) => &*ident.sym == "eval",
                        _ => false,
                    }
                });
                let len = seq.exprs.len();
                for (index, elem) in seq.exprs.iter().enumerate() {
                    self.discard_next = discarded || (index + 1 < len && !last_is_member_like);
                    elem.visit_with(self);
                }
            }
            Expr::Update(update) => match &*update.arg {
                Expr::Ident(ident) => self.record(&ident.sym.to_string(), Occurrence::OtherWrite),
                _ => update.visit_children_with(self),
            },
            _ => expr.visit_children_with(self),
        }

        self.in_assign_pattern = in_assign_pattern;
    }

    fn visit_binding_ident(&mut self, ident: &BindingIdent) {
        if self.in_assign_pattern {
            self.record(&ident.id.sym.to_string(), Occurrence::OtherWrite);
        }
    }

    fn visit_pat(&mut self, pat: &Pat) {
        match pat {
            // `[obj.x] = arr` assigns through an expression
            Pat::Expr(expr) => {
                let in_assign_pattern = mem::take(&mut self.in_assign_pattern);
                expr.visit_with(self);
                self.in_assign_pattern = in_assign_pattern;
            }
            _ => pat.visit_children_with(self),
        }
    }

    fn visit_prop(&mut self, prop: &Prop) {
        match prop {
            Prop::Shorthand(ident) => self.record(&ident.sym.to_string(), Occurrence::Reference),
            _ => prop.visit_children_with(self),
        }
    }

    fn visit_member_prop(&mut self, prop: &MemberProp) {
        if let MemberProp::Computed(computed) = prop {
            computed.visit_with(self);
        }
    }

    fn visit_named_export(&mut self, export: &NamedExport) {
        if export.src.is_some() {
            return;
        }
        for specifier in &export.specifiers {
            if let ExportSpecifier::Named(named) = specifier {
                if let ModuleExportName::Ident(ident) = &named.orig {
                    self.record(&ident.sym.to_string(), Occurrence::Reference);
                }
            }
        }
    }

    fn visit_var_decl(&mut self, var_decl: &VarDecl) {
        let in_list = mem::take(&mut self.var_decl_in_list);
        let top_level = match var_decl.kind {
            VarDeclKind::Var => self.function_depth == 0,
            _ => self.shadows.is_empty(),
        };
        for declarator in &var_decl.decls {
            if top_level {
                self.declare_declarator(DeclaratorId(self.next_declarator), declarator, in_list);
            }
            declarator.visit_with(self);
        }
    }

    fn visit_var_declarator(&mut self, declarator: &VarDeclarator) {
        self.next_declarator += 1;
        declarator.name.visit_with(self);

        let Some(init) = &declarator.init else {
            return;
        };

        if let (Pat::Ident(target), Expr::Call(call), true) =
            (&declarator.name, &**init, self.shadows.is_empty())
        {
            if let Some(source) = self.wildcard_source(call) {
                let source = source.to_string();
                call.callee.visit_with(self);
                for (index, arg) in call.args.iter().enumerate() {
                    if index == 1 {
                        self.record(
                            &source,
                            Occurrence::WildcardArgument {
                                target: target.id.sym.to_string(),
                            },
                        );
                    } else {
                        arg.visit_with(self);
                    }
                }
                return;
            }
        }

        init.visit_with(self);
    }

    fn visit_for_stmt(&mut self, for_stmt: &ForStmt) {
        let names = match &for_stmt.init {
            Some(VarDeclOrExpr::VarDecl(var_decl)) if var_decl.kind != VarDeclKind::Var => {
                let mut names = vec![];
                for declarator in &var_decl.decls {
                    pat_names(&declarator.name, &mut names);
                }
                names.into_iter().collect()
            }
            _ => HashSet::new(),
        };

        self.with_shadow(names, |this| {
            match &for_stmt.init {
                Some(VarDeclOrExpr::Expr(init)) => {
                    this.discard_next = true;
                    init.visit_with(this);
                }
                Some(VarDeclOrExpr::VarDecl(var_decl)) => {
                    this.var_decl_in_list = true;
                    var_decl.visit_with(this);
                }
                None => {}
            }
            for_stmt.test.visit_with(this);
            if let Some(update) = &for_stmt.update {
                this.discard_next = true;
                update.visit_with(this);
            }
            for_stmt.body.visit_with(this);
        });
    }

    fn visit_for_in_stmt(&mut self, for_in: &ForInStmt) {
        self.with_shadow(for_head_names(&for_in.left), |this| {
            for_in.left.visit_with(this);
            for_in.right.visit_with(this);
            for_in.body.visit_with(this);
        });
    }

    fn visit_for_of_stmt(&mut self, for_of: &ForOfStmt) {
        self.with_shadow(for_head_names(&for_of.left), |this| {
            for_of.left.visit_with(this);
            for_of.right.visit_with(this);
            for_of.body.visit_with(this);
        });
    }

    fn visit_for_head(&mut self, head: &ForHead) {
        match head {
            // `for (x in o)` writes to `x`
            ForHead::Pat(pat) => {
                let in_assign_pattern = mem::replace(&mut self.in_assign_pattern, true);
                pat.visit_with(self);
                self.in_assign_pattern = in_assign_pattern;
            }
            _ => head.visit_children_with(self),
        }
    }

    fn visit_function(&mut self, function: &Function) {
        let mut params = vec![];
        for param in &function.params {
            pat_names(&param.pat, &mut params);
        }
        self.visit_function_scope(
            params.into_iter().collect(),
            |this| {
                function.params.visit_with(this);
                function.decorators.visit_with(this);
            },
            function.body.as_ref(),
        );
    }

    fn visit_fn_expr(&mut self, fn_expr: &FnExpr) {
        let names = fn_expr
            .ident
            .iter()
            .map(|ident| ident.sym.to_string())
            .collect();
        self.with_shadow(names, |this| fn_expr.function.visit_with(this));
    }

    fn visit_arrow_expr(&mut self, arrow: &ArrowExpr) {
        let mut params = vec![];
        for param in &arrow.params {
            pat_names(param, &mut params);
        }
        match &*arrow.body {
            BlockStmtOrExpr::BlockStmt(block) => self.visit_function_scope(
                params.into_iter().collect(),
                |this| arrow.params.visit_with(this),
                Some(block),
            ),
            BlockStmtOrExpr::Expr(expr) => self.visit_function_scope(
                params.into_iter().collect(),
                |this| {
                    arrow.params.visit_with(this);
                    expr.visit_with(this);
                },
                None,
            ),
        }
    }

    fn visit_constructor(&mut self, constructor: &Constructor) {
        constructor.key.visit_with(self);
        let mut params = vec![];
        for param in &constructor.params {
            if let ParamOrTsParamProp::Param(param) = param {
                pat_names(&param.pat, &mut params);
            }
        }
        self.visit_function_scope(
            params.into_iter().collect(),
            |this| constructor.params.visit_with(this),
            constructor.body.as_ref(),
        );
    }

    fn visit_getter_prop(&mut self, getter: &GetterProp) {
        getter.key.visit_with(self);
        self.visit_function_scope(HashSet::new(), |_| {}, getter.body.as_ref());
    }

    fn visit_setter_prop(&mut self, setter: &SetterProp) {
        setter.key.visit_with(self);
        let mut params = vec![];
        if let Some(this_param) = &setter.this_param {
            pat_names(this_param, &mut params);
        }
        pat_names(&setter.param, &mut params);
        self.visit_function_scope(
            params.into_iter().collect(),
            |this| {
                setter.this_param.visit_with(this);
                setter.param.visit_with(this);
            },
            setter.body.as_ref(),
        );
    }

    fn visit_static_block(&mut self, block: &StaticBlock) {
        self.visit_function_scope(HashSet::new(), |_| {}, Some(&block.body));
    }

    fn visit_class_expr(&mut self, class_expr: &ClassExpr) {
        let names = class_expr
            .ident
            .iter()
            .map(|ident| ident.sym.to_string())
            .collect();
        self.with_shadow(names, |this| class_expr.visit_children_with(this));
    }

    fn visit_block_stmt(&mut self, block: &BlockStmt) {
        self.with_shadow(lexical_names(&block.stmts), |this| {
            block.visit_children_with(this)
        });
    }

    fn visit_switch_stmt(&mut self, switch: &SwitchStmt) {
        switch.discriminant.visit_with(self);
        let names = lexical_names(switch.cases.iter().flat_map(|case| case.cons.iter()));
        self.with_shadow(names, |this| switch.cases.visit_with(this));
    }

    fn visit_catch_clause(&mut self, catch: &CatchClause) {
        let mut names = vec![];
        if let Some(param) = &catch.param {
            pat_names(param, &mut names);
        }
        self.with_shadow(names.into_iter().collect(), |this| {
            catch.visit_children_with(this)
        });
    }
}

fn for_head_names(head: &ForHead) -> HashSet<String> {
    let mut names = vec![];
    match head {
        ForHead::VarDecl(var_decl) if var_decl.kind != VarDeclKind::Var => {
            for declarator in &var_decl.decls {
                pat_names(&declarator.name, &mut names);
            }
        }
        ForHead::UsingDecl(using_decl) => {
            for declarator in &using_decl.decls {
                pat_names(&declarator.name, &mut names);
            }
        }
        _ => {}
    }
    names.into_iter().collect()
}
