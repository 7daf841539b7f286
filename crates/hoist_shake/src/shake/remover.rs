use std::collections::HashSet;

use swc_core::common::util::take::Take;
use swc_core::ecma::ast::{
    AssignExpr, AssignTarget, Decl, Expr, ForStmt, Module, ModuleItem, Pat, SimpleAssignTarget,
    Stmt, VarDecl, VarDeclOrExpr, VarDeclarator,
};
use swc_core::ecma::visit::{Visit, VisitMut, VisitMutWith, VisitWith};
use tracing::{debug, warn};

use crate::scope::{AssignId, Declaration, DeclaratorId, Occurrence, Scope};

#[derive(Debug, Clone)]
pub struct PlannedRemoval {
    pub name: String,
    pub declarations: Vec<Declaration>,
    /// assignments writing to or through the binding
    pub assigns: Vec<AssignId>,
    /// bindings whose declarations hold a wildcard-merge occurrence of this
    /// one; they must be removed in the same sweep
    pub wildcard_targets: Vec<String>,
}

/// Bindings approved during one iteration, removed together in a single
/// sweep over the tree they were crawled from.
#[derive(Debug, Default)]
pub struct RemovalPlan {
    entries: Vec<PlannedRemoval>,
}

impl RemovalPlan {
    pub fn new() -> Self {
        Default::default()
    }

    /// Deregisters `name` from `scope` and records what has to be deleted
    /// with it. Returns false if the name is not (or no longer) bound.
    pub fn schedule(&mut self, scope: &mut Scope, name: &str) -> bool {
        let Some(binding) = scope.remove_binding(name) else {
            return false;
        };

        let mut assigns = vec![];
        let mut wildcard_targets = vec![];
        for occurrence in binding.occurrences() {
            match occurrence {
                Occurrence::PropertyAccessObject(site) | Occurrence::BareAssignment(site) => {
                    assigns.push(site.id)
                }
                Occurrence::WildcardArgument { target } => wildcard_targets.push(target.clone()),
                other => debug!("skip occurrence of {}: {:?}", name, other),
            }
        }

        self.entries.push(PlannedRemoval {
            declarations: binding
                .declarations
                .iter()
                .map(|site| site.declaration)
                .collect(),
            name: binding.name,
            assigns,
            wildcard_targets,
        });
        true
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry whose handles no longer match `module`, together
    /// with the entries that relied on a dropped one. Returns the dropped
    /// names.
    pub fn validate(&mut self, module: &Module) -> Vec<String> {
        let mut locator = SiteLocator::default();
        module.visit_with(&mut locator);

        let mut dropped = vec![];
        self.entries.retain(|entry| {
            let name = Some(entry.name.as_str());
            let declared = entry.declarations.iter().all(|declaration| match declaration {
                Declaration::Declarator(id) => locator
                    .declarator_names
                    .get(id.0 as usize)
                    .map_or(false, |found| found.as_deref() == name),
                Declaration::Function { item } | Declaration::Class { item } => {
                    module.body.get(*item).and_then(declared_name) == name
                }
                Declaration::Opaque => false,
            });
            let assigns_found = entry.assigns.iter().all(|id| {
                locator
                    .written_names
                    .get(id.0 as usize)
                    .map_or(false, |found| found.as_deref() == name)
            });
            if declared && assigns_found {
                true
            } else {
                warn!(
                    "removal of {} does not match the tree (declaration found: {}, assignments found: {})",
                    entry.name, declared, assigns_found
                );
                dropped.push(entry.name.clone());
                false
            }
        });

        // a wildcard occurrence is only unlinked by its target's removal
        loop {
            let planned = self
                .entries
                .iter()
                .map(|entry| entry.name.clone())
                .collect::<HashSet<_>>();
            let before = self.entries.len();
            self.entries.retain(|entry| {
                let keep = entry
                    .wildcard_targets
                    .iter()
                    .all(|target| planned.contains(target));
                if !keep {
                    warn!("drop removal of {}: wildcard target is kept", entry.name);
                    dropped.push(entry.name.clone());
                }
                keep
            });
            if self.entries.len() == before {
                break;
            }
        }

        dropped
    }

    /// Deletes every planned declaration and assignment. Returns the removed
    /// names in planning order.
    pub fn apply(self, module: &mut Module) -> Vec<String> {
        let mut sweeper = Sweeper::default();
        for entry in &self.entries {
            for declaration in &entry.declarations {
                match *declaration {
                    Declaration::Declarator(id) => {
                        sweeper.declarators.insert(id);
                    }
                    Declaration::Function { item } | Declaration::Class { item } => {
                        sweeper.items.insert(item);
                    }
                    Declaration::Opaque => {}
                }
            }
            sweeper.assigns.extend(entry.assigns.iter().copied());
        }

        module.visit_mut_with(&mut sweeper);

        for entry in &self.entries {
            debug!(
                "removed {} and {} assignment(s)",
                entry.name,
                entry.assigns.len()
            );
        }
        if sweeper.collapsed > 0 {
            debug!("collapsed {} sequence expression(s)", sweeper.collapsed);
        }

        self.entries.into_iter().map(|entry| entry.name).collect()
    }
}

/// Name written by each assignment expression and name declared by each
/// declarator, both in pre-order.
#[derive(Default)]
struct SiteLocator {
    written_names: Vec<Option<String>>,
    declarator_names: Vec<Option<String>>,
}

impl Visit for SiteLocator {
    fn visit_expr(&mut self, expr: &Expr) {
        if let Expr::Assign(assign) = expr {
            self.written_names.push(written_name(assign));
        }
        expr.visit_children_with(self);
    }

    fn visit_var_declarator(&mut self, declarator: &VarDeclarator) {
        self.declarator_names.push(match &declarator.name {
            Pat::Ident(ident) => Some(ident.id.sym.to_string()),
            _ => None,
        });
        declarator.visit_children_with(self);
    }
}

fn declared_name(item: &ModuleItem) -> Option<&str> {
    match item {
        ModuleItem::Stmt(Stmt::Decl(Decl::Fn(fn_decl))) => Some(&*fn_decl.ident.sym),
        ModuleItem::Stmt(Stmt::Decl(Decl::Class(class_decl))) => Some(&*class_decl.ident.sym),
        _ => None,
    }
}

fn written_name(assign: &AssignExpr) -> Option<String> {
    match &assign.left {
        AssignTarget::Simple(SimpleAssignTarget::Ident(ident)) => Some(ident.id.sym.to_string()),
        AssignTarget::Simple(SimpleAssignTarget::Member(member)) => match &*member.obj {
            Expr::Ident(obj) => Some(obj.sym.to_string()),
            _ => None,
        },
        _ => None,
    }
}

fn is_tombstone(expr: &Expr) -> bool {
    matches!(expr, Expr::Invalid(_))
}

fn is_tombstone_stmt(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Expr(expr_stmt) => is_tombstone(&expr_stmt.expr),
        Stmt::Decl(Decl::Var(var_decl)) => var_decl.decls.is_empty(),
        _ => false,
    }
}

/// Deleted assignments are first replaced by an invalid expression, which
/// the enclosing statement list, `for` header or sequence then drops.
/// Declarations left without declarators are dropped the same way.
#[derive(Default)]
struct Sweeper {
    declarators: HashSet<DeclaratorId>,
    items: HashSet<usize>,
    assigns: HashSet<AssignId>,
    next_assign: u32,
    next_declarator: u32,
    collapsed: usize,
}

impl Sweeper {
    fn sweep_item(&self, index: usize, item: &ModuleItem) -> bool {
        if self.items.contains(&index) {
            return true;
        }
        match item {
            ModuleItem::Stmt(stmt) => is_tombstone_stmt(stmt),
            ModuleItem::ModuleDecl(_) => false,
        }
    }
}

impl VisitMut for Sweeper {
    fn visit_mut_module_items(&mut self, items: &mut Vec<ModuleItem>) {
        let mut removed = vec![];
        for (index, item) in items.iter_mut().enumerate() {
            item.visit_mut_with(self);
            removed.push(self.sweep_item(index, item));
        }
        let mut removed = removed.into_iter();
        items.retain(|_| !removed.next().unwrap_or(false));
    }

    fn visit_mut_stmts(&mut self, stmts: &mut Vec<Stmt>) {
        stmts.visit_mut_children_with(self);
        stmts.retain(|stmt| !is_tombstone_stmt(stmt));
    }

    fn visit_mut_var_decl(&mut self, var_decl: &mut VarDecl) {
        let mut removed = vec![];
        for declarator in var_decl.decls.iter_mut() {
            let id = DeclaratorId(self.next_declarator);
            declarator.visit_mut_with(self);
            removed.push(self.declarators.contains(&id));
        }
        let mut removed = removed.into_iter();
        var_decl.decls.retain(|_| !removed.next().unwrap_or(false));
    }

    fn visit_mut_var_declarator(&mut self, declarator: &mut VarDeclarator) {
        self.next_declarator += 1;
        declarator.visit_mut_children_with(self);
    }

    fn visit_mut_for_stmt(&mut self, for_stmt: &mut ForStmt) {
        for_stmt.visit_mut_children_with(self);
        match &for_stmt.init {
            Some(VarDeclOrExpr::Expr(init)) if is_tombstone(init) => for_stmt.init = None,
            Some(VarDeclOrExpr::VarDecl(var_decl)) if var_decl.decls.is_empty() => {
                for_stmt.init = None
            }
            _ => {}
        }
        if matches!(&for_stmt.update, Some(update) if is_tombstone(update)) {
            for_stmt.update = None;
        }
    }

    fn visit_mut_expr(&mut self, expr: &mut Expr) {
        if let Expr::Assign(_) = expr {
            let id = AssignId(self.next_assign);
            self.next_assign += 1;
            expr.visit_mut_children_with(self);
            if self.assigns.contains(&id) {
                expr.take();
            }
            return;
        }

        expr.visit_mut_children_with(self);

        let replacement = match expr {
            Expr::Paren(paren) if is_tombstone(&paren.expr) => Some(Expr::dummy()),
            Expr::Seq(seq) => {
                let len = seq.exprs.len();
                seq.exprs.retain(|elem| !is_tombstone(elem));
                match seq.exprs.len() {
                    0 => Some(Expr::dummy()),
                    1 if len > 1 => seq.exprs.pop().map(|last| *last),
                    _ => None,
                }
            }
            _ => None,
        };
        if let Some(replacement) = replacement {
            if matches!(expr, Expr::Seq(_)) {
                self.collapsed += 1;
            }
            *expr = replacement;
        }
    }
}
