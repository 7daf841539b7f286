use std::collections::HashSet;

use swc_core::ecma::ast::{
    ArrowExpr, Class, Constructor, Decl, Function, GetterProp, ObjectPatProp, Pat, SetterProp,
    StaticBlock, Stmt, VarDecl, VarDeclKind,
};
use swc_core::ecma::visit::{Visit, VisitWith};

/// Names bound by a pattern, in source order.
pub fn pat_names(pat: &Pat, names: &mut Vec<String>) {
    match pat {
        Pat::Ident(ident) => names.push(ident.id.sym.to_string()),
        Pat::Array(array) => {
            for elem in array.elems.iter().flatten() {
                pat_names(elem, names);
            }
        }
        Pat::Object(object) => {
            for prop in &object.props {
                match prop {
                    ObjectPatProp::KeyValue(kv) => pat_names(&kv.value, names),
                    ObjectPatProp::Assign(assign) => names.push(assign.key.id.sym.to_string()),
                    ObjectPatProp::Rest(rest) => pat_names(&rest.arg, names),
                }
            }
        }
        Pat::Rest(rest) => pat_names(&rest.arg, names),
        Pat::Assign(assign) => pat_names(&assign.left, names),
        _ => {}
    }
}

/// Block scoped names declared directly in a statement list.
pub fn lexical_names<'a>(stmts: impl IntoIterator<Item = &'a Stmt>) -> HashSet<String> {
    let mut names = vec![];
    for stmt in stmts {
        if let Stmt::Decl(decl) = stmt {
            match decl {
                Decl::Var(var_decl) if var_decl.kind != VarDeclKind::Var => {
                    for declarator in &var_decl.decls {
                        pat_names(&declarator.name, &mut names);
                    }
                }
                Decl::Using(using_decl) => {
                    for declarator in &using_decl.decls {
                        pat_names(&declarator.name, &mut names);
                    }
                }
                Decl::Fn(fn_decl) => names.push(fn_decl.ident.sym.to_string()),
                Decl::Class(class_decl) => names.push(class_decl.ident.sym.to_string()),
                _ => {}
            }
        }
    }
    names.into_iter().collect()
}

/// `var` names hoisted to the function (or program) scope enclosing `node`.
pub fn var_hoisted_names<N: VisitWith<VarHoistCollector>>(node: &N) -> HashSet<String> {
    let mut collector = VarHoistCollector::default();
    node.visit_with(&mut collector);
    collector.names.into_iter().collect()
}

/// Collects `var` declarations without entering nested function scopes.
#[derive(Default)]
pub struct VarHoistCollector {
    pub names: Vec<String>,
}

impl Visit for VarHoistCollector {
    fn visit_var_decl(&mut self, var_decl: &VarDecl) {
        if var_decl.kind == VarDeclKind::Var {
            for declarator in &var_decl.decls {
                pat_names(&declarator.name, &mut self.names);
            }
        }
    }

    fn visit_function(&mut self, _: &Function) {}

    fn visit_arrow_expr(&mut self, _: &ArrowExpr) {}

    fn visit_class(&mut self, _: &Class) {}

    fn visit_constructor(&mut self, _: &Constructor) {}

    fn visit_getter_prop(&mut self, _: &GetterProp) {}

    fn visit_setter_prop(&mut self, _: &SetterProp) {}

    fn visit_static_block(&mut self, _: &StaticBlock) {}
}

#[cfg(test)]
mod tests {
    use swc_core::ecma::ast::{ModuleItem, Stmt};

    use super::*;
    use crate::ast::JsAst;

    fn stmts(code: &str) -> Vec<Stmt> {
        JsAst::build("test.js", code)
            .unwrap()
            .ast
            .body
            .into_iter()
            .filter_map(|item| match item {
                ModuleItem::Stmt(stmt) => Some(stmt),
                _ => None,
            })
            .collect()
    }

    fn sorted(names: HashSet<String>) -> Vec<String> {
        let mut names = names.into_iter().collect::<Vec<_>>();
        names.sort();
        names
    }

    #[test]
    fn test_pat_names_destructuring() {
        let stmts = stmts("var { a, b: [c, ...d], e = 1, ...f } = obj;");
        let Stmt::Decl(Decl::Var(var_decl)) = &stmts[0] else {
            panic!("not a var decl")
        };
        let mut names = vec![];
        pat_names(&var_decl.decls[0].name, &mut names);
        assert_eq!(names, vec!["a", "c", "d", "e", "f"]);
    }

    #[test]
    fn test_lexical_names_skip_var() {
        let stmts = stmts("var a; let b; const c = 1; function d() {} class e {}");
        assert_eq!(sorted(lexical_names(&stmts)), vec!["b", "c", "d", "e"]);
    }

    #[test]
    fn test_var_hoisted_names_stop_at_functions() {
        let stmts = stmts(
            r#"
if (x) { var a = 1; for (var b in o) {} }
function f() { var inner; }
var g = () => { var inner2; };
let c;
"#,
        );
        let mut names = HashSet::new();
        for stmt in &stmts {
            names.extend(var_hoisted_names(stmt));
        }
        assert_eq!(sorted(names), vec!["a", "b", "g"]);
    }
}
