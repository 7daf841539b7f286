use swc_core::ecma::ast::{
    BinaryOp, Class, ClassMember, Expr, ExprOrSpread, Prop, PropName, PropOrSpread, UnaryOp,
};

use crate::scope::Binding;

/// Whether a never-read binding can be dropped together with its
/// declarations without any further checks.
pub fn is_pure_binding(binding: &Binding) -> bool {
    !binding.referenced()
        && binding.has_removable_declarations()
        && binding.declarations.iter().all(|site| site.pure)
}

/// Whether declaring a variable with `init` is unobservable. A bare
/// identifier or `this` is accepted as is.
pub fn is_pure_init(init: Option<&Expr>, is_bound: &dyn Fn(&str) -> bool) -> bool {
    match init {
        None => true,
        Some(Expr::Ident(_) | Expr::This(_)) => true,
        Some(init) => is_pure_expr(init, is_bound),
    }
}

/// Whether evaluating `expr` and discarding the result is unobservable.
///
/// `is_bound` tells whether an identifier resolves to a declared binding;
/// reading an undeclared global may throw.
pub fn is_pure_expr(expr: &Expr, is_bound: &dyn Fn(&str) -> bool) -> bool {
    match expr {
        Expr::Lit(_) | Expr::Fn(_) | Expr::Arrow(_) => true,
        Expr::Ident(ident) => is_bound(&ident.sym),
        Expr::Paren(paren) => is_pure_expr(&paren.expr, is_bound),
        Expr::Tpl(tpl) => tpl.exprs.iter().all(|expr| is_pure_expr(expr, is_bound)),
        Expr::Array(array) => array.elems.iter().all(|elem| match elem {
            None => true,
            Some(ExprOrSpread { spread: None, expr }) => is_pure_expr(expr, is_bound),
            Some(_) => false,
        }),
        Expr::Object(object) => object.props.iter().all(|prop| match prop {
            PropOrSpread::Prop(prop) => match &**prop {
                Prop::Shorthand(ident) => is_bound(&ident.sym),
                Prop::KeyValue(kv) => {
                    is_pure_prop_name(&kv.key, is_bound) && is_pure_expr(&kv.value, is_bound)
                }
                Prop::Getter(getter) => is_pure_prop_name(&getter.key, is_bound),
                Prop::Setter(setter) => is_pure_prop_name(&setter.key, is_bound),
                Prop::Method(method) => is_pure_prop_name(&method.key, is_bound),
                Prop::Assign(_) => false,
            },
            PropOrSpread::Spread(_) => false,
        }),
        Expr::Class(class_expr) => is_pure_class(&class_expr.class, is_bound),
        Expr::Unary(unary) => unary.op != UnaryOp::Delete && is_pure_expr(&unary.arg, is_bound),
        Expr::Bin(bin) => {
            !matches!(bin.op, BinaryOp::In | BinaryOp::InstanceOf)
                && is_pure_expr(&bin.left, is_bound)
                && is_pure_expr(&bin.right, is_bound)
        }
        _ => false,
    }
}

fn is_pure_prop_name(key: &PropName, is_bound: &dyn Fn(&str) -> bool) -> bool {
    match key {
        PropName::Computed(computed) => is_pure_expr(&computed.expr, is_bound),
        _ => true,
    }
}

/// Defining a class runs its super class expression, computed keys, static
/// initializers and decorators; nothing else.
pub fn is_pure_class(class: &Class, is_bound: &dyn Fn(&str) -> bool) -> bool {
    if !class.decorators.is_empty() {
        return false;
    }
    if let Some(super_class) = &class.super_class {
        if !is_pure_expr(super_class, is_bound) {
            return false;
        }
    }

    class.body.iter().all(|member| match member {
        ClassMember::Constructor(_) | ClassMember::PrivateMethod(_) | ClassMember::Empty(_) => {
            true
        }
        ClassMember::Method(method) => is_pure_prop_name(&method.key, is_bound),
        ClassMember::ClassProp(prop) => {
            prop.decorators.is_empty()
                && is_pure_prop_name(&prop.key, is_bound)
                && (!prop.is_static
                    || prop
                        .value
                        .as_deref()
                        .map_or(true, |value| is_pure_expr(value, is_bound)))
        }
        ClassMember::PrivateProp(prop) => {
            prop.decorators.is_empty()
                && (!prop.is_static
                    || prop
                        .value
                        .as_deref()
                        .map_or(true, |value| is_pure_expr(value, is_bound)))
        }
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use swc_core::ecma::ast::{Decl, ModuleItem, Stmt};

    use super::*;
    use crate::ast::JsAst;
    use crate::scope::{ScopeResolver, TopLevelResolver};

    fn init_is_pure(init: &str) -> bool {
        let ast = JsAst::build("test.js", &format!("var bound = 1; var v = {init};")).unwrap();
        let ModuleItem::Stmt(Stmt::Decl(Decl::Var(var_decl))) = &ast.ast.body[1] else {
            panic!("not a var decl");
        };
        let init = var_decl.decls[0].init.as_deref().unwrap();
        is_pure_expr(init, &|name| name == "bound")
    }

    fn removable_unread(code: &str, name: &str) -> bool {
        let ast = JsAst::build("test.js", code).unwrap();
        let scope = TopLevelResolver::new("$parcel$exportWildcard", false).crawl(&ast.ast);
        is_pure_binding(scope.get_binding(name).unwrap())
    }

    #[test]
    fn test_pure_literals_and_compounds() {
        for init in [
            "1",
            "'s'",
            "null",
            "/re/g",
            "10n",
            "`a${bound}b`",
            "[1, , bound]",
            "{ a: 1, [bound]: 2, bound, get x() { return y; }, m() {} }",
            "function () { sideEffect(); }",
            "() => sideEffect()",
            "!bound",
            "typeof bound",
            "bound + 1 * 2",
            "bound && (1 || 2)",
            "class { method() {} prop = sideEffect(); static s = 1; }",
        ] {
            assert!(init_is_pure(init), "{init}");
        }
    }

    #[test]
    fn test_impure_expressions() {
        for init in [
            "unbound",
            "call()",
            "new Foo()",
            "obj.prop",
            "[...bound]",
            "{ ...bound }",
            "{ [key()]: 1 }",
            "delete bound.x",
            "'x' in bound",
            "bound instanceof Foo",
            "(1, 2)",
            "bound ? 1 : 2",
            "tag`x`",
            "bound = 1",
            "class extends Base {}",
            "class { static s = sideEffect(); }",
            "class { static { sideEffect(); } }",
            "class { [key()]() {} }",
        ] {
            assert!(!init_is_pure(init), "{init}");
        }
    }

    #[test]
    fn test_top_level_initializer_shapes() {
        assert!(removable_unread("var a = undeclared;", "a"));
        assert!(removable_unread("var a = this;", "a"));
        assert!(removable_unread("var a;", "a"));
        assert!(removable_unread("var a = 1; var b = a + 1;", "b"));
        assert!(!removable_unread("var a = undeclared + 1;", "a"));
        assert!(!removable_unread("var a = foo();", "a"));
    }

    #[test]
    fn test_declaration_forms() {
        assert!(removable_unread("function f() { sideEffect(); }", "f"));
        assert!(removable_unread("class A { static x = 1; }", "A"));
        assert!(!removable_unread("class A { static x = sideEffect(); }", "A"));
        assert!(!removable_unread("var { a } = obj;", "a"));
        assert!(removable_unread("var a = 1; if (c) { var a; }", "a"));
        assert!(!removable_unread("var a = 1; var a = foo();", "a"));
        assert!(!removable_unread("var a = 1; for (var a in o) {}", "a"));
    }

    #[test]
    fn test_referenced_binding_is_not_pure() {
        assert!(!removable_unread("var a = 1; use(a);", "a"));
    }
}
