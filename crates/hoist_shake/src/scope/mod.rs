//! Program-scope bindings of a scope-hoisted bundle.
//!
//! A [`Scope`] is rebuilt from the tree on every crawl and discarded once the
//! removals it justified are applied. Nodes are addressed by handles that are
//! only meaningful for the unmodified tree the scope was crawled from.

mod declared_names;
mod resolver;

use indexmap::IndexMap;
use swc_core::ecma::ast::Module;

pub use self::declared_names::{lexical_names, pat_names, var_hoisted_names};
pub use self::resolver::TopLevelResolver;

/// Derives the program-scope bindings of a module.
pub trait ScopeResolver {
    fn crawl(&self, module: &Module) -> Scope;
}

/// Pre-order index of an assignment expression among all assignment
/// expressions of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssignId(pub u32);

/// An assignment expression holding an occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignSite {
    pub id: AssignId,
    /// the value of the assignment is never used, so the expression can be
    /// dropped without repairing its parent
    pub discarded: bool,
    /// the assigned value (and computed member key) is side-effect free
    pub value_pure: bool,
}

impl AssignSite {
    pub fn unlinkable(&self, strict_assignments: bool) -> bool {
        self.discarded && (!strict_assignments || self.value_pure)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Occurrence {
    /// any read that matches none of the shapes below
    Reference,
    /// `x.p = v` or `x[k] = v`, where `x` is the binding
    PropertyAccessObject(AssignSite),
    /// `var target = helper(a, x)`
    WildcardArgument { target: String },
    /// `x = v`
    BareAssignment(AssignSite),
    /// `x++`, `[x] = v`, `for (x in o)`
    OtherWrite,
}

impl Occurrence {
    pub fn is_constant_violation(&self) -> bool {
        matches!(self, Occurrence::BareAssignment(_) | Occurrence::OtherWrite)
    }
}

/// Pre-order index of a variable declarator among all declarators of a
/// module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclaratorId(pub u32);

/// Where a binding is introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declaration {
    /// identifier declarator of a `var`, `let` or `const` statement that sits
    /// in a statement list or a `for` init
    Declarator(DeclaratorId),
    /// function declaration at module item `item`
    Function { item: usize },
    Class { item: usize },
    /// destructuring, `for-in/of` heads, imports, exports and anything else
    /// that cannot be deleted on its own
    Opaque,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclSite {
    pub declaration: Declaration,
    /// declaring the binding has no observable effect
    pub pure: bool,
}

impl DeclSite {
    pub fn opaque() -> Self {
        Self {
            declaration: Declaration::Opaque,
            pure: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    /// one entry per declaration, a name may be declared more than once
    pub declarations: Vec<DeclSite>,
    pub references: Vec<Occurrence>,
    pub constant_violations: Vec<Occurrence>,
}

impl Binding {
    pub fn new(name: String) -> Self {
        Self {
            name,
            declarations: vec![],
            references: vec![],
            constant_violations: vec![],
        }
    }

    pub fn referenced(&self) -> bool {
        !self.references.is_empty()
    }

    pub fn occurrences(&self) -> impl Iterator<Item = &Occurrence> {
        self.references.iter().chain(self.constant_violations.iter())
    }

    /// Every declaration can be deleted from the tree.
    pub fn has_removable_declarations(&self) -> bool {
        !self.declarations.is_empty()
            && self
                .declarations
                .iter()
                .all(|site| site.declaration != Declaration::Opaque)
    }
}

#[derive(Debug, Default)]
pub struct Scope {
    bindings: IndexMap<String, Binding>,
}

impl Scope {
    pub fn from_bindings(bindings: impl IntoIterator<Item = Binding>) -> Self {
        Self {
            bindings: bindings
                .into_iter()
                .map(|binding| (binding.name.clone(), binding))
                .collect(),
        }
    }

    /// Names in declaration order.
    pub fn binding_names(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect()
    }

    pub fn get_binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// Deregisters `name`. Nothing inserts into a crawled scope, so a removed
    /// name stays unknown to it.
    pub fn remove_binding(&mut self, name: &str) -> Option<Binding> {
        self.bindings.shift_remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(declaration: Declaration) -> DeclSite {
        DeclSite {
            declaration,
            pure: true,
        }
    }

    #[test]
    fn removed_binding_is_not_found_again() {
        let mut scope = Scope::from_bindings([
            Binding::new("a".to_string()),
            Binding::new("b".to_string()),
        ]);

        assert!(scope.remove_binding("a").is_some());
        assert!(scope.get_binding("a").is_none());
        assert!(scope.remove_binding("a").is_none());
        assert_eq!(scope.binding_names(), vec!["b".to_string()]);
    }

    #[test]
    fn removable_declarations_need_handles() {
        let mut binding = Binding::new("a".to_string());
        assert!(!binding.has_removable_declarations());

        binding
            .declarations
            .push(site(Declaration::Declarator(DeclaratorId(0))));
        binding.declarations.push(site(Declaration::Function { item: 2 }));
        assert!(binding.has_removable_declarations());

        binding.declarations.push(DeclSite::opaque());
        assert!(!binding.has_removable_declarations());
    }
}
