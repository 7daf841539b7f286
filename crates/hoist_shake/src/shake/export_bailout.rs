use std::collections::{HashMap, HashSet};

use regex::Regex;
use tracing::debug;

use super::purity::is_pure_binding;
use crate::scope::{Binding, Occurrence, Scope};

/// Decides which bindings of one crawl can be removed.
///
/// A binding is removable when it is pure, or when it names an export
/// namespace whose every reference either writes a property
/// (`$0$exports.x = v`) or feeds a wildcard merge whose result is itself
/// removable. Verdicts are memoized for the lifetime of the analysis, which
/// must not outlive the crawl it was built from.
pub struct RemovalAnalysis<'a> {
    scope: &'a Scope,
    exports_re: &'a Regex,
    strict_assignments: bool,
    verdicts: HashMap<String, bool>,
    in_progress: HashSet<String>,
}

impl<'a> RemovalAnalysis<'a> {
    pub fn new(scope: &'a Scope, exports_re: &'a Regex, strict_assignments: bool) -> Self {
        Self {
            scope,
            exports_re,
            strict_assignments,
            verdicts: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    pub fn is_removable(&mut self, name: &str) -> bool {
        if let Some(verdict) = self.verdicts.get(name) {
            return *verdict;
        }
        // a wildcard cycle back to a binding under evaluation; treat it as
        // a real use
        if self.in_progress.contains(name) {
            return false;
        }
        let scope = self.scope;
        let Some(binding) = scope.get_binding(name) else {
            return false;
        };

        self.in_progress.insert(name.to_string());
        let verdict = self.check(binding);
        self.in_progress.remove(name);

        self.verdicts.insert(name.to_string(), verdict);
        verdict
    }

    fn check(&mut self, binding: &'a Binding) -> bool {
        // a declaration that cannot be deleted keeps the binding
        if !binding.has_removable_declarations() {
            return false;
        }

        // writes never keep a binding alive, but they must go with it
        for violation in &binding.constant_violations {
            if !self.can_unlink_write(violation) {
                debug!("keep {}: write that cannot be unlinked", binding.name);
                return false;
            }
        }

        if is_pure_binding(binding) {
            return true;
        }

        if !self.exports_re.is_match(&binding.name) {
            return false;
        }

        for reference in &binding.references {
            let unused = match reference {
                Occurrence::PropertyAccessObject(site) => {
                    site.unlinkable(self.strict_assignments)
                }
                Occurrence::WildcardArgument { target } => self.is_removable(target),
                _ => false,
            };
            if !unused {
                return false;
            }
        }
        true
    }

    fn can_unlink_write(&self, occurrence: &Occurrence) -> bool {
        match occurrence {
            Occurrence::BareAssignment(site) => site.unlinkable(self.strict_assignments),
            _ => false,
        }
    }
}
