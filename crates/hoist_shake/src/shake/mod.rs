//! Removes unused declarations and export namespaces from a scope-hoisted
//! bundle.
//!
//! Each iteration crawls the program scope, decides which bindings can go,
//! and removes them in one sweep. Removing a binding may leave others
//! unreferenced, so iterations repeat until one removes nothing.

mod export_bailout;
pub mod purity;
mod remover;

use anyhow::Result;
use regex::Regex;
use swc_core::ecma::ast::Module;
use tracing::{debug, info};

pub use self::export_bailout::RemovalAnalysis;
pub use self::remover::{PlannedRemoval, RemovalPlan};
use crate::config::ShakeConfig;
use crate::scope::{ScopeResolver, TopLevelResolver};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ShakeStats {
    pub iterations: usize,
    /// removed binding names, in removal order
    pub removed: Vec<String>,
}

enum State {
    Running,
    Done,
}

pub struct TreeShaker {
    resolver: Box<dyn ScopeResolver>,
    exports_re: Regex,
    strict_assignments: bool,
    stats: ShakeStats,
}

impl TreeShaker {
    pub fn new(config: &ShakeConfig) -> Result<Self> {
        let resolver =
            TopLevelResolver::new(config.wildcard_helper.clone(), config.strict_assignments);
        Self::with_resolver(config, Box::new(resolver))
    }

    pub fn with_resolver(config: &ShakeConfig, resolver: Box<dyn ScopeResolver>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            resolver,
            exports_re: config.exports_regex()?,
            strict_assignments: config.strict_assignments,
            stats: Default::default(),
        })
    }

    /// Statistics of the last [`TreeShaker::shake`] run.
    pub fn stats(&self) -> &ShakeStats {
        &self.stats
    }

    pub fn shake(&mut self, module: &mut Module) {
        self.stats = Default::default();

        let mut state = State::Running;
        while let State::Running = state {
            self.stats.iterations += 1;
            let removed = self.shake_once(module);
            debug!(
                "iteration {}: removed {} binding(s)",
                self.stats.iterations,
                removed.len()
            );

            state = if removed.is_empty() {
                State::Done
            } else {
                State::Running
            };
            self.stats.removed.extend(removed);
        }

        info!(
            "tree shaking done in {} iteration(s), removed {} binding(s)",
            self.stats.iterations,
            self.stats.removed.len()
        );
    }

    fn shake_once(&self, module: &mut Module) -> Vec<String> {
        let mut scope = self.resolver.crawl(module);
        let names = scope.binding_names();

        let approved = {
            let mut analysis =
                RemovalAnalysis::new(&scope, &self.exports_re, self.strict_assignments);
            names
                .into_iter()
                .filter(|name| analysis.is_removable(name))
                .collect::<Vec<_>>()
        };

        let mut plan = RemovalPlan::new();
        for name in &approved {
            plan.schedule(&mut scope, name);
        }
        if plan.is_empty() {
            return vec![];
        }

        plan.validate(module);
        plan.apply(module)
    }
}

/// Shakes `module` with `config` and returns what was removed.
pub fn tree_shake(module: &mut Module, config: &ShakeConfig) -> Result<ShakeStats> {
    let mut shaker = TreeShaker::new(config)?;
    shaker.shake(module);
    Ok(shaker.stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helper::{normalize, shake_code, shake_with};

    #[test]
    fn test_pure_chain_converges() {
        let (code, stats) = shake_code("var a = 1; var b = a + 1;");
        assert_eq!(code, "");
        assert_eq!(stats.removed, vec!["b", "a"]);
        assert_eq!(stats.iterations, 3);
    }

    #[test]
    fn test_unused_export_namespace() {
        let (code, stats) = shake_code("var $0$exports = {}; $0$exports.x = 5;");
        assert_eq!(code, "");
        assert_eq!(stats.removed, vec!["$0$exports"]);
    }

    #[test]
    fn test_read_namespace_is_kept() {
        let input = "var $0$exports = {}; $0$exports.x = 5; use($0$exports);";
        let (code, stats) = shake_code(input);
        assert_eq!(code, normalize(input));
        assert!(stats.removed.is_empty());
        assert_eq!(stats.iterations, 1);
    }

    #[test]
    fn test_used_wildcard_keeps_both() {
        let input = r#"
var $0$exports = {};
var $1$exports = $parcel$exportWildcard({}, $0$exports);
use($1$exports);
"#;
        let (code, _) = shake_code(input);
        assert_eq!(code, normalize(input));
    }

    #[test]
    fn test_unused_wildcard_removes_both() {
        let (code, stats) = shake_code(
            r#"
var $0$exports = {};
$0$exports.a = 1;
var $1$exports = $parcel$exportWildcard({}, $0$exports);
$1$exports.b = 2;
"#,
        );
        assert_eq!(code, "");
        assert_eq!(stats.removed, vec!["$0$exports", "$1$exports"]);
        assert_eq!(stats.iterations, 2);
    }

    #[test]
    fn test_assigned_values_are_released() {
        let (code, _) = shake_code(
            r#"
var value = 1;
function helper() { return value; }
var $0$exports = {};
$0$exports.helper = helper;
$0$exports.value = value;
"#,
        );
        assert_eq!(code, "");
    }

    #[test]
    fn test_side_effects_are_kept() {
        let input = r#"
var a = init();
var b = obj.prop;
var c = undeclared + 1;
sideEffect();
"#;
        let (code, stats) = shake_code(input);
        assert_eq!(code, normalize(input));
        assert!(stats.removed.is_empty());
    }

    #[test]
    fn test_strict_assignments_keep_effectful_values() {
        let input = "var $0$exports = {}; $0$exports.x = compute(); $0$exports.y = 1;";
        let config = ShakeConfig {
            strict_assignments: true,
            ..Default::default()
        };
        let (code, stats) = shake_with(input, &config);
        assert_eq!(code, normalize(input));
        assert!(stats.removed.is_empty());

        let (code, _) = shake_code(input);
        assert_eq!(code, "");
    }

    #[test]
    fn test_custom_conventions() {
        let config = ShakeConfig::from_json_str(
            r#"{ "exportsPattern": "^ns_\\d+$", "wildcardHelper": "merge" }"#,
        )
        .unwrap();
        let (code, stats) = shake_with(
            "var ns_0 = {}; ns_0.a = 1; var ns_1 = merge({}, ns_0); var $0$exports = {}; $0$exports.a = 1;",
            &config,
        );
        assert_eq!(code, normalize("var $0$exports = {}; $0$exports.a = 1;"));
        assert_eq!(stats.removed, vec!["ns_0", "ns_1"]);
    }

    #[test]
    fn test_invalid_config_fails_before_shaking() {
        let config = ShakeConfig {
            exports_pattern: "[".to_string(),
            ..Default::default()
        };
        assert!(TreeShaker::new(&config).is_err());
    }
}
