use tracing_subscriber::{fmt, EnvFilter};

use crate::ast::JsAst;
use crate::config::ShakeConfig;
use crate::shake::{ShakeStats, TreeShaker};

pub fn setup_logger() {
    let _result = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Parses and prints `code`, so expectations compare with printer output.
pub fn normalize(code: &str) -> String {
    JsAst::build("expected.js", code)
        .unwrap()
        .generate()
        .unwrap()
}

pub fn shake_code(code: &str) -> (String, ShakeStats) {
    shake_with(code, &ShakeConfig::default())
}

pub fn shake_with(code: &str, config: &ShakeConfig) -> (String, ShakeStats) {
    setup_logger();
    let mut ast = JsAst::build("test.js", code).unwrap();
    let mut shaker = TreeShaker::new(config).unwrap();
    shaker.shake(&mut ast.ast);
    (ast.generate().unwrap(), shaker.stats().clone())
}
