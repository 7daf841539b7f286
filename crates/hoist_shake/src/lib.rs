pub mod ast;
pub mod config;
pub mod scope;
pub mod shake;
#[cfg(test)]
mod test_helper;

pub use crate::ast::JsAst;
pub use crate::config::ShakeConfig;
pub use crate::shake::{tree_shake, ShakeStats, TreeShaker};
