pub mod error;
pub mod js_ast;

pub use self::js_ast::JsAst;
