use std::fmt;

use anyhow::{anyhow, Result};
use swc_core::common::sync::Lrc;
use swc_core::common::{FileName, Globals, SourceMap, Spanned, GLOBALS};
use swc_core::ecma::ast::{EsVersion, Module};
use swc_core::ecma::codegen::text_writer::JsWriter;
use swc_core::ecma::codegen::{Config as JsCodegenConfig, Emitter};
use swc_core::ecma::parser::error::SyntaxError;
use swc_core::ecma::parser::lexer::Lexer;
use swc_core::ecma::parser::{Parser, StringInput, Syntax};
use swc_core::ecma::transforms::base::fixer::fixer;
use swc_core::ecma::visit::VisitMutWith;

use crate::ast::error;

/// A parsed script-hoisted bundle together with the source map its spans
/// point into.
pub struct JsAst {
    pub ast: Module,
    cm: Lrc<SourceMap>,
    path: String,
}

impl fmt::Debug for JsAst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JsAst({})", self.path)
    }
}

impl JsAst {
    pub fn build(path: &str, content: &str) -> Result<Self> {
        let cm: Lrc<SourceMap> = Default::default();
        let fm = cm.new_source_file(
            FileName::Custom(path.to_string()).into(),
            content.to_string(),
        );
        let lexer = Lexer::new(
            Syntax::Es(Default::default()),
            EsVersion::latest(),
            StringInput::from(&*fm),
            None,
        );
        let mut parser = Parser::new_from(lexer);
        let ast = parser.parse_module();

        let mut ast_errors = parser.take_errors();
        // bundles are scripts, `with` is legal there
        ast_errors.retain(|error| !matches!(error.kind(), SyntaxError::WithInStrict));
        match ast {
            Ok(ast) if ast_errors.is_empty() => Ok(JsAst {
                ast,
                cm,
                path: path.to_string(),
            }),
            result => {
                if let Err(err) = result {
                    ast_errors.push(err);
                }
                let messages = ast_errors
                    .iter()
                    .map(|err| {
                        let loc = cm.lookup_char_pos(err.span().lo);
                        format!(
                            "{}:{}:{}: {}",
                            path,
                            loc.line,
                            loc.col_display + 1,
                            err.kind().msg()
                        )
                    })
                    .collect::<Vec<_>>();
                Err(anyhow!(error::ParseError::JsParseError {
                    messages: messages.join("\n")
                }))
            }
        }
    }

    /// Prints the module. Parentheses that removals made necessary, such as
    /// around a function expression that now starts a statement, are
    /// restored on a copy first.
    pub fn generate(&self) -> Result<String> {
        let mut ast = self.ast.clone();
        GLOBALS.set(&Globals::new(), || {
            ast.visit_mut_with(&mut fixer(None));
        });

        let mut buf = vec![];
        {
            let mut emitter = Emitter {
                cfg: JsCodegenConfig::default(),
                cm: self.cm.clone(),
                comments: None,
                wr: Box::new(JsWriter::new(self.cm.clone(), "\n", &mut buf, None)),
            };
            emitter.emit_module(&ast).map_err(|err| {
                anyhow!(error::GenerateError::JsGenerateError {
                    message: err.to_string()
                })
            })?;
        }

        String::from_utf8(buf).map_err(|err| {
            anyhow!(error::GenerateError::JsGenerateError {
                message: err.to_string()
            })
        })
    }
}
