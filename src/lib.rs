//! Compiler for VNS visual-novel scripts: indentation-scoped source text in, a compact
//! stack-machine bytecode artifact plus its translation table out.

pub mod artifact;
pub mod ast;
pub mod bytecode;
pub mod config;
pub mod encoding;
pub mod error;
pub mod generator;
pub mod lexer;
pub mod parser;
pub mod source;
pub mod token;
pub mod translation;
pub mod writer;

pub use artifact::Artifact;
pub use ast::Expression;
pub use error::{CompileError, FormatError};
pub use generator::CompiledScript;
pub use source::{Identifier, SourcePosition};
pub use token::Token;
pub use translation::{MergeReport, TranslationTable};

use generator::BytecodeGenerator;
use lexer::Lexer;
use parser::Parser;

pub fn lex(source: &str, identifier: &Identifier) -> Result<Vec<Token>, CompileError> {
    Lexer::new(source, identifier).tokenize()
}

pub fn parse(tokens: Vec<Token>, identifier: &Identifier) -> Result<Expression, CompileError> {
    Parser::new(tokens, identifier).parse()
}

pub fn generate(ast: &Expression, identifier: &Identifier) -> Result<CompiledScript, CompileError> {
    BytecodeGenerator::new(identifier).generate(ast)
}

/// Runs the whole pipeline on one source file. The first error aborts the compile.
pub fn compile(source: &str, identifier: &Identifier) -> Result<CompiledScript, CompileError> {
    let tokens = lex(source, identifier)?;
    let ast = parse(tokens, identifier)?;
    generate(&ast, identifier)
}
