mod ast;
mod error;
mod lexer;
mod parser;
pub mod program;
