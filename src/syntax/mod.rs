pub mod lexer;
pub mod parser;
pub mod token;

pub use parser::parse;
pub use token::{LuaToken, LuaTokenKind, TokenSpan};
