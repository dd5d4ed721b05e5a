mod lexer;
mod span;
#[cfg(test)]
mod token_test;

pub use lexer::*;
pub use span::*;
