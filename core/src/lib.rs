pub mod ast;
pub mod resolve;
pub mod token;
