mod annotate;
mod env;
mod error;
mod locate;
mod node;
mod parser;

#[cfg(test)]
mod locate_test;
#[cfg(test)]
mod parser_test;

pub use annotate::annotate;
pub use env::{BindingSite, Env};
pub use error::StaticError;
pub use locate::{FindFailure, locate};
pub use node::*;
pub use parser::{Parser, parse, parse_source};
