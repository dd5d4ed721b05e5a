mod error;
mod fields;
mod imports;
mod resolver;

#[cfg(test)]
mod resolver_test;

pub use error::InternalError;
pub use fields::{Field, FieldSet};
pub use imports::{ImportResolver, NoImports};
pub use resolver::{NodeRef, Resolution, Resolver, defining_construct};
