pub mod operator;
pub mod parser;

pub use operator::{Operator, TextArrayItem};
pub use parser::ContentParser;
