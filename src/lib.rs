pub mod error;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod surface;

pub use error::Error;
pub use parser::check;
pub use runtime::{FinalState, Interpreter};
pub use surface::{Color, Op, RecordingSurface, Surface};
