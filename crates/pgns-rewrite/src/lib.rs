pub mod namespace;
pub mod rewriter;

pub use namespace::Namespace;
pub use rewriter::add_namespace;
