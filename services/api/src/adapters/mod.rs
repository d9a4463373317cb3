pub mod catalog;
pub mod responder;

pub use catalog::MockCatalogAdapter;
pub use responder::TemplateResponder;
