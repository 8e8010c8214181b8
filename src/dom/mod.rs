pub mod document;
pub mod dom_model;
pub mod mutation;
pub mod selector;
