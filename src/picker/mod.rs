pub mod picker_model;
pub mod session;
