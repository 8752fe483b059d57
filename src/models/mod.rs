pub mod event;
pub mod plan;
