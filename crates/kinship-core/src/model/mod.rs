//! Static type metadata consumed by association builders and the cascade.

pub mod entity;

pub use entity::EntityModel;
