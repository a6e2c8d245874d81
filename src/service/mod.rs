//! Core operations: referential validation, cascade deletion and the generic CRUD service.

mod cascade;
mod crud;
mod validation;
pub use cascade::DeletionPlan;
pub use crud::CrudService;
pub use validation::ReferenceValidator;
