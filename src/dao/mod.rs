/// Database model definitions.
pub mod models;
/// Quiz store persistence backends.
pub mod quiz_repository;
/// Storage error types shared by every backend.
pub mod storage;
