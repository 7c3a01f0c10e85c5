/// Quiz generation backends.
pub mod generator;
/// Score histogram plotting.
pub mod plot;
/// Session orchestration over the state machine.
pub mod session_service;
/// Store write retries with exponential backoff.
pub mod storage_supervisor;
