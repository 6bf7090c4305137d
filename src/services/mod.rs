/// Presenter operations: open, close, advance and reset.
pub mod admin_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Public service for read-only room information.
pub mod public_service;
/// Participant operations: join, answer and results.
pub mod session_service;
/// Leaderboard ordering.
pub mod standings;
/// Storage connection supervisor with backoff.
pub mod storage_supervisor;
