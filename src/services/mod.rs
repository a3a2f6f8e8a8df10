/// Confirmation-gated announcement delivery.
pub mod announce;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Read-only public projections of the competition.
pub mod public_service;
/// Periodic phase scheduler.
pub mod scheduler;
/// Submission message validation.
pub mod submission;
/// Team registry.
pub mod teams;
/// Vote tally.
pub mod votes;
/// Winner determination and face-offs.
pub mod winner;
