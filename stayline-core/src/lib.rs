pub mod booking;
pub mod counter;
pub mod governor;
pub mod identity;
pub mod notify;
pub mod payment;
pub mod pii;
pub mod repository;

/// Error type used at the port boundaries. Concrete stores and queues carry
/// their own error types; callers only need Display and source chains.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
