/// Fixed scratch paths.
pub mod layout;
/// Atomic, permission-restricted source writes.
pub mod materialize;
