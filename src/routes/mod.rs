/// Router Module Index
///
/// Splits the service's routes by access requirement. Access control is applied per module,
/// so a handler cannot end up exposed on the wrong side by accident.

/// Routes reachable without a session: health, the access gate itself, and login.
pub mod public;

/// Routes that require a resolved session (`SessionUser`).
pub mod authenticated;
