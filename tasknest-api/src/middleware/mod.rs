/// Middleware modules for the API server
///
/// - `security`: security response headers
///
/// Session authentication (`require_session`) lives in
/// `tasknest_shared::auth::middleware` next to the identity types it produces.

pub mod security;
