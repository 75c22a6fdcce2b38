//! Credential verification boundary.
//!
//! Authentication and session issuance live outside this system. The
//! server only consumes the issuer's verification side: map a bearer
//! credential to the user it was issued to, or reject it.

use uuid::Uuid;

/// Verification side of the external token issuer
pub trait TokenIssuer: Send + Sync {
    /// Resolve a bearer credential to a user id; `None` rejects the call
    fn verify(&self, bearer: &str) -> Option<Uuid>;
}

/// Stand-in verifier accepting any well-formed opaque token
///
/// The token value doubles as the user id, matching what the external
/// issuer hands out for load runs. A production deployment plugs a real
/// issuer-backed implementation in here.
pub struct OpaqueTokenIssuer;

impl TokenIssuer for OpaqueTokenIssuer {
    fn verify(&self, bearer: &str) -> Option<Uuid> {
        Uuid::parse_str(bearer.trim()).ok()
    }
}
