use std::fmt::{self, Display};

/// The kind of error that occurred while searching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The query was rejected before it was sent (e.g. empty).
    InvalidQuery,
    /// The search service could not be reached.
    Network,
    /// The search service is temporarily out of order.
    Unavailable,
    /// The search did not finish in time.
    Timeout,
    /// The credential was missing, invalid or lacks permission.
    Unauthorized,
    /// Too many requests in a short period.
    RateLimited,
    /// The account ran out of quota or credits.
    QuotaExceeded,
    /// The service answered with something that cannot be decoded.
    MalformedResponse,
    /// Any other errors.
    Other,
}

impl ErrorKind {
    /// Returns `true` if the same search may succeed when sent again later.
    #[inline]
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            ErrorKind::Network
                | ErrorKind::Unavailable
                | ErrorKind::Timeout
                | ErrorKind::RateLimited
        )
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidQuery => "invalid query",
            ErrorKind::Network => "network error",
            ErrorKind::Unavailable => "service unavailable",
            ErrorKind::Timeout => "timed out",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::RateLimited => "rate limited",
            ErrorKind::QuotaExceeded => "quota exceeded",
            ErrorKind::MalformedResponse => "malformed response",
            ErrorKind::Other => "search failed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_kinds() {
        assert!(ErrorKind::Network.is_transient());
        assert!(ErrorKind::Unavailable.is_transient());
        assert!(ErrorKind::Timeout.is_transient());
        assert!(ErrorKind::RateLimited.is_transient());
        assert!(!ErrorKind::Unauthorized.is_transient());
        assert!(!ErrorKind::QuotaExceeded.is_transient());
        assert!(!ErrorKind::MalformedResponse.is_transient());
        assert!(!ErrorKind::InvalidQuery.is_transient());
    }
}
