use hyper::StatusCode;
use thiserror::Error;

/// How an error reaches the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presentation {
    /// Rendered `error.html` page.
    Page,
    /// `{"error": "..."}` body.
    Json,
}

/// Errors that cross the HTTP boundary.
///
/// The `Display` text is for logs only. Clients see [`PublicError::public_message`].
pub trait PublicError: std::error::Error {
    fn status(&self) -> StatusCode;
    fn public_message(&self) -> &'static str;
    fn presentation(&self) -> Presentation;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("Session store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Timeout after {0:?} while calling the authorization backend")]
    Timeout(std::time::Duration),
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status} from authorization backend: {context}")]
    Http { status: StatusCode, context: String },
    #[error("JSON error: {0}")]
    Json(String),
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("No identity record for subject {0}")]
    NotFound(String),
    #[error("Identity record is not a JSON object: {0}")]
    Decode(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ConsentError {
    #[error("Malformed confirmation request: {0}")]
    MalformedRequest(String),
    /// Covers both a missing/expired CSRF entry (`None`) and an unreachable store.
    #[error("Failed to resolve CSRF session")]
    SessionLookup(#[source] Option<StoreError>),
    #[error("Failed to fetch consent request: {0}")]
    ChallengeFetch(#[source] BackendError),
    #[error("Failed to reject consent request: {0}")]
    Rejection(#[source] BackendError),
    #[error("Failed to retrieve share context")]
    ContextRetrieval(#[source] Option<StoreError>),
    #[error("Failed to decode share context: {0}")]
    ContextDecode(String),
    #[error("Failed to accept consent request: {0}")]
    Acceptance(#[source] BackendError),
    #[error("Undefined consent action: {0}")]
    UndefinedAction(String),
    #[error("Missing consent challenge")]
    MissingChallenge,
    #[error("Failed to issue CSRF session: {0}")]
    CsrfIssue(String),
}

impl PublicError for ConsentError {
    fn status(&self) -> StatusCode {
        match self {
            Self::MalformedRequest(_) | Self::UndefinedAction(_) | Self::MissingChallenge => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => "Failed to parse request",
            Self::SessionLookup(_) => "Failed to get csrf",
            Self::ChallengeFetch(_) => "Failed to get required consent request",
            Self::Rejection(_) => "Failed to reject consent request",
            Self::ContextRetrieval(_) => "Failed to retrieve context",
            Self::ContextDecode(_) => "Failed to parse context",
            Self::Acceptance(_) => "Failed to accept consent request",
            Self::UndefinedAction(_) => "Undefined consent action",
            Self::MissingChallenge => "Missing consent challenge",
            Self::CsrfIssue(_) => "Failed to prepare consent form",
        }
    }

    fn presentation(&self) -> Presentation {
        Presentation::Page
    }
}

#[derive(Debug, Error)]
pub enum UserinfoError {
    #[error("No authorization token found")]
    MissingToken,
    #[error("Failed to introspect access token: {0}")]
    Introspection(#[source] BackendError),
    #[error("Introspection reported an active token without a subject")]
    MissingSubject,
    #[error("This token is inactive")]
    InactiveToken,
    #[error("Failed to retrieve userinfo: {0}")]
    Lookup(#[source] IdentityError),
}

impl PublicError for UserinfoError {
    fn status(&self) -> StatusCode {
        match self {
            Self::MissingToken => StatusCode::UNAUTHORIZED,
            Self::InactiveToken => StatusCode::FORBIDDEN,
            Self::Introspection(_) | Self::MissingSubject | Self::Lookup(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            Self::MissingToken => "No authorization token found",
            Self::Introspection(_) | Self::MissingSubject => {
                "Failed to retrieve access token info"
            }
            Self::InactiveToken => "This token is inactive",
            Self::Lookup(_) => "Failed to get userinfo",
        }
    }

    fn presentation(&self) -> Presentation {
        match self {
            // The only userinfo failure rendered as a page rather than JSON.
            Self::Lookup(_) => Presentation::Page,
            _ => Presentation::Json,
        }
    }
}
