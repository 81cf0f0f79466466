//! Client-level error types shared across the pipeline, refresh coordinator, guard, and stores.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
///
/// Every variant produced by the request pipeline is delivered after its side effects (session
/// teardown, user notification, login redirect) have already been applied exactly once.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// No response was received (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Token renewal failed outside the request pipeline (navigation guard, direct calls).
	#[error(transparent)]
	Refresh(#[from] RefreshError),

	/// The caller aborted the request; nothing was retried or reported.
	#[error("Request was cancelled by the caller.")]
	Cancelled,
	/// The server rejected the credential and the session could not be recovered.
	#[error("Session is no longer authorized ({response}).")]
	Unauthorized {
		/// Final 401 response.
		response: ResponseError,
		/// Refresh failure that ended the recovery attempt, if one was made.
		#[source]
		refresh: Option<RefreshError>,
	},
	/// The server refused access to the resource.
	#[error("Insufficient permission ({0}).")]
	Forbidden(ResponseError),
	/// The server has no such resource.
	#[error("Resource not found ({0}).")]
	NotFound(ResponseError),
	/// The server rejected the request payload.
	#[error("Request validation failed: {message}.")]
	Validation {
		/// Server-supplied detail or the generic validation message.
		message: String,
		/// Final 422 response.
		response: ResponseError,
	},
	/// The server failed and retries (if any) were exhausted.
	#[error("Server error ({0}).")]
	Server(ResponseError),
	/// Any other non-success status; propagated without side effects.
	#[error("Unexpected response ({0}).")]
	Status(ResponseError),
	/// A successful response body could not be decoded.
	#[error("Response body could not be decoded.")]
	Decode {
		/// Structured parsing failure naming the offending field.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl Error {
	/// Returns `true` when the caller cancelled the request.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled)
	}

	/// Returns the HTTP status of the final response, when one was received.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Unauthorized { response, .. }
			| Self::Forbidden(response)
			| Self::NotFound(response)
			| Self::Validation { response, .. }
			| Self::Server(response)
			| Self::Status(response) => Some(response.status),
			_ => None,
		}
	}
}
impl From<serde_path_to_error::Error<serde_json::Error>> for Error {
	fn from(source: serde_path_to_error::Error<serde_json::Error>) -> Self {
		Self::Decode { source }
	}
}

/// Snapshot of a non-success response kept for the caller.
#[derive(Clone, PartialEq, Eq)]
pub struct ResponseError {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ResponseError {
	/// Returns the body as UTF-8 text, replacing invalid sequences.
	pub fn body_text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}
impl From<crate::http::HttpResponse> for ResponseError {
	fn from(response: crate::http::HttpResponse) -> Self {
		let status = response.status().as_u16();

		Self { status, body: response.into_body() }
	}
}
impl Debug for ResponseError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ResponseError")
			.field("status", &self.status)
			.field("body_len", &self.body.len())
			.finish()
	}
}
impl Display for ResponseError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "status {}", self.status)
	}
}

/// Configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] ::http::Error),
	/// Base URL or endpoint path cannot be parsed.
	#[error("URL `{value}` is invalid.")]
	InvalidUrl {
		/// Offending input.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Navigation target is not a local absolute path.
	#[error("Route `{value}` is not a local path.")]
	InvalidRoute {
		/// Offending input.
		value: String,
	},
	/// Header value contains bytes that cannot be sent.
	#[error("Header `{name}` has an invalid value.")]
	InvalidHeader {
		/// Header name.
		name: String,
		/// Underlying header failure.
		#[source]
		source: ::http::header::InvalidHeaderValue,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	Body(#[from] serde_json::Error),
	/// Environment configuration could not be loaded.
	#[error("Configuration could not be loaded.")]
	Load(#[from] ::config::ConfigError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures: no response was received.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the server.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the server.")]
	Io(#[from] std::io::Error),
	/// The configured request deadline elapsed.
	#[error("Request timed out after {0:?}.")]
	Timeout(Duration),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Token renewal failures. Every variant forces a logout.
///
/// Payloads are strings so a single outcome can be cloned to every waiter of a shared refresh.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshError {
	/// The token store holds no refresh token.
	#[error("No refresh token is available.")]
	NoRefreshToken,
	/// The refresh endpoint answered without a usable access token.
	#[error("Refresh endpoint returned an invalid response: {message}.")]
	InvalidRefreshResponse {
		/// Description of what was missing or malformed.
		message: String,
	},
	/// The refresh endpoint rejected the refresh token.
	#[error("Refresh endpoint rejected the request with status {status}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
	},
	/// No response was received from the refresh endpoint.
	#[error("Network error occurred while refreshing: {message}.")]
	Network {
		/// Rendered transport failure.
		message: String,
	},
	/// The refresh request could not be constructed.
	#[error("Refresh request could not be built: {message}.")]
	Request {
		/// Rendered construction failure.
		message: String,
	},
}
