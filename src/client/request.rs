//! Outbound request descriptor and the per-request state threaded through the pipeline.

// crates.io
use ::http::{
	HeaderMap, HeaderName, HeaderValue, Method,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::ConfigError,
	http::HttpRequest,
};

/// Method, path, headers, and body of one logical API call.
///
/// The descriptor stays immutable across retries and the post-refresh resubmission; the
/// `Authorization` header is injected fresh from the token store on every dispatch.
#[derive(Clone)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path (optionally with query) resolved against the client's base URL.
	pub path: String,
	/// Extra headers sent with every attempt.
	pub headers: HeaderMap,
	/// Request body, if any.
	pub body: Option<Vec<u8>>,
}
impl ApiRequest {
	/// Creates a body-less request.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), headers: HeaderMap::new(), body: None }
	}

	/// `GET path`.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// `POST path`.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// `PUT path`.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// `PATCH path`.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::PATCH, path)
	}

	/// `DELETE path`.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Serializes `body` as JSON and sets the content type.
	pub fn json<T>(mut self, body: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		let bytes = serde_json::to_vec(body).map_err(ConfigError::from)?;

		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		self.body = Some(bytes);

		Ok(self)
	}

	/// Adds a header sent with every attempt.
	pub fn header(mut self, name: HeaderName, value: &str) -> Result<Self> {
		let value = HeaderValue::from_str(value).map_err(|source| ConfigError::InvalidHeader {
			name: name.to_string(),
			source,
		})?;

		self.headers.insert(name, value);

		Ok(self)
	}

	/// Builds the wire request for one attempt, signing it with `access` when present.
	pub(crate) fn build(&self, url: &Url, access: Option<&TokenSecret>) -> Result<HttpRequest> {
		let mut builder = ::http::Request::builder().method(self.method.clone()).uri(url.as_str());

		if let Some(headers) = builder.headers_mut() {
			headers.extend(self.headers.clone());

			if let Some(access) = access {
				let value = HeaderValue::from_str(&access.bearer()).map_err(|source| {
					ConfigError::InvalidHeader { name: AUTHORIZATION.to_string(), source }
				})?;

				headers.insert(AUTHORIZATION, value);
			}
		}

		builder.body(self.body.clone().unwrap_or_default()).map_err(|e| ConfigError::from(e).into())
	}
}
impl Debug for ApiRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiRequest")
			.field("method", &self.method)
			.field("path", &self.path)
			.field("headers", &self.headers.keys().collect::<Vec<_>>())
			.field("body_len", &self.body.as_ref().map(Vec::len))
			.finish()
	}
}

/// Request-scoped flags carried across retries and the post-refresh resubmission.
#[derive(Clone, Debug)]
pub struct RequestContext {
	/// Retries performed so far; `None` when the retry policy is disabled.
	pub attempts: Option<u32>,
	/// Set once a 401 on this request triggered (or joined) a token refresh.
	pub refresh_attempted: bool,
	/// Caller-owned cancellation signal.
	pub cancel: CancellationToken,
	/// Access token the latest attempt was signed with.
	pub(crate) sent_with: Option<TokenSecret>,
}
impl RequestContext {
	/// Creates the context for a new logical request.
	pub fn new(retry_enabled: bool, cancel: CancellationToken) -> Self {
		Self {
			attempts: retry_enabled.then_some(0),
			refresh_attempted: false,
			cancel,
			sent_with: None,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url() -> Url {
		Url::parse("http://localhost/api/items/").expect("Fixture URL parses.")
	}

	#[test]
	fn build_injects_bearer_only_when_present() {
		let request = ApiRequest::get("/api/items/");
		let signed = request
			.build(&url(), Some(&TokenSecret::new("access-1")))
			.expect("Signed request builds.");

		assert_eq!(
			signed.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()),
			Some("Bearer access-1")
		);

		let anonymous = request.build(&url(), None).expect("Anonymous request builds.");

		assert!(anonymous.headers().get(AUTHORIZATION).is_none());
		assert_eq!(anonymous.uri(), "http://localhost/api/items/");
	}

	#[test]
	fn json_body_sets_content_type() {
		let request = ApiRequest::post("/api/items/")
			.json(&serde_json::json!({ "title": "hello" }))
			.expect("JSON body serializes.");
		let built = request.build(&url(), None).expect("Request builds.");

		assert_eq!(built.method(), Method::POST);
		assert_eq!(
			built.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
			Some("application/json")
		);
		assert_eq!(built.body().as_slice(), br#"{"title":"hello"}"#);
		assert!(!format!("{request:?}").contains("hello"));
	}

	#[test]
	fn context_counter_exists_only_with_retry() {
		assert_eq!(RequestContext::new(true, CancellationToken::new()).attempts, Some(0));
		assert_eq!(RequestContext::new(false, CancellationToken::new()).attempts, None);
	}
}
