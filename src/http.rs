//! Transport primitives for outbound API calls.
//!
//! The module exposes [`HttpTransport`], the client's only dependency on an HTTP stack, plus the
//! default reqwest-backed [`ReqwestTransport`]. Requests and responses travel as plain
//! [`http`] values with owned byte bodies so the pipeline can rebuild and resubmit a request
//! without holding on to transport-specific state.

// self
use crate::{_prelude::*, error::TransportError};

/// Outbound request handed to a transport.
pub type HttpRequest = ::http::Request<Vec<u8>>;
/// Fully buffered response returned by a transport.
pub type HttpResponse = ::http::Response<Vec<u8>>;

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks able to execute a single request.
///
/// Implementations must return `Ok` for every response that was actually received, whatever its
/// status; only failures where no response exists (connection refused, TLS failure, reset) map to
/// [`TransportError`]. Status classification, retries, and deadlines belong to the pipeline.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and buffers the full response.
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Executes `request`, failing with [`TransportError::Timeout`] once `deadline` elapses.
pub async fn execute_with_deadline<C>(
	transport: &C,
	request: HttpRequest,
	deadline: Option<Duration>,
) -> Result<HttpResponse, TransportError>
where
	C: ?Sized + HttpTransport,
{
	let call = transport.execute(request);

	match deadline {
		Some(deadline) => tokio::time::timeout(deadline, call)
			.await
			.map_err(|_| TransportError::Timeout(deadline))?,
		None => call.await,
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client whose connections give up after `timeout`.
	pub fn with_timeout(timeout: Option<Duration>) -> Result<Self> {
		let mut builder = ReqwestClient::builder();

		if let Some(timeout) = timeout {
			builder = builder.connect_timeout(timeout);
		}

		let client = builder.build().map_err(crate::error::ConfigError::from)?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let request = reqwest::Request::try_from(request).map_err(TransportError::from)?;
			let response = self.0.execute(request).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await?.to_vec();
			let mut response_new = HttpResponse::new(body);

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn reqwest_transport_maps_unreachable_host_to_network_error() {
		let transport =
			ReqwestTransport::with_timeout(Some(Duration::from_millis(200))).expect("Client builds.");
		let request = ::http::Request::builder()
			.uri("http://127.0.0.1:9/unreachable")
			.body(Vec::new())
			.expect("Request fixture should build.");
		let err = transport.execute(request).await.expect_err("Port 9 should refuse connections.");

		assert!(matches!(err, TransportError::Network { .. }));
	}
}
