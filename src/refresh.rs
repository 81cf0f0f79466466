//! Single-flight access-token renewal.
//!
//! The coordinator owns one in-flight slot. The first caller spawns a task that performs the
//! network call and installs a shared handle to its outcome; every caller arriving while it runs
//! attaches to that handle instead of issuing another request. The task runs to completion even
//! when every waiter has gone away. On settlement it writes the outcome into the [`TokenStore`]
//! (new access token, or a cleared session) and empties the slot before any waiter resumes, so
//! the next caller always observes the settled state.
//!
//! Admission (joining, the rotated-token check, and reading the refresh token) happens under the
//! slot lock, which is also held while a settling task empties the slot.

mod metrics;

pub use self::metrics::RefreshMetrics;

// crates.io
use ::http::{Method, header::CONTENT_TYPE};
use futures::future::{BoxFuture, FutureExt, Shared};
// self
use crate::{
	_prelude::*,
	auth::{TokenSecret, TokenStore},
	error::RefreshError,
	http::{self, HttpTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

type RefreshOutcome = Result<TokenSecret, RefreshError>;
type PendingRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Why a caller asks for a new access token.
#[derive(Clone, Copy, Debug)]
enum Trigger<'a> {
	/// Renew unconditionally (joining a running refresh).
	Explicit,
	/// The server rejected a request signed with this access token (`None` when unsigned).
	Rejected(Option<&'a TokenSecret>),
}

enum Admission {
	/// The store already holds a different access token; no renewal needed.
	Current(TokenSecret),
	Pending(PendingRefresh),
}

/// Collapses concurrent token renewals into one network call.
///
/// Renewals run on a spawned task, so the coordinator must be driven from within a Tokio runtime.
pub struct RefreshCoordinator<C>
where
	C: ?Sized + HttpTransport,
{
	inner: Arc<RefreshInner<C>>,
}
impl<C> RefreshCoordinator<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a coordinator that posts to `endpoint` through `transport`.
	pub fn new(
		transport: impl Into<Arc<C>>,
		tokens: Arc<TokenStore>,
		endpoint: Url,
		deadline: Option<Duration>,
	) -> Self {
		Self {
			inner: Arc::new(RefreshInner {
				transport: transport.into(),
				tokens,
				endpoint,
				deadline,
				in_flight: Mutex::new(None),
				metrics: RefreshMetrics::default(),
			}),
		}
	}

	/// Returns a fresh access token, joining the running refresh if there is one.
	///
	/// Fails with [`RefreshError::NoRefreshToken`] without touching the network when the store
	/// holds no refresh token. Any other failure has already cleared the session by the time it
	/// is returned.
	pub async fn refresh(&self) -> Result<TokenSecret, RefreshError> {
		self.settle(Trigger::Explicit).await
	}

	/// Recovers from a rejection of a request signed with `signed_with`.
	///
	/// Returns the stored access token without any network call when it already differs from
	/// `signed_with` (another caller renewed it, or the user signed in again). Otherwise behaves
	/// like [`refresh`](Self::refresh).
	pub async fn refresh_rejected(
		&self,
		signed_with: Option<&TokenSecret>,
	) -> Result<TokenSecret, RefreshError> {
		self.settle(Trigger::Rejected(signed_with)).await
	}

	/// Returns `true` while a refresh network call is running.
	pub fn is_in_flight(&self) -> bool {
		self.inner.in_flight.lock().is_some()
	}

	/// Returns the coordinator's counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.inner.metrics
	}

	/// Returns the token store the coordinator writes to.
	pub fn tokens(&self) -> &Arc<TokenStore> {
		&self.inner.tokens
	}

	async fn settle(&self, trigger: Trigger<'_>) -> RefreshOutcome {
		match self.admit(trigger)? {
			Admission::Current(access) => Ok(access),
			Admission::Pending(pending) => pending.await,
		}
	}

	fn admit(&self, trigger: Trigger<'_>) -> Result<Admission, RefreshError> {
		let mut slot = self.inner.in_flight.lock();

		if let Some(pending) = slot.as_ref() {
			self.inner.metrics.record_join();
			tracing::debug!("joining in-flight token refresh");

			return Ok(Admission::Pending(pending.clone()));
		}

		let rotated = match trigger {
			Trigger::Explicit => None,
			Trigger::Rejected(signed_with) =>
				self.inner.tokens.current_access().filter(|current| Some(current) != signed_with),
		};

		if let Some(current) = rotated {
			tracing::debug!("access token rotated since dispatch");

			return Ok(Admission::Current(current));
		}

		let refresh_token =
			self.inner.tokens.current_refresh().ok_or(RefreshError::NoRefreshToken)?;
		let task = tokio::spawn(Arc::clone(&self.inner).run(refresh_token));
		let inner = Arc::clone(&self.inner);
		let pending = async move {
			match task.await {
				Ok(outcome) => outcome,
				Err(err) => inner.abandon(err),
			}
		}
		.boxed()
		.shared();

		*slot = Some(pending.clone());

		Ok(Admission::Pending(pending))
	}
}
impl<C> Clone for RefreshCoordinator<C>
where
	C: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self { inner: Arc::clone(&self.inner) }
	}
}
impl<C> Debug for RefreshCoordinator<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("endpoint", &self.inner.endpoint.as_str())
			.field("in_flight", &self.is_in_flight())
			.field("metrics", &self.inner.metrics)
			.finish()
	}
}

struct RefreshInner<C>
where
	C: ?Sized + HttpTransport,
{
	transport: Arc<C>,
	tokens: Arc<TokenStore>,
	endpoint: Url,
	deadline: Option<Duration>,
	in_flight: Mutex<Option<PendingRefresh>>,
	metrics: RefreshMetrics,
}
impl<C> RefreshInner<C>
where
	C: ?Sized + HttpTransport,
{
	async fn run(self: Arc<Self>, refresh_token: TokenSecret) -> RefreshOutcome {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.metrics.record_attempt();

		let outcome = span.instrument(self.exchange(&refresh_token)).await;

		// Settle the store and release the slot with no suspension in between.
		match &outcome {
			Ok(access) => {
				if let Err(err) = self.tokens.update_access(access.clone()) {
					tracing::warn!(error = %err, "failed to persist refreshed access token");
				}

				self.metrics.record_success();
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
				tracing::info!("access token refreshed");
			},
			Err(err) => {
				tracing::warn!(error = %err, "token refresh failed, clearing session");

				if let Err(err) = self.tokens.clear_credential() {
					tracing::warn!(error = %err, "failed to persist session logout");
				}

				self.metrics.record_failure();
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		self.in_flight.lock().take();

		outcome
	}

	/// Settles a refresh whose task died before writing its outcome.
	fn abandon(&self, err: tokio::task::JoinError) -> RefreshOutcome {
		tracing::warn!(error = %err, "token refresh task aborted, clearing session");

		if let Err(err) = self.tokens.clear_credential() {
			tracing::warn!(error = %err, "failed to persist session logout");
		}

		self.metrics.record_failure();
		self.in_flight.lock().take();

		Err(RefreshError::Network { message: err.to_string() })
	}

	async fn exchange(&self, refresh_token: &TokenSecret) -> RefreshOutcome {
		let body = serde_json::to_vec(&RefreshRequest { refresh: refresh_token.expose() })
			.map_err(|e| RefreshError::Request { message: e.to_string() })?;
		let request = ::http::Request::builder()
			.method(Method::POST)
			.uri(self.endpoint.as_str())
			.header(CONTENT_TYPE, "application/json")
			.body(body)
			.map_err(|e| RefreshError::Request { message: e.to_string() })?;
		let response =
			http::execute_with_deadline(self.transport.as_ref(), request, self.deadline)
				.await
				.map_err(|e| RefreshError::Network { message: e.to_string() })?;
		let status = response.status();

		if !status.is_success() {
			return Err(RefreshError::Rejected { status: status.as_u16() });
		}

		parse_refresh_response(response.body())
	}
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
	refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
	access: Option<String>,
}

fn parse_refresh_response(body: &[u8]) -> RefreshOutcome {
	let de = &mut serde_json::Deserializer::from_slice(body);
	let parsed: RefreshResponse = serde_path_to_error::deserialize(de)
		.map_err(|e| RefreshError::InvalidRefreshResponse { message: e.to_string() })?;

	parsed.access.and_then(TokenSecret::non_empty).ok_or_else(|| {
		RefreshError::InvalidRefreshResponse { message: "missing `access` token".into() }
	})
}
