//! Request pipeline: bearer injection, retry/backoff, 401 recovery, and status notices.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	client::{AuthedClient, decode_json, request::{ApiRequest, RequestContext}},
	error::{ResponseError, TransportError},
	http::{self, HttpResponse, HttpTransport},
	notify::Notice,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	retry::FailureClass,
};

/// Result of a single dispatch.
enum Attempt {
	Response(HttpResponse),
	NoResponse(TransportError),
	Cancelled,
}
impl Attempt {
	fn class(&self) -> FailureClass {
		match self {
			Self::Response(response) => FailureClass::Status(response.status().as_u16()),
			Self::NoResponse(_) => FailureClass::Network,
			Self::Cancelled => FailureClass::Cancelled,
		}
	}
}

/// What the pipeline does after a failed attempt that will not be retried.
enum Resolution {
	Resubmit,
	Reject(Error),
}

impl<C> AuthedClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Sends `request` and returns the first successful response.
	pub async fn send(&self, request: ApiRequest) -> Result<HttpResponse> {
		self.send_with_cancel(request, CancellationToken::new()).await
	}

	/// Same as [`send`](Self::send), aborting as soon as `cancel` fires.
	///
	/// A cancelled request fails with [`Error::Cancelled`]: it is never retried, never triggers a
	/// token refresh, and never produces a notice.
	pub async fn send_with_cancel(
		&self,
		request: ApiRequest,
		cancel: CancellationToken,
	) -> Result<HttpResponse> {
		const KIND: FlowKind = FlowKind::Request;

		let span = FlowSpan::new(KIND, "send");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let context = RequestContext::new(self.config.retry.is_enabled(), cancel);
		let result = span.instrument(self.run(&request, context)).await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}

	/// `GET path` and decode the JSON response.
	pub async fn get_json<T>(&self, path: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let response = self.send(ApiRequest::get(path)).await?;

		decode_json(&response)
	}

	/// `POST path` with a JSON body and decode the JSON response.
	pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		let response = self.send(ApiRequest::post(path).json(body)?).await?;

		decode_json(&response)
	}

	async fn run(&self, request: &ApiRequest, mut context: RequestContext) -> Result<HttpResponse> {
		let url = self.config.resolve(&request.path)?;
		let auth_endpoint = self.config.is_auth_endpoint(url.as_str());

		loop {
			let attempt = match self.dispatch(request, &url, &mut context).await? {
				Attempt::Cancelled => {
					tracing::debug!(url = %url, "request cancelled");

					return Err(Error::Cancelled);
				},
				Attempt::Response(response) if response.status().is_success() =>
					return Ok(response),
				attempt => attempt,
			};

			if self.retry_scheduled(&url, attempt.class(), &mut context).await {
				continue;
			}

			let response = match attempt {
				Attempt::Response(response) => response,
				Attempt::NoResponse(err) => {
					tracing::warn!(url = %url, error = %err, "request failed without a response");

					return Err(err.into());
				},
				Attempt::Cancelled => return Err(Error::Cancelled),
			};

			match self.resolve_failure(response, auth_endpoint, &mut context).await {
				Resolution::Resubmit => continue,
				Resolution::Reject(err) => return Err(err),
			}
		}
	}

	async fn dispatch(
		&self,
		request: &ApiRequest,
		url: &Url,
		context: &mut RequestContext,
	) -> Result<Attempt> {
		if context.cancel.is_cancelled() {
			return Ok(Attempt::Cancelled);
		}

		let access = self.tokens.current_access();
		let outbound = request.build(url, access.as_ref())?;

		context.sent_with = access;

		tracing::debug!(method = %request.method, url = %url, "dispatching request");

		let call = http::execute_with_deadline(self.transport.as_ref(), outbound, self.config.timeout);
		let attempt = tokio::select! {
			biased;
			_ = context.cancel.cancelled() => Attempt::Cancelled,
			result = call => match result {
				Ok(response) => Attempt::Response(response),
				Err(err) => Attempt::NoResponse(err),
			},
		};

		Ok(attempt)
	}

	async fn retry_scheduled(
		&self,
		url: &Url,
		failure: FailureClass,
		context: &mut RequestContext,
	) -> bool {
		let Some(attempts) = context.attempts else {
			return false;
		};

		if !self.config.retry.should_retry(attempts, failure) {
			return false;
		}

		let delay = self.config.retry.delay_for(attempts);

		context.attempts = Some(attempts + 1);

		tracing::warn!(
			url = %url,
			retry = attempts + 1,
			budget = self.config.retry.budget,
			delay_ms = delay.as_millis() as u64,
			?failure,
			"retrying request"
		);
		tokio::time::sleep(delay).await;

		true
	}

	async fn resolve_failure(
		&self,
		response: HttpResponse,
		auth_endpoint: bool,
		context: &mut RequestContext,
	) -> Resolution {
		let status = response.status().as_u16();

		tracing::debug!(status, "request rejected");

		match status {
			401 => self.recover_unauthorized(response, auth_endpoint, context).await,
			403 => {
				self.presenter.notify(Notice::PermissionDenied);

				Resolution::Reject(Error::Forbidden(response.into()))
			},
			404 => {
				self.presenter.notify(Notice::NotFound);

				Resolution::Reject(Error::NotFound(response.into()))
			},
			422 => {
				let detail = validation_detail(response.body());
				let message =
					detail.clone().unwrap_or_else(|| Notice::GENERIC_VALIDATION.to_owned());

				self.presenter.notify(Notice::Validation(detail));

				Resolution::Reject(Error::Validation { message, response: response.into() })
			},
			500..=599 => {
				self.presenter.notify(Notice::ServerError);

				Resolution::Reject(Error::Server(response.into()))
			},
			_ => Resolution::Reject(Error::Status(response.into())),
		}
	}

	async fn recover_unauthorized(
		&self,
		response: HttpResponse,
		auth_endpoint: bool,
		context: &mut RequestContext,
	) -> Resolution {
		if auth_endpoint || context.refresh_attempted {
			self.expire_session();

			return Resolution::Reject(Error::Unauthorized {
				response: ResponseError::from(response),
				refresh: None,
			});
		}

		context.refresh_attempted = true;

		// A renewal that settled after this request was signed resubmits without a new refresh.
		let refreshed = tokio::select! {
			biased;
			_ = context.cancel.cancelled() => None,
			outcome = self.refresher().refresh_rejected(context.sent_with.as_ref()) => Some(outcome),
		};

		match refreshed {
			None => Resolution::Reject(Error::Cancelled),
			Some(Ok(_)) => Resolution::Resubmit,
			Some(Err(err)) => {
				self.expire_session();

				Resolution::Reject(Error::Unauthorized {
					response: ResponseError::from(response),
					refresh: Some(err),
				})
			},
		}
	}

	/// Ends the session and sends the user to the login view.
	fn expire_session(&self) {
		if let Err(err) = self.tokens.clear_credential() {
			tracing::warn!(error = %err, "failed to persist session logout");
		}

		self.presenter.notify(Notice::SessionExpired);
		self.presenter.redirect_to_login();
	}
}

/// Extracts the server's `detail` string from a 422 body.
fn validation_detail(body: &[u8]) -> Option<String> {
	let value = serde_json::from_slice::<serde_json::Value>(body).ok()?;

	value.get("detail")?.as_str().filter(|detail| !detail.is_empty()).map(str::to_owned)
}
