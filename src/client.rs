//! Authenticated client facade: request pipeline, account operations, and guard wiring.

pub mod request;

mod account;
mod pipeline;

pub use request::*;

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::TokenStore,
	config::ClientConfig,
	guard::{NavigationGuard, RouteTable},
	http::{HttpResponse, HttpTransport},
	notify::{LogPresenter, Presenter},
	refresh::RefreshCoordinator,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestAuthedClient = AuthedClient<ReqwestTransport>;

/// Wraps an [`HttpTransport`] with bearer injection, retry/backoff, and 401 recovery.
///
/// The client owns the transport, the shared [`TokenStore`], and the [`RefreshCoordinator`]
/// every request funnels its token renewals through, so one client instance corresponds to one
/// session. Cloning is cheap and clones share all of that state.
pub struct AuthedClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Base URL, deadline, retry policy, and auth endpoints.
	pub config: ClientConfig,
	/// Transport used for every outbound call.
	pub transport: Arc<C>,
	/// Session credential shared with the refresh coordinator and navigation guard.
	pub tokens: Arc<TokenStore>,
	/// UI collaborator receiving notices and login redirects.
	pub presenter: Arc<dyn Presenter>,
	refresher: RefreshCoordinator<C>,
}
impl<C> AuthedClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		tokens: Arc<TokenStore>,
		transport: impl Into<Arc<C>>,
	) -> Result<Self> {
		let transport = transport.into();
		let refresh_endpoint = config.resolve(&config.endpoints.refresh)?;
		let refresher = RefreshCoordinator::new(
			Arc::clone(&transport),
			Arc::clone(&tokens),
			refresh_endpoint,
			config.timeout,
		);

		Ok(Self { config, transport, tokens, presenter: Arc::new(LogPresenter), refresher })
	}

	/// Sets the UI collaborator that receives notices and login redirects.
	pub fn with_presenter(mut self, presenter: Arc<dyn Presenter>) -> Self {
		self.presenter = presenter;

		self
	}

	/// Returns the refresh coordinator shared by every request of this client.
	pub fn refresher(&self) -> &RefreshCoordinator<C> {
		&self.refresher
	}

	/// Builds a navigation guard sharing this client's session and refresh coordinator.
	pub fn guard(&self, routes: RouteTable) -> NavigationGuard<C> {
		NavigationGuard::new(routes, self.refresher.clone())
	}
}
#[cfg(feature = "reqwest")]
impl AuthedClient<ReqwestTransport> {
	/// Creates a client backed by its own reqwest transport.
	pub fn new(config: ClientConfig, tokens: Arc<TokenStore>) -> Result<Self> {
		let transport = ReqwestTransport::with_timeout(config.timeout)?;

		Self::with_transport(config, tokens, transport)
	}
}
impl<C> Clone for AuthedClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			transport: Arc::clone(&self.transport),
			tokens: Arc::clone(&self.tokens),
			presenter: Arc::clone(&self.presenter),
			refresher: self.refresher.clone(),
		}
	}
}
impl<C> Debug for AuthedClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthedClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("retry", &self.config.retry)
			.field("tokens", &self.tokens)
			.field("refresher", &self.refresher)
			.finish()
	}
}

/// Decodes a JSON body, naming the failing field on error.
pub(crate) fn decode_json<T>(response: &HttpResponse) -> Result<T>
where
	T: DeserializeOwned,
{
	let de = &mut serde_json::Deserializer::from_slice(response.body());

	Ok(serde_path_to_error::deserialize(de)?)
}
