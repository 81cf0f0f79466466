//! Navigation guard deciding, before each route change, whether to allow it or redirect.
//!
//! Decisions, evaluated in order:
//!
//! 1. Authenticated user heading to the login route: redirect to the sanitized `redirect` query
//!    parameter, or to the default landing route.
//! 2. Route that does not require auth: allow.
//! 3. Authenticated user: allow.
//! 4. Refresh token present: refresh silently (joining any in-flight refresh) and allow on success.
//! 5. Otherwise: redirect to the login route carrying the intended path.

// crates.io
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::TokenStore,
	error::ConfigError,
	http::HttpTransport,
	obs::{FlowKind, FlowSpan},
	refresh::RefreshCoordinator,
};

/// Parsed navigation target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
	path: String,
	query: BTreeMap<String, String>,
	full_path: String,
}
impl Route {
	const ORIGIN: &'static str = "http://route.local/";

	/// Parses an app-relative path such as `/chat?room=3`.
	///
	/// Only local absolute paths are accepted; scheme-relative (`//host/...`) and absolute URLs
	/// are rejected.
	pub fn parse(full_path: &str) -> Result<Self> {
		if !is_local_path(full_path) {
			return Err(ConfigError::InvalidRoute { value: full_path.to_owned() }.into());
		}

		let invalid = |source| ConfigError::InvalidUrl { value: full_path.to_owned(), source };
		let url = Url::parse(Self::ORIGIN).and_then(|origin| origin.join(full_path)).map_err(invalid)?;
		let query = url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();

		Ok(Self { path: url.path().to_owned(), query, full_path: full_path.to_owned() })
	}

	/// Path component without query or fragment.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Decoded query parameter.
	pub fn query(&self, key: &str) -> Option<&str> {
		self.query.get(key).map(String::as_str)
	}

	/// Path as originally requested, including query and fragment.
	pub fn full_path(&self) -> &str {
		&self.full_path
	}
}

/// Login route, default landing route, and the routes that require a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteTable {
	login: String,
	landing: String,
	protected: BTreeSet<String>,
}
impl RouteTable {
	/// Creates a table with no protected routes.
	pub fn new(login: impl Into<String>, landing: impl Into<String>) -> Self {
		Self { login: login.into(), landing: landing.into(), protected: BTreeSet::new() }
	}

	/// Marks `path` and everything nested under it as requiring a session.
	pub fn protect(mut self, path: impl Into<String>) -> Self {
		self.protected.insert(path.into().trim_end_matches('/').to_owned());

		self
	}

	/// Login route path.
	pub fn login(&self) -> &str {
		&self.login
	}

	/// Route used after login when no valid redirect was carried.
	pub fn landing(&self) -> &str {
		&self.landing
	}

	/// Returns `true` if `path` needs an authenticated session.
	pub fn requires_auth(&self, path: &str) -> bool {
		self.protected.iter().any(|protected| match path.strip_prefix(protected.as_str()) {
			Some(rest) => rest.is_empty() || rest.starts_with('/'),
			None => false,
		})
	}

	/// Builds the login location carrying `intended` as the `redirect` parameter.
	pub fn login_redirect(&self, intended: &str) -> String {
		let query = form_urlencoded::Serializer::new(String::new())
			.append_pair("redirect", intended)
			.finish();

		format!("{}?{query}", self.login)
	}
}
impl Default for RouteTable {
	fn default() -> Self {
		Self::new("/auth", "/chat").protect("/chat").protect("/kb")
	}
}

/// Outcome of a guard evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavigationDecision {
	/// Proceed to the requested route.
	Allow,
	/// Navigate to this location instead.
	Redirect(String),
}

/// Route guard sharing the session and refresh coordinator of an
/// [`AuthedClient`](crate::client::AuthedClient).
pub struct NavigationGuard<C>
where
	C: ?Sized + HttpTransport,
{
	routes: RouteTable,
	refresher: RefreshCoordinator<C>,
}
impl<C> NavigationGuard<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a guard over `routes` that renews tokens through `refresher`.
	pub fn new(routes: RouteTable, refresher: RefreshCoordinator<C>) -> Self {
		Self { routes, refresher }
	}

	/// Returns the route table.
	pub fn routes(&self) -> &RouteTable {
		&self.routes
	}

	/// Parses `full_path` and evaluates it.
	pub async fn navigate(&self, full_path: &str) -> Result<NavigationDecision> {
		let route = Route::parse(full_path)?;

		Ok(self.before_each(&route).await)
	}

	/// Decides whether navigation to `to` may proceed.
	pub async fn before_each(&self, to: &Route) -> NavigationDecision {
		let span = FlowSpan::new(FlowKind::Navigation, "before_each");
		let decision = span.instrument(self.decide(to)).await;

		tracing::debug!(to = to.full_path(), ?decision, "navigation evaluated");

		decision
	}

	async fn decide(&self, to: &Route) -> NavigationDecision {
		let tokens = self.tokens();

		if to.path() == self.routes.login() && tokens.is_authenticated() {
			let target = to.query("redirect").filter(|target| is_local_path(target));

			return NavigationDecision::Redirect(
				target.unwrap_or(self.routes.landing()).to_owned(),
			);
		}
		if !self.routes.requires_auth(to.path()) || tokens.is_authenticated() {
			return NavigationDecision::Allow;
		}
		// Signed-out view of the session; a credential restored meanwhile is used as is.
		if tokens.current_refresh().is_some() {
			match self.refresher.refresh_rejected(None).await {
				Ok(_) => return NavigationDecision::Allow,
				Err(err) => tracing::warn!(error = %err, "silent refresh failed during navigation"),
			}
		}

		NavigationDecision::Redirect(self.routes.login_redirect(to.full_path()))
	}

	fn tokens(&self) -> &Arc<TokenStore> {
		self.refresher.tokens()
	}
}
impl<C> Debug for NavigationGuard<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("NavigationGuard").field("routes", &self.routes).finish()
	}
}

/// Accepts only same-origin absolute paths.
fn is_local_path(target: &str) -> bool {
	target.starts_with('/') && !target.starts_with("//") && !target.starts_with("/\\")
}
