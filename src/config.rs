//! Client configuration: base URL, request deadline, retry policy, and auth endpoint paths.

// crates.io
use ::config::{Config, Environment, Map};
// self
use crate::{_prelude::*, auth::DEFAULT_SESSION_KEY, error::ConfigError, retry::RetryPolicy};

/// Relative paths of the authentication endpoints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthEndpoints {
	/// `POST {username, password}` → `{user, access, refresh}`.
	pub login: String,
	/// `POST {username, password}` → empty.
	pub register: String,
	/// `POST {refresh}` → `{access}`.
	pub refresh: String,
	/// Requests whose path contains this prefix never trigger a token refresh on 401.
	pub prefix: String,
}
impl Default for AuthEndpoints {
	fn default() -> Self {
		Self {
			login: "/api/auth/login/".into(),
			register: "/api/auth/register/".into(),
			refresh: "/api/auth/refresh/".into(),
			prefix: "/api/auth/".into(),
		}
	}
}

/// Settings shared by the pipeline, the refresh coordinator, and the account operations.
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// Base URL relative request paths are resolved against.
	pub base_url: Url,
	/// Per-request deadline; `None` waits indefinitely.
	pub timeout: Option<Duration>,
	/// Retry/backoff policy for network failures and 5xx responses.
	pub retry: RetryPolicy,
	/// Authentication endpoint paths.
	pub endpoints: AuthEndpoints,
	/// Key the session credential is persisted under.
	pub session_key: String,
}
impl ClientConfig {
	const DEFAULT_BASE_URL: &'static str = "http://localhost/";
	const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);
	const ENV_PREFIX: &'static str = "HTTP";

	/// Creates a configuration for `base_url` with default deadline and retry settings.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			timeout: Some(Self::DEFAULT_TIMEOUT),
			retry: RetryPolicy::disabled(),
			endpoints: AuthEndpoints::default(),
			session_key: DEFAULT_SESSION_KEY.into(),
		}
	}

	/// Parses `base_url` and creates a configuration for it.
	pub fn parse(base_url: &str) -> Result<Self> {
		Ok(Self::new(parse_url(base_url)?))
	}

	/// Loads overrides from `HTTP_*` process environment variables.
	///
	/// Recognized: `HTTP_BASE_URL`, `HTTP_TIMEOUT_MS`, `HTTP_RETRY_COUNT`,
	/// `HTTP_RETRY_BASE_DELAY_MS`, `HTTP_RETRY_MAX_DELAY_MS`.
	pub fn from_env() -> Result<Self> {
		Self::from_environment(Environment::with_prefix(Self::ENV_PREFIX))
	}

	/// Same as [`from_env`](Self::from_env) but reads variables from `vars` instead of the
	/// process environment.
	pub fn from_env_map(vars: Map<String, String>) -> Result<Self> {
		Self::from_environment(Environment::with_prefix(Self::ENV_PREFIX).source(Some(vars)))
	}

	fn from_environment(source: Environment) -> Result<Self> {
		let overrides: EnvOverrides = Config::builder()
			.add_source(source.try_parsing(true))
			.build()
			.and_then(Config::try_deserialize)
			.map_err(ConfigError::from)?;

		overrides.apply(Self::parse(Self::DEFAULT_BASE_URL)?)
	}

	/// Overrides the request deadline; a zero duration disables it.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = if timeout.is_zero() { None } else { Some(timeout) };

		self
	}

	/// Overrides the retry policy.
	pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Overrides the authentication endpoint paths.
	pub fn with_endpoints(mut self, endpoints: AuthEndpoints) -> Self {
		self.endpoints = endpoints;

		self
	}

	/// Overrides the session persistence key.
	pub fn with_session_key(mut self, key: impl Into<String>) -> Self {
		self.session_key = key.into();

		self
	}

	/// Resolves a request path against the base URL.
	pub fn resolve(&self, path: &str) -> Result<Url> {
		self.base_url.join(path).map_err(|source| {
			ConfigError::InvalidUrl { value: path.to_owned(), source }.into()
		})
	}

	/// Returns `true` if `url` targets an authentication endpoint.
	pub fn is_auth_endpoint(&self, url: &str) -> bool {
		url.contains(&self.endpoints.prefix)
	}
}

#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
	base_url: Option<String>,
	timeout_ms: Option<u64>,
	retry_count: Option<u32>,
	retry_base_delay_ms: Option<u64>,
	retry_max_delay_ms: Option<u64>,
}
impl EnvOverrides {
	fn apply(self, mut config: ClientConfig) -> Result<ClientConfig> {
		if let Some(base_url) = self.base_url {
			config.base_url = parse_url(&base_url)?;
		}
		if let Some(ms) = self.timeout_ms {
			config = config.with_timeout(Duration::from_millis(ms));
		}
		if let Some(count) = self.retry_count {
			config.retry.budget = count;
		}
		if let Some(ms) = self.retry_base_delay_ms {
			config.retry.base_delay = Duration::from_millis(ms);
		}
		if let Some(ms) = self.retry_max_delay_ms {
			config.retry.max_delay = Duration::from_millis(ms);
		}

		Ok(config)
	}
}

fn parse_url(value: &str) -> Result<Url> {
	Url::parse(value)
		.map_err(|source| ConfigError::InvalidUrl { value: value.to_owned(), source }.into())
}
