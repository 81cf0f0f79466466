#![allow(dead_code)]

// std
use std::{
	io,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::Instant;
// self
use authed_client::{
	auth::{TokenStore, UserIdentity},
	client::AuthedClient,
	config::ClientConfig,
	error::TransportError,
	http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	notify::{Notice, Presenter},
};

pub const ITEMS: &str = "/api/items/";
pub const REFRESH: &str = "/api/auth/refresh/";
pub const LOGIN: &str = "/api/auth/login/";

/// One request observed by [`ScriptedTransport`].
#[derive(Clone, Debug)]
pub struct Call {
	pub at: Instant,
	pub method: String,
	pub path: String,
	pub authorization: Option<String>,
	pub body: Vec<u8>,
	/// Zero-based index among calls to the same path.
	pub nth: usize,
}
impl Call {
	pub fn bearer(&self) -> Option<&str> {
		self.authorization.as_deref().and_then(|value| value.strip_prefix("Bearer "))
	}

	pub fn json(&self) -> Value {
		serde_json::from_slice(&self.body).expect("Recorded body should be JSON.")
	}
}

enum Outcome {
	Respond(u16, Vec<u8>),
	NetworkError,
	Hang,
}

/// Scripted reply for one call.
pub struct Reply {
	delay: Duration,
	outcome: Outcome,
}
impl Reply {
	pub fn status(status: u16) -> Self {
		Self { delay: Duration::ZERO, outcome: Outcome::Respond(status, Vec::new()) }
	}

	pub fn json(status: u16, body: Value) -> Self {
		let body = serde_json::to_vec(&body).expect("Reply fixture should serialize.");

		Self { delay: Duration::ZERO, outcome: Outcome::Respond(status, body) }
	}

	pub fn network_error() -> Self {
		Self { delay: Duration::ZERO, outcome: Outcome::NetworkError }
	}

	pub fn hang() -> Self {
		Self { delay: Duration::ZERO, outcome: Outcome::Hang }
	}

	pub fn after(mut self, delay: Duration) -> Self {
		self.delay = delay;

		self
	}

	async fn resolve(self) -> Result<HttpResponse, TransportError> {
		if !self.delay.is_zero() {
			tokio::time::sleep(self.delay).await;
		}

		match self.outcome {
			Outcome::Respond(status, body) => {
				let mut response = HttpResponse::new(body);

				*response.status_mut() =
					::http::StatusCode::from_u16(status).expect("Reply status should be valid.");

				Ok(response)
			},
			Outcome::NetworkError => Err(TransportError::network(io::Error::new(
				io::ErrorKind::ConnectionRefused,
				"connection refused",
			))),
			Outcome::Hang => futures::future::pending().await,
		}
	}
}

type Router = Box<dyn Fn(&Call) -> Reply + Send + Sync>;

/// In-process transport answering from a routing closure and recording every call.
pub struct ScriptedTransport {
	router: Router,
	calls: Mutex<Vec<Call>>,
}
impl ScriptedTransport {
	pub fn new(router: impl 'static + Fn(&Call) -> Reply + Send + Sync) -> Self {
		Self { router: Box::new(router), calls: Mutex::new(Vec::new()) }
	}

	pub fn calls(&self) -> Vec<Call> {
		self.calls.lock().clone()
	}

	pub fn calls_to(&self, path: &str) -> Vec<Call> {
		self.calls.lock().iter().filter(|call| call.path == path).cloned().collect()
	}

	fn record(&self, request: &HttpRequest) -> Call {
		let mut calls = self.calls.lock();
		let path = request.uri().path().to_owned();
		let call = Call {
			at: Instant::now(),
			method: request.method().to_string(),
			nth: calls.iter().filter(|call| call.path == path).count(),
			path,
			authorization: request
				.headers()
				.get(::http::header::AUTHORIZATION)
				.and_then(|value| value.to_str().ok())
				.map(str::to_owned),
			body: request.body().clone(),
		};

		calls.push(call.clone());

		call
	}
}
impl HttpTransport for ScriptedTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		let call = self.record(&request);
		let reply = (self.router)(&call);

		Box::pin(reply.resolve())
	}
}

/// Presenter capturing notices and login redirects.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
	notices: Mutex<Vec<Notice>>,
	redirects: AtomicUsize,
}
impl RecordingPresenter {
	pub fn notices(&self) -> Vec<Notice> {
		self.notices.lock().clone()
	}

	pub fn redirects(&self) -> usize {
		self.redirects.load(Ordering::SeqCst)
	}
}
impl Presenter for RecordingPresenter {
	fn notify(&self, notice: Notice) {
		self.notices.lock().push(notice);
	}

	fn redirect_to_login(&self) {
		self.redirects.fetch_add(1, Ordering::SeqCst);
	}
}

/// Client wired to a scripted transport and a recording presenter.
pub struct Harness {
	pub client: AuthedClient<ScriptedTransport>,
	pub transport: Arc<ScriptedTransport>,
	pub presenter: Arc<RecordingPresenter>,
}
impl Harness {
	pub fn new(
		config: ClientConfig,
		router: impl 'static + Fn(&Call) -> Reply + Send + Sync,
	) -> Self {
		let transport = Arc::new(ScriptedTransport::new(router));
		let presenter = Arc::new(RecordingPresenter::default());
		let client = AuthedClient::<ScriptedTransport>::with_transport(
			config,
			Arc::new(TokenStore::in_memory()),
			Arc::clone(&transport),
		)
		.expect("Client should build.")
		.with_presenter(presenter.clone());

		Self { client, transport, presenter }
	}

	pub fn tokens(&self) -> &TokenStore {
		&self.client.tokens
	}

	pub fn sign_in(&self, access: &str, refresh: &str) {
		self.tokens()
			.set_credential(access, refresh, Some(alice()))
			.expect("Seeding the session should succeed.");
	}
}

pub fn config() -> ClientConfig {
	ClientConfig::parse("http://api.test/").expect("Fixture base URL should parse.")
}

pub fn alice() -> UserIdentity {
	UserIdentity { id: 7, username: "alice".into() }
}
