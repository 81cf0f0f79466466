// self
use crate::{
	_prelude::*,
	auth::UserIdentity,
	client::{AuthedClient, decode_json, request::ApiRequest},
	http::HttpTransport,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

#[derive(Serialize)]
struct Credentials<'a> {
	username: &'a str,
	password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
	user: UserIdentity,
	access: String,
	refresh: String,
}

impl<C> AuthedClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Signs in and stores the returned credential.
	///
	/// A rejected login surfaces as [`Error::Unauthorized`] without any refresh attempt, since the
	/// login endpoint lives under the auth prefix.
	pub async fn login(&self, username: &str, password: &str) -> Result<UserIdentity> {
		const KIND: FlowKind = FlowKind::Account;

		let span = FlowSpan::new(KIND, "login");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result: Result<UserIdentity> = span
			.instrument(async {
				let request = ApiRequest::post(self.config.endpoints.login.as_str())
					.json(&Credentials { username, password })?;
				let response = self.send(request).await?;
				let LoginResponse { user, access, refresh } = decode_json(&response)?;

				self.tokens.set_credential(access, refresh, Some(user.clone()))?;

				tracing::info!(user = %user.username, "signed in");

				Ok::<_, Error>(user)
			})
			.await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}

	/// Creates an account; the session is left untouched.
	pub async fn register(&self, username: &str, password: &str) -> Result<()> {
		const KIND: FlowKind = FlowKind::Account;

		let span = FlowSpan::new(KIND, "register");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result: Result<()> = span
			.instrument(async {
				let request = ApiRequest::post(self.config.endpoints.register.as_str())
					.json(&Credentials { username, password })?;

				self.send(request).await.map(|_| ())
			})
			.await;

		obs::record_flow_outcome(KIND, FlowOutcome::of(&result));

		result
	}

	/// Drops the session credential.
	pub fn logout(&self) -> Result<()> {
		self.tokens.clear_credential()?;
		obs::record_flow_outcome(FlowKind::Account, FlowOutcome::Success);

		tracing::info!("signed out");

		Ok(())
	}
}
