//! Registration form handling.
//!
//! A submission goes `received -> validated -> { mismatch | stored -> success | store-error }`.
//! Every state is terminal after one response; nothing is retried.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::registrant::Registrant;
use crate::storage::RecordSink;

/// Where a successful registration is redirected.
pub const COMPLETION_PATH: &str = "/completion";

/// Body returned when the passwords differ.
pub const MISMATCH_MESSAGE: &str = "Passwords do not match.";

/// Body returned when the registration could not be stored.
pub const STORE_ERROR_MESSAGE: &str = "There was an error with your registration.";

/// Raw form fields as posted by the registration page.
///
/// Missing fields deserialize as empty strings.
#[derive(Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    /// Chosen user name.
    pub username: String,
    /// Password.
    pub password: String,
    /// Password confirmation; never stored.
    #[serde(rename = "repeatPassword")]
    pub repeat_password: String,
    /// Contact email.
    pub email: String,
    /// Contact phone number.
    pub phone: String,
    /// Gender.
    pub gender: String,
    /// Date of birth.
    pub dob: String,
}

impl std::fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("gender", &self.gender)
            .field("dob", &self.dob)
            .finish_non_exhaustive()
    }
}

impl RegistrationForm {
    /// Turn the submission into a storable record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PasswordMismatch`] if the two password fields differ.
    pub fn validate(self) -> Result<Registrant> {
        if self.password != self.repeat_password {
            return Err(Error::PasswordMismatch);
        }

        Ok(Registrant {
            username: self.username,
            password: self.password,
            email: self.email,
            phone: self.phone,
            gender: self.gender,
            dob: self.dob,
        })
    }
}

/// Terminal result of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The record was stored.
    Success,
    /// The passwords differed; nothing was written.
    Mismatch,
    /// The record could not be stored.
    StoreError,
}

impl Outcome {
    /// Stable label for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Mismatch => "mismatch",
            Self::StoreError => "store-error",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind())
    }
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        match self {
            Self::Success => Redirect::to(COMPLETION_PATH).into_response(),
            Self::Mismatch => (StatusCode::OK, MISMATCH_MESSAGE).into_response(),
            Self::StoreError => (StatusCode::OK, STORE_ERROR_MESSAGE).into_response(),
        }
    }
}

/// Validate a submission and store it.
///
/// Store failures are logged here and reduced to [`Outcome::StoreError`];
/// the underlying error never reaches the client.
pub async fn handle(form: RegistrationForm, sink: &dyn RecordSink) -> Outcome {
    let record = match form.validate() {
        Ok(record) => record,
        Err(err) => {
            warn!(kind = err.kind(), "Registration rejected: {err}");
            return Outcome::Mismatch;
        }
    };

    let username = record.username.clone();
    match sink.append(record).await {
        Ok(()) => {
            info!(%username, "Registration stored");
            Outcome::Success
        }
        Err(err) => {
            error!(%username, kind = err.kind(), "Error writing registration: {err}");
            Outcome::StoreError
        }
    }
}
