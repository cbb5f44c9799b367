//! Session state and authenticated requests for the GFS API.
//!
//! A [`SessionStore`] holds the bearer token and the signed-in user, mirrors
//! both into a [`KeyValueStore`](storage::KeyValueStore), and exposes them as
//! observables. An [`AuthenticatedRequest`] wraps a [`Transport`] and attaches
//! the current token to every request. [`AuthApi`] builds the account calls
//! (login, logout, signup) on top of both.

#![cfg_attr(not(test), forbid(unsafe_code))]

mod api;
mod error;
pub mod observable;
mod request;
mod session;
pub mod storage;
mod transport;

#[cfg(test)]
mod testing;

pub use api::AuthApi;
pub use error::{ApiError, SessionError, TransportError};
pub use observable::{Derived, Observable, Subscription};
pub use request::{AuthenticatedRequest, ResponseHook};
pub use session::{SessionStore, TOKEN_KEY, USER_KEY};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, RequestOptions, Transport};
