//! Hosted REST backends.
//!
//! [`HttpAuthProvider`] speaks the GoTrue auth API and [`HttpRecordStore`]
//! the PostgREST table API, as exposed by a Supabase-style project under
//! `/auth/v1` and `/rest/v1`. Both share one [`HttpApi`] client.
//!
//! # Example
//!
//! ```no_run
//! use kodbank_account::http::HttpApi;
//!
//! let api = HttpApi::new("https://abc.supabase.co", "anon-key")?
//!     .service_role_key("service-role-key");
//! let provider = api.auth_provider();
//! let store = api.record_store();
//! # Ok::<(), kodbank_account::AccountError>(())
//! ```
//!
//! # Tables
//!
//! `kod_users(uid, user_id, username, email, phone, balance, role)` with a
//! server-side default for `uid`, and `user_tokens(token, uid, expiry)` with
//! `expiry` as `timestamptz`.

mod api;
mod provider;
mod store;
mod wire;

pub use api::HttpApi;
pub use provider::HttpAuthProvider;
pub use store::HttpRecordStore;
