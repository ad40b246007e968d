//! Provider identities and the chat-completions transport.
//!
//! Every supported provider speaks the same chat-completions dialect: a JSON body with
//! a model, a list of messages and sampling options, authenticated with a bearer key.
//! What differs between them is data (the endpoint, the model, the expected shape of
//! the key and a few attribution headers), so providers are described by a static
//! table of [`providers::ProviderConfig`] entries rather than by one implementation per provider.
//! Adding a provider means adding a [`ProviderIdentifier`] variant and a table row.
//!
//! ## Error Handling
//!
//! The endpoint communicates the failure class through the HTTP status; the body is
//! only consulted for a human-readable message. See [`api::Error`].

pub(crate) mod api;
pub(crate) mod apireq;
pub(crate) mod providers;

pub(crate) use self::providers::{CredentialCheck, ProviderIdentifier};
