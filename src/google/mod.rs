pub mod gmail;
pub mod oauth;
pub mod provider;
pub mod reply;

pub use oauth::{CredentialResolver, OAuthCredentialResolver};
pub use provider::{Capability, GmailProvider, MailProvider, ProviderError, ProviderErrorKind};
