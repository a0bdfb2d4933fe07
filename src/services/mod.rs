//! Service layer

pub mod access;
pub mod cache;
pub mod identity;
pub mod invites;
pub mod mailer;
pub mod proxy;
pub mod rbac;

pub use access::RouteRequirement;
pub use identity::IdentityClient;
pub use invites::InviteService;
pub use mailer::{Mailer, SmtpMailer};
pub use proxy::StudioForwarder;
pub use rbac::RbacResolver;
