//! Data models

pub mod envelope;
pub mod identity;
pub mod invite;
pub mod rbac;
pub mod user;

pub use envelope::TrustedEnvelope;
pub use identity::Identity;
pub use invite::{
    ConsumeInviteRequest, CreateInviteRequest, CreateInviteResponse, InviteStatus, InviteToken,
    InviteTokenPublic, ValidateInviteRequest, ValidateInviteResponse,
};
pub use rbac::{Permission, RbacContext, RbacRejection};
pub use user::{Profile, User};
