//! Console Gateway Library
//!
//! Trusted-proxy authentication gateway for the admin console: terminates
//! end-user JWTs against the identity provider, resolves and caches RBAC
//! contexts, enforces per-route requirements, rate-limits sensitive
//! endpoints, manages invite tokens, and forwards authorized requests to the
//! studio service under a trusted header envelope.

use std::sync::Arc;

use anyhow::Result;

pub mod api;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use db::DbPool;
use services::{
    IdentityClient, InviteService, Mailer, RbacResolver, StudioForwarder,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Database connection pool
    pub db: DbPool,
    /// Identity provider client
    pub identity: IdentityClient,
    /// RBAC resolver with its TTL cache
    pub rbac: RbacResolver,
    /// Invite token lifecycle manager
    pub invites: InviteService,
    /// Trusted proxy forwarder to the studio service
    pub studio: StudioForwarder,
}

impl AppState {
    /// Wire up the application state from configuration, an initialized
    /// database pool, and an optional mailer.
    pub fn new(config: AppConfig, db: DbPool, mailer: Option<Arc<dyn Mailer>>) -> Result<Self> {
        let identity = IdentityClient::new(&config.identity)?;
        let rbac = RbacResolver::new(db.clone(), &config.cache);
        let invites = InviteService::new(
            db.clone(),
            config.invites.clone(),
            mailer,
            rbac.clone(),
        );
        let studio = StudioForwarder::new(&config.studio)?;

        Ok(Self {
            config,
            db,
            identity,
            rbac,
            invites,
            studio,
        })
    }
}
