use std::sync::Arc;

use flowdeck_auth::{ActorDirectory, Hs256TokenCodec, IdentityResolver};
use flowdeck_infra::{Directory, PgActorDirectory, bootstrap, seed, seed_demo};

/// Startup configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub database_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("FLOWDECK_JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("FLOWDECK_JWT_SECRET not set; using insecure dev default");
            "dev-secret".to_string()
        });
        let token_ttl_minutes = std::env::var("FLOWDECK_TOKEN_TTL_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(480);
        let database_url = std::env::var("DATABASE_URL").ok();
        Self {
            jwt_secret,
            token_ttl_minutes,
            database_url,
        }
    }
}

/// Service graph shared by every handler.
pub struct AppServices {
    pub directory: Arc<Directory>,
    pub tokens: Arc<Hs256TokenCodec>,
    pub resolver: Arc<IdentityResolver>,
}

/// Build the full service graph.
///
/// Without `DATABASE_URL` the portal runs entirely in memory and seeds the
/// demo fixture. With it, actor lookups for authentication go to Postgres
/// while the portal catalogs stay process-local.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<Arc<AppServices>> {
    let directory = Arc::new(Directory::new());
    bootstrap(&directory, seed::DEMO_PASSWORD)?;

    let actors: Arc<dyn ActorDirectory> = match &config.database_url {
        Some(url) => {
            tracing::info!("actor directory: postgres");
            Arc::new(PgActorDirectory::connect(url, 5).await?)
        }
        None => {
            seed_demo(&directory)?;
            tracing::info!("actor directory: in-memory, demo fixture seeded");
            directory.clone()
        }
    };

    let tokens = Arc::new(Hs256TokenCodec::new(
        &config.jwt_secret,
        config.token_ttl_minutes,
    ));
    let resolver = Arc::new(IdentityResolver::new(tokens.clone(), actors));

    Ok(Arc::new(AppServices {
        directory,
        tokens,
        resolver,
    }))
}
