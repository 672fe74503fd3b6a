use crate::auth::{
    jwt::JwtKeys,
    repo::{MemoryUserRepo, PgUserRepo, UserRepo},
    AuthService,
};
use crate::config::AppConfig;
use crate::db;
use crate::timer::{
    repo::{MemoryTimerEntryRepo, PgTimerEntryRepo, TimerEntryRepo},
    TimerService,
};
use axum::extract::FromRef;
use std::sync::Arc;
use tracing::{info, info_span, warn};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: AuthService,
    pub timer: TimerService,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        match config.database_url.clone() {
            Some(url) => {
                let pool = db::connect(&config, &url).await?;
                info!("using postgres store");
                Ok(Self::from_parts(
                    config,
                    Arc::new(PgUserRepo::new(pool.clone())),
                    Arc::new(PgTimerEntryRepo::new(pool)),
                ))
            }
            None => {
                warn!("DATABASE_URL not set; using in-memory store, data is lost on restart");
                Ok(Self::in_memory(config))
            }
        }
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserRepo>,
        entries: Arc<dyn TimerEntryRepo>,
    ) -> Self {
        let auth = AuthService::new(
            users,
            JwtKeys::from(&config.jwt),
            info_span!("auth_service"),
        );
        let timer = TimerService::new(entries, info_span!("timer_service"));
        Self {
            config,
            auth,
            timer,
        }
    }

    pub fn in_memory(config: Arc<AppConfig>) -> Self {
        Self::from_parts(
            config,
            Arc::new(MemoryUserRepo::new()),
            Arc::new(MemoryTimerEntryRepo::new()),
        )
    }
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<AppState> for TimerService {
    fn from_ref(state: &AppState) -> Self {
        state.timer.clone()
    }
}
