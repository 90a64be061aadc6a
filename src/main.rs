use std::{net::SocketAddr, process, sync::Arc, time::Duration};

use kindred::{
    application::{
        admin::AdminPostService,
        error::AppError,
        popular::PopularPostsService,
        related::{RelatedPostsConfig, RelatedPostsService},
        repos::{PostsRepo, PostsWriteRepo},
        stats::PostStatsService,
    },
    cache::{
        CacheConfig, CacheService, EventQueue, InvalidationConsumer, InvalidationTrigger,
        KeyValueStore, MemoryStore, RestStore,
    },
    config::{self, CacheBackendKind},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminState, PublicState},
        telemetry,
    },
};
use tokio::try_join;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let app = build_application_context(repositories, &settings)?;

    // Background sweep for events left behind when immediate consumption is
    // interrupted (process restart, panic inside a handler).
    let consume_handle = if app.trigger.config().enabled {
        let trigger = app.trigger.clone();
        let interval_ms = trigger.config().auto_consume_interval_ms;
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
            interval.tick().await; // Skip the first immediate tick
            loop {
                interval.tick().await;
                trigger.consumer().consume().await;
            }
        }))
    } else {
        None
    };

    let result = serve_http(&settings, app.public_state, app.admin_state).await;

    if let Some(handle) = consume_handle {
        handle.abort();
        let _ = handle.await;
    }

    result
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    info!(target = "kindred::migrate", "Migrations applied");
    Ok(())
}

struct ApplicationContext {
    public_state: PublicState,
    admin_state: AdminState,
    trigger: Arc<InvalidationTrigger>,
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_store(settings: &config::Settings) -> Result<Arc<dyn KeyValueStore>, AppError> {
    match settings.cache.backend {
        CacheBackendKind::Memory => Ok(Arc::new(MemoryStore::new(settings.cache.memory_capacity))),
        CacheBackendKind::Rest => {
            let url = settings
                .cache
                .rest_url
                .as_deref()
                .ok_or_else(|| InfraError::configuration("cache.rest_url is not configured"))
                .map_err(AppError::from)?;
            let token = settings
                .cache
                .rest_token
                .as_deref()
                .ok_or_else(|| InfraError::configuration("cache.rest_token is not configured"))
                .map_err(AppError::from)?;

            let store = RestStore::new(
                url,
                token,
                Duration::from_millis(settings.cache.rest_timeout_ms.get()),
            )
            .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?;

            Ok(Arc::new(store))
        }
    }
}

fn build_application_context(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<ApplicationContext, AppError> {
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repositories;

    let cache = Arc::new(CacheService::new(build_store(settings)?));
    let cache_config = CacheConfig::from(&settings.cache);

    let queue = Arc::new(EventQueue::new());
    let consumer = Arc::new(InvalidationConsumer::new(
        cache_config.clone(),
        cache.clone(),
        posts_repo.clone(),
        queue.clone(),
    ));
    let trigger = Arc::new(InvalidationTrigger::new(cache_config, queue, consumer));

    let related = Arc::new(RelatedPostsService::new(
        posts_repo.clone(),
        cache.clone(),
        RelatedPostsConfig {
            min_similarity: settings.engagement.min_similarity,
            cache_limit: settings.engagement.related_cache_limit.get(),
            ttl: Duration::from_secs(settings.engagement.related_ttl_seconds.get()),
        },
    ));
    let stats = Arc::new(PostStatsService::new(
        cache.clone(),
        settings.engagement.max_likes_per_user.get(),
    ));
    let popular = Arc::new(PopularPostsService::new(cache));

    let admin_posts = Arc::new(AdminPostService::new(
        posts_repo.clone(),
        posts_write_repo,
        trigger.clone(),
    ));

    let public_state = PublicState {
        posts: posts_repo,
        related,
        stats,
        popular,
        user_hash_salt: Arc::new(settings.engagement.user_hash_salt.clone()),
    };

    let admin_state = AdminState {
        posts: admin_posts,
        token: settings.admin.token.clone().map(Arc::from),
    };

    Ok(ApplicationContext {
        public_state,
        admin_state,
        trigger,
    })
}

async fn serve_http(
    settings: &config::Settings,
    public_state: PublicState,
    admin_state: AdminState,
) -> Result<(), AppError> {
    let public_router = http::build_public_router(public_state);
    let admin_router = http::build_admin_router(admin_state);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        public = %settings.server.public_addr,
        admin = %settings.server.admin_addr,
        "Listening"
    );

    let public_server = axum::serve(
        public_listener,
        public_router.into_make_service_with_connect_info::<SocketAddr>(),
    );
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service());

    try_join!(public_server, admin_server)
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}
