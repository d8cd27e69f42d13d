//! Ghostpub server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use apalis::prelude::*;
use axum::{
    routing::{get, post},
    Router,
};
use fred::interfaces::ClientLike;
use ghostpub_common::{ApUrls, Config};
use ghostpub_core::events::EventBus;
use ghostpub_core::ports::{NoOpImageVerifier, NoOpJobQueue, SharedJobQueue, SharedResolver};
use ghostpub_core::services::{
    AccountService, CountsRefresher, FeedService, ModerationService, PostService,
};
use ghostpub_db::entities::site;
use ghostpub_db::repositories::{
    AccountRepository, BlockRepository, FeedRepository, FollowRepository, NotificationRepository,
    OutboxRepository, PostRepository, SiteRepository,
};
use ghostpub_db::{SharedObjectStore, SqlObjectStore};
use ghostpub_federation::{
    actor_handler, followers_handler, following_handler, inbox_handler, liked_handler,
    nodeinfo_2_1, object_handler, outbox_handler, post_published_handler, webfinger_handler,
    well_known_nodeinfo, AcceptProcessor, ActivitySender, ActorState, AnnounceProcessor,
    ApResolver, CollectionState, CreateProcessor, DeleteProcessor, DeliveryBridge, FetchSigner,
    FollowProcessor, InboxState, LikeProcessor, NodeInfoState, ObjectState, Processors,
    SignatureVerifier, UndoProcessor, UpdateProcessor, WebfingerState, WebhookState,
};
use ghostpub_queue::{
    deliver_worker, fedify_push_handler, ghost_push_handler, inbox_worker, run_scheduler,
    CountsRefreshJob, DeliverContext, DeliverJob, InboxContext, InboxJob, PushState,
    RedisJobQueue, RedisObjectStore, RetryConfig, SchedulerConfig,
};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// Handle of the site's default actor.
const SITE_HANDLE: &str = "index";

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ghostpub=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting ghostpub server...");

    // Boot-time configuration failure exits non-zero.
    let config = Config::load()?;
    let urls = ApUrls::new(Url::parse(&config.server.url)?);

    // Database
    let db = ghostpub_db::init(&config).await?;
    info!("Connected to database");
    ghostpub_db::migrate(&db).await?;
    info!("Migrations completed");
    let db = Arc::new(db);

    // Repositories
    let account_repo = AccountRepository::new(Arc::clone(&db));
    let site_repo = SiteRepository::new(Arc::clone(&db));
    let post_repo = PostRepository::new(Arc::clone(&db));
    let follow_repo = FollowRepository::new(Arc::clone(&db));
    let block_repo = BlockRepository::new(Arc::clone(&db));
    let feed_repo = FeedRepository::new(Arc::clone(&db));
    let outbox_repo = OutboxRepository::new(Arc::clone(&db));
    let notification_repo = NotificationRepository::new(Arc::clone(&db));

    // Object store: SQL by default, Redis when configured.
    let redis_url = config.redis.url();
    let store: SharedObjectStore = match (config.kv.store_type, &redis_url) {
        (ghostpub_common::config::KvStoreType::Redis, Some(url)) => {
            let fred_config = fred::types::config::Config::from_url(url)?;
            let client = fred::clients::Client::new(fred_config, None, None, None);
            client.connect();
            client.wait_for_connect().await?;
            info!("Connected to Redis object store");
            Arc::new(RedisObjectStore::new(Arc::new(client)))
        }
        (ghostpub_common::config::KvStoreType::Redis, None) => {
            warn!("Redis KV requested but no Redis configured; using SQL store");
            Arc::new(SqlObjectStore::new(Arc::clone(&db)))
        }
        _ => Arc::new(SqlObjectStore::new(Arc::clone(&db))),
    };

    // Job queue: apalis over Redis, or a no-op in single-process dev.
    let http_timeout = Duration::from_secs(config.federation.http_timeout_secs);
    let mut queue_parts: Option<(
        RedisJobQueue,
        apalis_redis::RedisStorage<DeliverJob>,
        apalis_redis::RedisStorage<DeliverJob>,
        apalis_redis::RedisStorage<InboxJob>,
    )> = None;
    if let Some(url) = &redis_url {
        let redis_client = redis::Client::open(url.as_str())?;
        let redis_conn = redis::aio::ConnectionManager::new(redis_client).await?;
        let deliver_storage = apalis_redis::RedisStorage::new_with_config(
            redis_conn.clone(),
            apalis_redis::Config::default().set_namespace(&config.queue.topic),
        );
        let retry_storage = apalis_redis::RedisStorage::new_with_config(
            redis_conn.clone(),
            apalis_redis::Config::default().set_namespace(&config.queue.retry_topic),
        );
        let inbox_storage = apalis_redis::RedisStorage::new_with_config(
            redis_conn,
            apalis_redis::Config::default().set_namespace("ghostpub-inbox"),
        );
        info!(
            topic = %config.queue.topic,
            retry_topic = %config.queue.retry_topic,
            "Connected to Redis job queue"
        );
        queue_parts = Some((
            RedisJobQueue::new(
                deliver_storage.clone(),
                retry_storage.clone(),
                inbox_storage.clone(),
            ),
            deliver_storage,
            retry_storage,
            inbox_storage,
        ));
    } else {
        warn!("No Redis configured; deliveries are disabled");
    }
    let queue: SharedJobQueue = match &queue_parts {
        Some((queue, ..)) => Arc::new(queue.clone()),
        None => Arc::new(NoOpJobQueue),
    };

    // Event bus
    let bus = Arc::new(EventBus::new());

    // Bootstrap the site and its default account with an unsigned
    // resolver, then rebuild the resolver with the actor's key.
    let unsigned_resolver: SharedResolver = Arc::new(ApResolver::new(
        config.server.url.as_str(),
        http_timeout,
        None,
        config.federation.allow_private_address,
    ));
    let bootstrap_accounts = AccountService::new(
        account_repo.clone(),
        site_repo.clone(),
        follow_repo.clone(),
        notification_repo.clone(),
        unsigned_resolver,
        urls.clone(),
        bus.clone(),
    );

    let host = urls.host().to_string();
    let site = match site_repo.find_by_host(&host).await? {
        Some(site) => site,
        None => {
            info!(host = %host, "Provisioning site");
            site_repo
                .create(site::ActiveModel {
                    host: sea_orm::Set(host.clone()),
                    webhook_secret: sea_orm::Set(uuid::Uuid::new_v4().to_string()),
                    ghost_pro: sea_orm::Set(false),
                    created_at: sea_orm::Set(chrono::Utc::now()),
                    ..Default::default()
                })
                .await?
        }
    };
    let default_account = bootstrap_accounts
        .ensure_internal_account(&site, SITE_HANDLE)
        .await?;
    info!(account_id = default_account.id, "Default actor ready");

    let signer = default_account.private_key.clone().map(|pem| FetchSigner {
        key_id: format!("{}#main-key", default_account.ap_id),
        private_key_pem: pem,
    });
    let resolver: SharedResolver = Arc::new(ApResolver::new(
        config.server.url.as_str(),
        http_timeout,
        signer,
        config.federation.allow_private_address,
    ));

    // Services
    let accounts = AccountService::new(
        account_repo.clone(),
        site_repo.clone(),
        follow_repo.clone(),
        notification_repo.clone(),
        resolver.clone(),
        urls.clone(),
        bus.clone(),
    );
    let moderation = ModerationService::new(
        account_repo.clone(),
        block_repo.clone(),
        follow_repo.clone(),
        bus.clone(),
    );
    let posts = PostService::new(
        post_repo.clone(),
        account_repo.clone(),
        accounts.clone(),
        moderation.clone(),
        resolver.clone(),
        Arc::new(NoOpImageVerifier),
        urls.clone(),
        bus.clone(),
    );
    let feeds = FeedService::new(
        feed_repo,
        follow_repo.clone(),
        account_repo.clone(),
        post_repo.clone(),
        moderation.clone(),
        bus.clone(),
    );
    let sender = ActivitySender::new(follow_repo.clone(), queue.clone());
    let bridge = DeliveryBridge::new(
        account_repo.clone(),
        store.clone(),
        sender.clone(),
        urls.clone(),
    );

    // Fan-out and delivery run as awaited bus subscribers, so saves only
    // return once their side effects are done.
    bus.subscribe(Arc::new(feeds)).await;
    bus.subscribe(Arc::new(bridge)).await;

    // Inbox processors
    let processors = Processors {
        follow: FollowProcessor::new(
            accounts.clone(),
            account_repo.clone(),
            moderation.clone(),
            store.clone(),
            sender.clone(),
            urls.clone(),
        ),
        accept: AcceptProcessor::new(accounts.clone(), account_repo.clone(), store.clone()),
        create: CreateProcessor::new(
            posts.clone(),
            post_repo.clone(),
            account_repo.clone(),
            notification_repo.clone(),
            store.clone(),
        ),
        announce: AnnounceProcessor::new(
            accounts.clone(),
            posts.clone(),
            account_repo.clone(),
            follow_repo.clone(),
            notification_repo.clone(),
            resolver.clone(),
            store.clone(),
            SITE_HANDLE.to_string(),
        ),
        like: LikeProcessor::new(
            accounts.clone(),
            posts.clone(),
            account_repo.clone(),
            notification_repo.clone(),
            store.clone(),
        ),
        undo: UndoProcessor::new(
            accounts.clone(),
            posts.clone(),
            account_repo.clone(),
            store.clone(),
        ),
        delete: DeleteProcessor::new(posts.clone(), account_repo.clone()),
        update: UpdateProcessor::new(accounts.clone(), posts.clone(), account_repo.clone()),
    };

    // Worker contexts
    let user_agent = format!("ghostpub/{}", env!("CARGO_PKG_VERSION"));
    let retry_config = RetryConfig {
        max_delivery_attempts: config.queue.max_delivery_attempts,
        ..RetryConfig::default()
    };
    let retry_queue = if config.queue.use_retry_topic {
        queue_parts.as_ref().map(|(queue, ..)| queue.clone())
    } else {
        None
    };
    let deliver_ctx = DeliverContext::new(
        account_repo.clone(),
        user_agent,
        retry_config,
        retry_queue,
    );
    let inbox_ctx = InboxContext::new(processors);

    // Handler states
    let verifier = SignatureVerifier::new(
        account_repo.clone(),
        resolver.clone(),
        config.federation.skip_signature_verification,
    );
    let inbox_state = InboxState::new(queue.clone(), verifier);
    let actor_state = ActorState {
        account_repo: account_repo.clone(),
        urls: urls.clone(),
    };
    let collection_state = CollectionState {
        account_repo: account_repo.clone(),
        follow_repo: follow_repo.clone(),
        outbox_repo,
        post_repo: post_repo.clone(),
        urls: urls.clone(),
    };
    let object_state = ObjectState {
        store: store.clone(),
        urls: urls.clone(),
    };
    let webfinger_state = WebfingerState {
        account_repo: account_repo.clone(),
        urls: urls.clone(),
    };
    let nodeinfo_state = NodeInfoState { urls: urls.clone() };
    let webhook_state = WebhookState {
        site_repo,
        accounts,
        posts: posts.clone(),
        urls: urls.clone(),
        site_handle: SITE_HANDLE.to_string(),
        allowed_source_ips: config.federation.ghost_pro_ip_addresses.clone(),
    };
    let push_state = PushState {
        deliver_ctx: deliver_ctx.clone(),
        inbox_ctx: inbox_ctx.clone(),
        push_token: config.queue.push_token.clone(),
    };

    // Router
    let ap_routes = Router::new()
        .route("/inbox", post(inbox_handler).with_state(inbox_state.clone()))
        .route(
            "/inbox/{handle}",
            post(inbox_handler).with_state(inbox_state),
        )
        .route(
            "/users/{handle}",
            get(actor_handler).with_state(actor_state),
        )
        .route(
            "/followers/{handle}",
            get(followers_handler).with_state(collection_state.clone()),
        )
        .route(
            "/following/{handle}",
            get(following_handler).with_state(collection_state.clone()),
        )
        .route(
            "/outbox/{handle}",
            get(outbox_handler).with_state(collection_state.clone()),
        )
        .route(
            "/liked/{handle}",
            get(liked_handler).with_state(collection_state),
        )
        .route(
            "/nodeinfo/2.1",
            get(nodeinfo_2_1).with_state(nodeinfo_state.clone()),
        )
        .route(
            "/webhooks/post/published",
            post(post_published_handler).with_state(webhook_state),
        )
        .route(
            "/pubsub/ghost/push",
            post(ghost_push_handler).with_state(push_state.clone()),
        )
        .route(
            "/pubsub/fedify/push",
            post(fedify_push_handler).with_state(push_state),
        )
        .route(
            "/{kind}/{id}",
            get(object_handler).with_state(object_state),
        );

    let app = Router::new()
        .route(
            "/.well-known/webfinger",
            get(webfinger_handler).with_state(webfinger_state),
        )
        .route(
            "/.well-known/nodeinfo",
            get(well_known_nodeinfo).with_state(nodeinfo_state),
        )
        .nest(ghostpub_common::AP_BASE_PATH, ap_routes)
        .layer(TraceLayer::new_for_http());

    // Workers
    if let Some((_, deliver_storage, retry_storage, inbox_storage)) = queue_parts {
        info!("Starting queue workers...");
        let deliver_ctx_primary = deliver_ctx.clone();
        let deliver_ctx_retry = deliver_ctx;
        let inbox_ctx_worker = inbox_ctx;

        tokio::spawn(async move {
            let monitor = Monitor::new()
                .register(
                    WorkerBuilder::new("deliver")
                        .data(deliver_ctx_primary)
                        .backend(deliver_storage)
                        .build_fn(deliver_worker),
                )
                .register(
                    WorkerBuilder::new("deliver-retry")
                        .data(deliver_ctx_retry)
                        .backend(retry_storage)
                        .build_fn(deliver_worker),
                )
                .register(
                    WorkerBuilder::new("inbox")
                        .data(inbox_ctx_worker)
                        .backend(inbox_storage)
                        .build_fn(inbox_worker),
                );

            if let Err(e) = monitor.run().await {
                tracing::error!(error = %e, "Queue workers failed");
            }
        });
        info!("Queue workers started");
    }

    // Interaction-counts refresher
    let refresher = CountsRefresher::new(
        post_repo.clone(),
        account_repo,
        posts,
        resolver,
    );
    let refresh_job = Arc::new(CountsRefreshJob::new(
        post_repo,
        refresher,
        SchedulerConfig::default(),
    ));
    tokio::spawn(async move {
        run_scheduler(refresh_job).await;
    });
    info!("Counts refresher scheduled");

    // Serve
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}
