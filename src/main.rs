//! QuickDesk helpdesk API server

use quickdesk::SUGGESTION_SENDER;
use quickdesk::api;
use quickdesk::core;
use quickdesk::core::assistant::CompletionClient;
use quickdesk::core::session::SessionRegistry;
use quickdesk::core::services::{
    MyCategoryService, MySessionService, MyTicketService, MyUserService, QueuedReplySuggester,
};
use quickdesk::infrastructure::database::DatabaseConnection;
use quickdesk::infrastructure::identity::RestIdentityProvider;
use quickdesk::infrastructure::repositories::{
    DbCategoryRepository, DbTicketRepository, DbUserRepository,
};
use quickdesk::infrastructure::settings::{LlmSettings, ServerSettings};

use anyhow::anyhow;
use axum::Router;
use axum::http::{HeaderValue, Method};
use di::{Injectable, ServiceCollection};
use di_axum::RouterServiceProviderExtensions;
use log::info;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};

fn main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt::init();

    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;

    // background task for reply suggestions
    let llm_settings = LlmSettings::from_env();
    let (task_sender, task_receiver) = mpsc::channel(llm_settings.queue_size);
    let assistant_join_handle = runtime.spawn(core::assistant::background_task(
        task_receiver,
        CompletionClient::new(llm_settings),
    ));
    SUGGESTION_SENDER
        .set(task_sender)
        .map_err(|_| anyhow!("suggestion sender already set"))?;

    let web_task_handle = runtime.spawn(web_server_task(ServerSettings::from_env()));

    runtime.block_on(async {
        web_task_handle.await??;
        assistant_join_handle.await?;
        Ok::<_, anyhow::Error>(())
    })
}

async fn web_server_task(settings: ServerSettings) -> anyhow::Result<()> {
    let provider = ServiceCollection::new()
        .add(DatabaseConnection::singleton())
        .add(DbUserRepository::scoped())
        .add(DbCategoryRepository::scoped())
        .add(DbTicketRepository::scoped())
        .add(RestIdentityProvider::singleton())
        .add(QueuedReplySuggester::singleton())
        .add(SessionRegistry::singleton())
        .add(MySessionService::scoped())
        .add(MyTicketService::scoped())
        .add(MyCategoryService::scoped())
        .add(MyUserService::scoped())
        .build_provider()
        .map_err(|e| anyhow!("invalid service registrations: {e:?}"))?;

    let connection = provider.get_required::<DatabaseConnection>();
    sqlx::migrate!().run(&**connection).await?;

    let allowed_origins = settings
        .allowed_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;

    let app = Router::new()
        .nest("/auth", api::auth::router())
        .nest("/tickets", api::tickets::router())
        .nest("/categories", api::categories::router())
        .nest("/users", api::users::router())
        .layer(
            CorsLayer::new()
                .allow_headers(Any)
                .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
                .allow_origin(allowed_origins),
        )
        .with_provider(provider);

    let listener = tokio::net::TcpListener::bind(&settings.listen_address).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    info!("Shutting down...");

    Ok(())
}
