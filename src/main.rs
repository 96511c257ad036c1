use activity::{ActivityKind, ActivityLogger};
use config::Config;
use events::EventManager;
use gateway::SerenityGateway;
use modules::{
    channels::task::ConfirmationSweepTask,
    router::{handler::CommandHandler, Router},
    system::{
        events::{GuildCountHandler, ReadyHandler},
        health::{start_health_server, HealthState},
    },
};
use poise::serenity_prelude::{self as serenity, CreateAllowedMentions};
use serde_json::json;
use std::sync::Arc;
use tasks::TaskManager;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod activity;
mod bulk;
mod command;
mod config;
mod events;
mod gateway;
#[cfg(test)]
mod mock;
mod modules;
mod tasks;
mod utils;

#[derive(Clone, Debug)]
pub struct Data {
    pub task_manager: Arc<TaskManager>,
    pub event_manager: Arc<EventManager>,
    pub activity: ActivityLogger,
}

type Error = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bulkbot=info,info")),
        )
        .init();
    info!("starting bulkbot");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "prefix {:?}, channel delay {:?}, message delay {:?}",
        config.settings.prefix,
        config.settings.throttle.channels.delay(),
        config.settings.throttle.messages.delay()
    );

    let activity = ActivityLogger::from_path(config.activity_log.clone());
    let health = HealthState::new();

    let port = config.port;
    let server_state = health.clone();
    tokio::spawn(async move {
        if let Err(e) = start_health_server(server_state, port).await {
            error!("Health check server on port {} failed: {}", port, e);
        }
    });

    let task_manager = Arc::new(TaskManager::new());
    let event_manager = Arc::new(EventManager::new(activity.clone()));
    let settings = config.settings.clone();

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    let data = Data {
        task_manager: task_manager.clone(),
        event_manager,
        activity: activity.clone(),
    };

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions::<Data, Error> {
            allowed_mentions: Some(CreateAllowedMentions::new().empty_roles().empty_users()),
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::EventHandler {
                            error, framework, ..
                        } => {
                            error!("Event handler error: {}", error);
                            framework.user_data.activity.log(
                                ActivityKind::ClientError,
                                json!({ "error": error.to_string() }),
                            );
                        }
                        err => error!("Other framework error: {:?}", err),
                    }
                })
            },
            event_handler: |ctx, event, _framework, data| {
                Box::pin(async move {
                    data.event_manager.handle_event(ctx, event).await;
                    Ok(())
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, _framework| {
            Box::pin(async move {
                let gateway = Arc::new(SerenityGateway::new(ctx.http.clone(), ctx.cache.clone()));
                let router = Arc::new(Router::new(
                    gateway,
                    settings.clone(),
                    data.activity.clone(),
                ));

                data.event_manager
                    .add_handler(ReadyHandler::new(
                        settings.prefix.clone(),
                        data.activity.clone(),
                        health.clone(),
                    ))
                    .await;
                data.event_manager
                    .add_handler(GuildCountHandler::new(health))
                    .await;
                data.event_manager
                    .add_handler(CommandHandler::new(router.clone()))
                    .await;

                data.task_manager
                    .add_task(ConfirmationSweepTask::new(router.confirmations()))
                    .await;
                data.task_manager.start_tasks(ctx.clone()).await;

                Ok(data)
            })
        })
        .build();

    let mut client = match serenity::ClientBuilder::new(&config.token, intents)
        .framework(framework)
        .await
    {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build client: {}", e);
            activity.log(ActivityKind::ClientError, json!({ "error": e.to_string() }));
            activity.flush().await;
            std::process::exit(1);
        }
    };

    let shard_manager = client.shard_manager.clone();

    tokio::select! {
        result = client.start() => {
            if let Err(e) = result {
                error!("Failed to log in: {}", e);
                activity.log(ActivityKind::ClientError, json!({ "error": e.to_string() }));
                activity.flush().await;
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            task_manager.shutdown().await;
            shard_manager.shutdown_all().await;
        }
    }

    activity.flush().await;
}
