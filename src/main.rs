use guild_warden::config::BotConfig;
use guild_warden::handlers::{Handler, cache_settings};
use guild_warden::{BOT_NAME, Data, Error, commands, events, logging};
use poise::serenity_prelude::{self as serenity, GatewayIntents};
use std::process::ExitCode;
use tracing::{error, info, warn};

/// Main function to run the bot
async fn async_main(config: BotConfig) -> Result<(), Error> {
    let token = config.token.clone();
    let prefix = config.prefix.clone();
    let test_guilds = config.test_guilds.clone();
    let data = Data::load(config).await;
    info!(
        prefix = %prefix,
        policy = data.policy.name(),
        data_dir = %data.storage.data_dir.display(),
        "Starting {BOT_NAME}"
    );

    let framework_data = data.clone();
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(prefix),
                ..Default::default()
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    logging::log_command_start(ctx);
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    logging::log_command_end(ctx);
                })
            },
            on_error: |error| Box::pin(events::on_command_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                let commands = &framework.options().commands;
                if test_guilds.is_empty() {
                    poise::builtins::register_globally(ctx, commands).await?;
                    logging::log_console("Registered commands globally");
                } else {
                    for guild_id in &test_guilds {
                        poise::builtins::register_in_guild(ctx, commands, *guild_id).await?;
                    }
                    logging::log_console(format!(
                        "Registered commands in {} test guild(s)",
                        test_guilds.len()
                    ));
                }
                Ok(framework_data)
            })
        })
        .build();

    let intents = GatewayIntents::non_privileged()
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MEMBERS;
    let mut client = serenity::ClientBuilder::new(token, intents)
        .cache_settings(cache_settings())
        .event_handler(Handler::new(data))
        .framework(framework)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                logging::log_console("Interrupted, closing shards");
                shard_manager.shutdown_all().await;
            }
            Err(e) => warn!(error = %e, "Could not listen for ctrl-c"),
        }
    });

    info!("Starting bot...");
    client.start().await?;
    Ok(())
}

fn main() -> ExitCode {
    if let Err(e) = logging::init() {
        eprintln!("Could not initialize logging: {e}");
    }

    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Check your .env file");
            eprintln!("❌  {e}.  Check your .env file.");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Could not start the async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(async_main(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Bot stopped with an error");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
