use std::process;

use petopia::{
    application::{
        context::FeedContext,
        error::{AppError, FeedError},
        seed,
    },
    config::{self, Command, FeedArgs, PostArgs, SearchArgs},
    domain::ids::{PostId, UserId},
    infra::{bootstrap, error::InfraError, telemetry},
};
use serde::Serialize;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
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
    let (cli_args, settings) = config::load_with_cli().map_err(|err| {
        AppError::from(InfraError::configuration(format!(
            "failed to load configuration: {err}"
        )))
    })?;

    telemetry::init(&settings.logging)?;

    let command = cli_args.command.unwrap_or_default();
    if command == Command::Migrate {
        bootstrap::migrate(&settings.store).await?;
        return Ok(());
    }

    if settings.store.url.is_none() {
        info!("no store.url configured; data lives only for this process");
    }

    let context = FeedContext::connect(&settings).await?;
    let result = execute(&context, command).await;
    context.shutdown().await;
    result
}

async fn execute(context: &FeedContext, command: Command) -> Result<(), AppError> {
    match command {
        Command::Migrate => Ok(()),
        Command::Seed => {
            let report = seed::seed_demo(context).await?;
            print_json(&report)
        }
        Command::Feed(FeedArgs { page }) => print_json(&context.posts.get_page(page).await?),
        Command::Post(PostArgs { id }) => {
            let id = PostId::parse(&id).map_err(FeedError::from)?;
            print_json(&context.posts.get_post(id).await?)
        }
        Command::Search(SearchArgs { keyword, author }) => {
            let posts = match author {
                Some(author) => {
                    let author = UserId::parse(&author).map_err(FeedError::from)?;
                    context
                        .posts
                        .posts_by_author(author, Some(keyword.as_str()))
                        .await?
                }
                None => context.posts.search_posts(&keyword).await?,
            };
            print_json(&posts)
        }
        Command::FlushCache => {
            context.coherence().flush().await;
            info!("cache flushed");
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to render output: {err}")))?;
    println!("{rendered}");
    Ok(())
}
