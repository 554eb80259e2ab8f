use std::{error::Error, sync::Arc};

use clap::{Parser, Subcommand};
use recipe_api::{
    cryptography::{hash_password, verify_password},
    jwt::SessionKeys,
    memory::MemoryStore,
    routes::{api, Context},
    store::{EntityStore, PgStore},
    Config, DatabaseUrl, MediaStorage,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Parser)]
#[command(name = "recipe-api")]
#[command(about = "Per-user recipe, tag and ingredient REST API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Creates this user on startup and logs a token for it
        #[arg(long, env = "SEED_USER_EMAIL", requires = "seed_password")]
        seed_email: Option<String>,

        #[arg(long, env = "SEED_USER_PASSWORD", hide_env_values = true)]
        seed_password: Option<String>,
    },
    /// Register a user in the configured database
    CreateUser {
        #[arg(long)]
        email: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        password: String,
    },
    /// Print an API token for an existing user
    Token {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },
}

fn store_error(error: potion::Error) -> BoxError {
    format!(
        "store error {}: {}",
        error.code,
        error.info.unwrap_or_default()
    )
    .into()
}

async fn open_store(config: &Config) -> Result<Arc<dyn EntityStore>, BoxError> {
    match &config.database_url {
        DatabaseUrl::Memory => {
            log::warn!("> Using the in-memory store; data is lost on shutdown");
            Ok(Arc::new(MemoryStore::new()))
        }
        DatabaseUrl::Postgres(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(url)
                .await?;

            sqlx::migrate!("./migrations").run(&pool).await?;
            log::info!("> Connected to database, migrations applied");

            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

async fn create_user(
    store: &dyn EntityStore,
    email: &str,
    name: &str,
    password: &str,
) -> Result<(), BoxError> {
    let password_hash = hash_password(password).map_err(|e| e.to_string())?;
    let user = store
        .register_user(email, name, &password_hash)
        .await
        .map_err(store_error)?
        .ok_or_else(|| format!("a user with email {email} already exists"))?;

    log::info!("> Registered user {} <{}>", user.id, user.email);
    Ok(())
}

async fn issue_token(
    store: &dyn EntityStore,
    keys: &SessionKeys,
    email: &str,
    password: &str,
) -> Result<String, BoxError> {
    let user = store
        .get_user_by_email(email)
        .await
        .map_err(store_error)?
        .filter(|user| user.is_active)
        .ok_or("unknown or inactive user")?;

    if !verify_password(password, &user.password).map_err(|e| e.to_string())? {
        return Err("wrong password".into());
    }

    let token = keys.generate_jwt_session(&user).map_err(|e| e.to_string())?;
    Ok(token)
}

async fn serve(
    config: Config,
    store: Arc<dyn EntityStore>,
    keys: SessionKeys,
    seed: Option<(String, String)>,
) -> Result<(), BoxError> {
    if let Some((email, password)) = seed {
        if store.get_user_by_email(&email).await.map_err(store_error)?.is_none() {
            create_user(store.as_ref(), &email, &email, &password).await?;
        }
        let token = issue_token(store.as_ref(), &keys, &email, &password).await?;
        log::info!("> Token for {email}: {token}");
    }

    tokio::fs::create_dir_all(&config.media_root).await?;

    let context = Context::new(
        store,
        keys,
        MediaStorage::new(&config.media_root),
        config.max_upload_bytes,
    );

    let (address, server) = warp::serve(api(context)).try_bind_with_graceful_shutdown(
        config.bind_address,
        async {
            tokio::signal::ctrl_c().await.ok();
            log::info!("> Shutting down");
        },
    )?;

    log::info!("> Listening on http://{address}");
    server.await;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("recipe_api=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let keys = SessionKeys::new(config.jwt_secret.as_bytes(), config.token_ttl)?;
    let store = open_store(&config).await?;

    match cli.command.unwrap_or(Commands::Serve {
        seed_email: None,
        seed_password: None,
    }) {
        Commands::Serve {
            seed_email,
            seed_password,
        } => serve(config, store, keys, seed_email.zip(seed_password)).await,
        Commands::CreateUser {
            email,
            name,
            password,
        } => create_user(store.as_ref(), &email, &name, &password).await,
        Commands::Token { email, password } => {
            let token = issue_token(store.as_ref(), &keys, &email, &password).await?;
            println!("{token}");
            Ok(())
        }
    }
}
