use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use distribuidora_api::{
    config::{self, AppConfig},
    db::{self, DbPool},
    entities::user::Role,
    services::{
        companies::{CompanyInput, CompanyService},
        users::{CreateUserRequest, UserService},
    },
};

#[derive(Parser)]
#[command(name = "distribuidora-cli", about = "Administrative tasks for the distribuidora API")]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply every pending database migration
    Migrate,
    /// Register a new company (tenant)
    CreateCompany(CreateCompanyArgs),
    /// Create a user inside an existing company
    CreateUser(CreateUserArgs),
}

#[derive(Args)]
struct CreateCompanyArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    trade_name: Option<String>,
    #[arg(long)]
    cnpj: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long, help = "Two-letter UF, e.g. SP")]
    state: Option<String>,
}

#[derive(Args)]
struct CreateUserArgs {
    #[arg(long)]
    company_id: Uuid,
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    #[arg(long, default_value = "operator", help = "admin, manager or operator")]
    role: Role,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate => {
            db::run_migrations(&context.db)
                .await
                .context("failed to run migrations")?;
            println!("Migrations applied");
        }
        Commands::CreateCompany(args) => create_company(&context, args, cli.json).await?,
        Commands::CreateUser(args) => create_user(&context, args, cli.json).await?,
    }

    Ok(())
}

struct CliContext {
    _config: AppConfig,
    db: Arc<DbPool>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(&config.log_level, config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;

        Ok(Self {
            _config: config,
            db: Arc::new(db_pool),
        })
    }
}

async fn create_company(context: &CliContext, args: CreateCompanyArgs, json: bool) -> Result<()> {
    let service = CompanyService::new(context.db.clone());
    let company = service
        .create(CompanyInput {
            name: args.name,
            trade_name: args.trade_name,
            cnpj: args.cnpj,
            email: args.email,
            city: args.city,
            state: args.state,
            ..Default::default()
        })
        .await
        .context("failed to create company")?;

    if json {
        print_json(&company)?;
    } else {
        println!("Company {} created: {}", company.name, company.id);
    }
    Ok(())
}

async fn create_user(context: &CliContext, args: CreateUserArgs, json: bool) -> Result<()> {
    let service = UserService::new(context.db.clone());
    let user = service
        .create(
            args.company_id,
            CreateUserRequest {
                name: args.name,
                email: args.email,
                password: args.password,
                role: args.role,
            },
        )
        .await
        .context("failed to create user")?;

    if json {
        print_json(&user)?;
    } else {
        println!("User {} <{}> created as {}: {}", user.name, user.email, user.role, user.id);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
