use clap::{Args as ClapArgs, Parser, Subcommand};
use memvec_core::codec::parse_vector;
use memvec_core::db;
use memvec_core::{MemvecConfig, PgVectorStore, Scope, VectorStore};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Operator tool for the memvec pgvector store", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "memvec.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check PostgreSQL and the pgvector extension
    Health,
    /// Create the vector table if it does not exist
    Init,
    /// Insert or overwrite one vector
    Store {
        #[arg(long)]
        id: String,
        #[arg(long)]
        sector: String,
        /// Vector in pgvector text form, e.g. "[0.1,0.2,0.3]"
        #[arg(long)]
        vector: String,
        /// Declared dimensionality; defaults to the vector length
        #[arg(long)]
        dim: Option<i64>,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Nearest neighbours within a sector
    Search {
        #[arg(long)]
        sector: String,
        #[arg(long)]
        vector: String,
        #[arg(long, default_value_t = 10)]
        top_k: usize,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Vectors of an id, for one sector or all of them
    Get {
        #[arg(long)]
        id: String,
        #[arg(long)]
        sector: Option<String>,
    },
    /// Every vector in a sector
    Sector {
        #[arg(long)]
        sector: String,
    },
    /// Delete an id from one sector, or from all sectors
    Delete {
        #[arg(long)]
        id: String,
        #[arg(long)]
        sector: Option<String>,
    },
}

#[derive(ClapArgs, Debug, Default)]
struct ScopeArgs {
    #[arg(long = "user")]
    user_id: Option<String>,
    #[arg(long = "agent")]
    agent_id: Option<String>,
    #[arg(long = "session")]
    session_id: Option<String>,
}

impl From<ScopeArgs> for Scope {
    fn from(args: ScopeArgs) -> Self {
        Scope {
            user_id: args.user_id,
            agent_id: args.agent_id,
            session_id: args.session_id,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match MemvecConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    // Connect to DB
    let pool = match db::create_pool(&config.database).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    let table = config.vectors.table.clone();

    match args.command {
        Command::Health => {
            match db::health_check(&pool).await {
                Ok(v) => println!("✅ PostgreSQL connected: {}", v),
                Err(e) => {
                    println!("❌ PostgreSQL connection failed: {}", e);
                    std::process::exit(1);
                }
            }

            match db::check_pgvector(&pool).await {
                Ok(v) => println!("✅ pgvector version: {}", v),
                Err(e) => {
                    println!("❌ pgvector check failed: {}", e);
                    std::process::exit(1);
                }
            }

            println!("✅ memvec DB health check passed");
        }
        Command::Init => {
            db::ensure_schema(&pool, &table).await?;
            println!("✅ Vector table '{}' ready", table);
        }
        Command::Store {
            id,
            sector,
            vector,
            dim,
            scope,
        } => {
            let store = PgVectorStore::with_table(pool, table)?;
            let vector = parse_vector(&vector);
            let dim = dim.unwrap_or(vector.len() as i64);
            store
                .store_vector(&id, &sector, &vector, dim, &scope.into())
                .await?;
            tracing::info!(id = %id, sector = %sector, dim = dim, "Vector stored");
        }
        Command::Search {
            sector,
            vector,
            top_k,
            scope,
        } => {
            let store = PgVectorStore::with_table(pool, table)?;
            let hits = store
                .search_similar(&sector, &parse_vector(&vector), top_k, &scope.into())
                .await?;
            print_json(&hits)?;
        }
        Command::Get { id, sector } => {
            let store = PgVectorStore::with_table(pool, table)?;
            match sector {
                Some(sector) => match store.get_vector(&id, &sector).await? {
                    Some(found) => print_json(&found)?,
                    None => {
                        eprintln!("No vector for id '{}' in sector '{}'", id, sector);
                        std::process::exit(1);
                    }
                },
                None => print_json(&store.get_vectors_by_id(&id).await?)?,
            }
        }
        Command::Sector { sector } => {
            let store = PgVectorStore::with_table(pool, table)?;
            print_json(&store.get_vectors_by_sector(&sector).await?)?;
        }
        Command::Delete { id, sector } => {
            let store = PgVectorStore::with_table(pool, table)?;
            match sector {
                Some(sector) => store.delete_vector(&id, &sector).await?,
                None => store.delete_vectors(&id).await?,
            }
            tracing::info!(id = %id, "Vectors deleted");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_args_parse_scope_flags() {
        let args = Args::try_parse_from([
            "memvec", "search", "--sector", "facts", "--vector", "[0.1,0.2]", "--user", "u1",
            "--session", "s1",
        ])
        .expect("args should parse");

        match args.command {
            Command::Search {
                sector,
                top_k,
                scope,
                ..
            } => {
                assert_eq!(sector, "facts");
                assert_eq!(top_k, 10);
                let scope: Scope = scope.into();
                assert_eq!(scope.user_id(), Some("u1"));
                assert_eq!(scope.agent_id(), None);
                assert_eq!(scope.session_id(), Some("s1"));
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(args.config, "memvec.toml");
    }

    #[test]
    fn test_delete_without_sector_targets_all() {
        let args = Args::try_parse_from(["memvec", "-c", "alt.toml", "delete", "--id", "m1"])
            .expect("args should parse");
        assert_eq!(args.config, "alt.toml");
        assert!(matches!(
            args.command,
            Command::Delete { sector: None, .. }
        ));
    }

    #[test]
    fn test_store_requires_vector() {
        let result = Args::try_parse_from(["memvec", "store", "--id", "m1", "--sector", "facts"]);
        assert!(result.is_err());
    }
}
