use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub mongo_database: String,
    pub redis_uri: String,
    pub jwt_secret: String,
    /// Path of the external crossword generator executable.
    pub generator_script: String,
    /// Directory for the immutable puzzle record blobs.
    pub puzzle_dir: String,
    /// Rows in the generator's grid output (fixed external contract).
    pub grid_rows: usize,
    /// Maximum number of pre-revealed cells per puzzle.
    pub reveal_quota: usize,
    pub listen_addr: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let settings = config::Config::builder()
            .add_source(
                config::File::with_name(&format!("config/{}", env)).required(false), // Allow missing config file, fallback to ENV
            )
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or_else(|_| "crossworddb".to_string());

        let redis_uri = settings
            .get_string("redis.uri")
            .or_else(|_| env::var("REDIS_URI"))
            .unwrap_or_else(|_| "redis://127.0.0.1:6379/0".to_string());

        let jwt_secret = settings
            .get_string("auth.jwt_secret")
            .or_else(|_| env::var("JWT_SECRET"))
            .unwrap_or_else(|_| {
                if env == "prod" {
                    panic!("FATAL: JWT_SECRET must be set in production!");
                }
                eprintln!("WARNING: Using default JWT_SECRET (dev mode only!)");
                "dev-secret-only-for-local-testing".to_string()
            });

        let generator_script = settings
            .get_string("generator.script")
            .or_else(|_| env::var("GENERATOR_SCRIPT"))
            .unwrap_or_else(|_| "scripts/crossword-gen.py".to_string());

        let puzzle_dir = settings
            .get_string("puzzles.dir")
            .or_else(|_| env::var("PUZZLE_DIR"))
            .unwrap_or_else(|_| "data/puzzles".to_string());

        let grid_rows = settings
            .get_int("generator.grid_rows")
            .ok()
            .or_else(|| env::var("GRID_ROWS").ok().and_then(|v| v.parse().ok()))
            .filter(|v| *v > 0)
            .unwrap_or(10) as usize;

        let reveal_quota = settings
            .get_int("puzzles.reveal_quota")
            .ok()
            .or_else(|| env::var("REVEAL_QUOTA").ok().and_then(|v| v.parse().ok()))
            .filter(|v: &i64| *v >= 0)
            .map(|v| v as usize)
            .unwrap_or(crate::puzzle::reveal::DEFAULT_REVEAL_QUOTA);

        let listen_addr = settings
            .get_string("server.listen_addr")
            .or_else(|_| env::var("LISTEN_ADDR"))
            .unwrap_or_else(|_| "0.0.0.0:8081".to_string());

        Ok(Config {
            mongo_uri,
            mongo_database,
            redis_uri,
            jwt_secret,
            generator_script,
            puzzle_dir,
            grid_rows,
            reveal_quota,
            listen_addr,
        })
    }
}
