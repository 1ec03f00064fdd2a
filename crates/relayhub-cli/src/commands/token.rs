//! Development token issuance.

use clap::Args;

use relayhub_auth::JwtEncoder;
use relayhub_core::config::AuthConfig;
use relayhub_core::error::AppError;
use relayhub_core::types::Identity;

#[derive(Debug, Args)]
pub struct TokenArgs {
    /// HMAC secret the gateway validates with (`JWT_SECRET`)
    #[arg(long)]
    pub secret: String,
    /// Issuer claim (`JWT_ISSUER`)
    #[arg(long, default_value = "issuer")]
    pub issuer: String,
    /// User id
    #[arg(long)]
    pub id: i64,
    /// Username
    #[arg(long)]
    pub username: String,
    /// Hardware id
    #[arg(long, default_value = "")]
    pub hwid: String,
    /// Lifetime in hours
    #[arg(long, default_value = "24")]
    pub ttl_hours: i64,
}

pub fn execute(args: &TokenArgs) -> Result<(), AppError> {
    if args.id <= 0 {
        return Err(AppError::validation("--id must be positive"));
    }

    let config = AuthConfig {
        jwt_secret: args.secret.clone(),
        jwt_issuer: args.issuer.clone(),
        leeway_seconds: 0,
    };
    let encoder = JwtEncoder::new(&config, chrono::Duration::hours(args.ttl_hours));
    let token = encoder.issue(&Identity::new(args.id, args.username.clone(), args.hwid.clone()))?;

    println!("{}", token);
    Ok(())
}
