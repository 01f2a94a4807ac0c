use std::time::Duration;

use crate::{env_bool, env_str};

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug)]
pub struct Environment {
    pub debug: bool,
    pub portfolio_id: String,
    pub http_timeout: Duration,
}

pub fn load_env() -> Environment {
    Environment {
        debug: env_bool!("POLARIS_DEBUG"),
        portfolio_id: env_str!("POLARIS_PORTFOLIO_ID"),
        http_timeout: Duration::from_secs(
            env_str!("POLARIS_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)
                .parse()
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        ),
    }
}
