use crate::accounting::engine::MissingQuantityPolicy;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub port: u16,
    /// Reporting timezone as a fixed UTC offset in hours (historically GMT+3).
    pub reporting_offset_hours: i32,
    /// Customer id of the producing organization itself; orders delivered to
    /// it never incur outbound transport.
    pub self_customer_id: String,
    /// What to do when a production record has no quantity.
    pub missing_quantity: MissingQuantityPolicy,
    /// Optional TOML seed file applied at startup (constants, reference data).
    pub seed_file: Option<String>,
    /// Deadline for one accounting run, in seconds.
    pub accounting_deadline_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let database_path = std::env::var("DATABASE_PATH")
            .unwrap_or_else(|_| "./carbontrack.db".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let reporting_offset_hours = std::env::var("REPORTING_OFFSET_HOURS")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .unwrap_or(3);

        let self_customer_id =
            std::env::var("SELF_CUSTOMER_ID").unwrap_or_else(|_| "DEC".to_string());

        let missing_quantity = match std::env::var("MISSING_QUANTITY_POLICY")
            .unwrap_or_else(|_| "zero".to_string())
            .to_lowercase()
            .as_str()
        {
            "fault" => MissingQuantityPolicy::Fault,
            _ => MissingQuantityPolicy::Zero,
        };

        let seed_file = std::env::var("SEED_FILE").ok();

        let accounting_deadline_secs = std::env::var("ACCOUNTING_DEADLINE_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        Ok(Self {
            database_path,
            port,
            reporting_offset_hours,
            self_customer_id,
            missing_quantity,
            seed_file,
            accounting_deadline_secs,
        })
    }
}
