//! Runner Configuration
//!
//! Defines the configuration of a task runner including:
//! - Network (mainnet flag, allowance and faucet behavior)
//! - Worker image selection
//! - Resources requested for each task
//! - Poll intervals, retry budgets and the match watchdog
//!
//! Loaded from TOML or from `TASK_RUNNER_*` environment variables. Every
//! section has defaults, so a partial file is valid.

use crate::error::{RunnerError, RunnerResult};
use crate::ledger::ResourceRequest;
use alloy_primitives::U256;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "TASK_RUNNER_";

/// Complete runner configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Network configuration
    pub network: NetworkConfig,
    /// Worker image configuration
    pub image: ImageConfig,
    /// Resources requested per task
    pub resources: ResourceConfig,
    /// Intervals and budgets
    pub timing: TimingConfig,
    /// How the order matched to a request is discovered
    pub match_strategy: MatchStrategy,
    /// What to do when no order matched within the watchdog delay
    pub watchdog_policy: WatchdogPolicy,
}

impl RunnerConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: RunnerConfig =
            toml::from_str(content).context("Failed to parse runner configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Defaults overridden by `TASK_RUNNER_*` environment variables.
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            network: NetworkConfig {
                name: env_or("NETWORK", defaults.network.name),
                is_mainnet: env_or("MAINNET", defaults.network.is_mainnet),
                require_allowance: env_or(
                    "REQUIRE_ALLOWANCE",
                    defaults.network.require_allowance,
                ),
                faucet_enabled: env_or("FAUCET_ENABLED", defaults.network.faucet_enabled),
                faucet_threshold: env_or("FAUCET_THRESHOLD", defaults.network.faucet_threshold),
            },
            image: ImageConfig {
                runtime: env_or("RUNTIME", defaults.image.runtime),
                registry_version: env_or("REGISTRY_VERSION", defaults.image.registry_version),
            },
            resources: ResourceConfig {
                cpu: env_or("CPU", defaults.resources.cpu),
                memory: env_or("MEMORY", defaults.resources.memory),
                storage: env_or("STORAGE", defaults.resources.storage),
                bandwidth: env_or("BANDWIDTH", defaults.resources.bandwidth),
                duration: env_or("DURATION", defaults.resources.duration),
                validators: env_or("VALIDATORS", defaults.resources.validators),
                task_price: env_or("TASK_PRICE", defaults.resources.task_price),
            },
            timing: TimingConfig {
                tx_poll_interval_ms: env_or("TX_POLL_MS", defaults.timing.tx_poll_interval_ms),
                order_scan_interval_ms: env_or(
                    "ORDER_SCAN_MS",
                    defaults.timing.order_scan_interval_ms,
                ),
                status_poll_interval_ms: env_or(
                    "STATUS_POLL_MS",
                    defaults.timing.status_poll_interval_ms,
                ),
                storage_retry_delay_ms: env_or(
                    "STORAGE_RETRY_DELAY_MS",
                    defaults.timing.storage_retry_delay_ms,
                ),
                storage_retry_budget: env_or(
                    "STORAGE_RETRY_BUDGET",
                    defaults.timing.storage_retry_budget,
                ),
                match_watchdog_secs: env_or(
                    "MATCH_WATCHDOG_SECS",
                    defaults.timing.match_watchdog_secs,
                ),
                recent_blocks: env_or("RECENT_BLOCKS", defaults.timing.recent_blocks),
                progress_channel_capacity: env_or(
                    "PROGRESS_CAPACITY",
                    defaults.timing.progress_channel_capacity,
                ),
            },
            match_strategy: env_or("MATCH_STRATEGY", defaults.match_strategy),
            watchdog_policy: env_or("WATCHDOG_POLICY", defaults.watchdog_policy),
        }
    }

    /// Reject values that would stall or spin a session
    pub fn validate(&self) -> RunnerResult<()> {
        let timing = &self.timing;
        let checks = [
            (timing.tx_poll_interval_ms, "timing.tx_poll_interval_ms"),
            (timing.order_scan_interval_ms, "timing.order_scan_interval_ms"),
            (timing.status_poll_interval_ms, "timing.status_poll_interval_ms"),
            (timing.storage_retry_delay_ms, "timing.storage_retry_delay_ms"),
            (timing.match_watchdog_secs, "timing.match_watchdog_secs"),
            (timing.recent_blocks, "timing.recent_blocks"),
            (self.resources.task_price, "resources.task_price"),
            (self.resources.validators, "resources.validators"),
        ];

        for (value, name) in checks {
            if value == 0 {
                return Err(RunnerError::Config(format!("{} must be positive", name)));
            }
        }

        if timing.storage_retry_budget == 0 {
            return Err(RunnerError::Config(
                "timing.storage_retry_budget must be positive".to_string(),
            ));
        }
        if timing.progress_channel_capacity == 0 {
            return Err(RunnerError::Config(
                "timing.progress_channel_capacity must be positive".to_string(),
            ));
        }
        if self.image.runtime.is_empty() {
            return Err(RunnerError::Config("image.runtime is empty".to_string()));
        }

        Ok(())
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    let name = format!("{}{}", ENV_PREFIX, key);
    match std::env::var(&name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid value for {}: {:?}", name, raw);
            default
        }),
        Err(_) => default,
    }
}

/// Network configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Label used in logs
    pub name: String,
    /// Mainnet disables the faucet
    pub is_mainnet: bool,
    /// Approve the contract to spend the task price before submitting
    pub require_allowance: bool,
    /// Request test tokens when the balance runs low (testnets only)
    pub faucet_enabled: bool,
    /// Balance at or below which the faucet is used
    pub faucet_threshold: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: "testnet".to_string(),
            is_mainnet: false,
            require_allowance: true,
            faucet_enabled: true,
            faucet_threshold: 100,
        }
    }
}

impl NetworkConfig {
    pub fn faucet_available(&self) -> bool {
        self.faucet_enabled && !self.is_mainnet
    }
}

/// Worker image selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Runtime profile looked up in the image registry
    pub runtime: String,
    /// Registry version the image was published under
    pub registry_version: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            runtime: "etny-pynithy-testnet".to_string(),
            registry_version: "v3".to_string(),
        }
    }
}

/// Resources requested per task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub cpu: u64,
    /// Memory in GB
    pub memory: u64,
    /// Storage in GB
    pub storage: u64,
    pub bandwidth: u64,
    /// Duration in minutes
    pub duration: u64,
    /// Number of worker instances
    pub validators: u64,
    /// Price bound in token units
    pub task_price: u64,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            cpu: 1,
            memory: 1,
            storage: 40,
            bandwidth: 1,
            duration: 1,
            validators: 1,
            task_price: 10,
        }
    }
}

impl ResourceConfig {
    pub fn task_price(&self) -> U256 {
        U256::from(self.task_price)
    }

    pub fn to_request(&self) -> ResourceRequest {
        ResourceRequest {
            cpu: self.cpu,
            memory: self.memory,
            storage: self.storage,
            bandwidth: self.bandwidth,
            duration: self.duration,
            instances: self.validators,
            task_price: self.task_price(),
        }
    }
}

/// Intervals, budgets and delays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Receipt poll interval
    pub tx_poll_interval_ms: u64,
    /// Order list scan interval
    pub order_scan_interval_ms: u64,
    /// Order status poll interval while the worker executes
    pub status_poll_interval_ms: u64,
    /// Delay between result fetch attempts
    pub storage_retry_delay_ms: u64,
    /// Maximum result fetch attempts
    pub storage_retry_budget: u32,
    /// Time allowed between request acceptance and order placement
    pub match_watchdog_secs: u64,
    /// Blocks searched for the result transaction
    pub recent_blocks: u64,
    /// Capacity of the progress broadcast channel
    pub progress_channel_capacity: usize,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tx_poll_interval_ms: 1000,
            order_scan_interval_ms: 1000,
            status_poll_interval_ms: 5000,
            storage_retry_delay_ms: 2000,
            storage_retry_budget: 300,
            match_watchdog_secs: 60,
            recent_blocks: 20,
            progress_channel_capacity: 256,
        }
    }
}

impl TimingConfig {
    pub fn tx_poll_interval(&self) -> Duration {
        Duration::from_millis(self.tx_poll_interval_ms)
    }

    pub fn order_scan_interval(&self) -> Duration {
        Duration::from_millis(self.order_scan_interval_ms)
    }

    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_millis(self.status_poll_interval_ms)
    }

    pub fn storage_retry_delay(&self) -> Duration {
        Duration::from_millis(self.storage_retry_delay_ms)
    }

    pub fn match_watchdog(&self) -> Duration {
        Duration::from_secs(self.match_watchdog_secs)
    }
}

/// Order discovery strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// Scan the order list from the count observed before submission
    #[default]
    Scan,
    /// React to request/order events, scanning only if the stream breaks
    Events,
}

impl FromStr for MatchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scan" => Ok(MatchStrategy::Scan),
            "events" => Ok(MatchStrategy::Events),
            other => Err(format!("unknown match strategy: {}", other)),
        }
    }
}

/// Reaction to the match watchdog expiring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchdogPolicy {
    /// Report congestion and keep waiting
    #[default]
    Warn,
    /// End the session with `MatchTimeout`
    Fail,
}

impl FromStr for WatchdogPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "warn" => Ok(WatchdogPolicy::Warn),
            "fail" => Ok(WatchdogPolicy::Fail),
            other => Err(format!("unknown watchdog policy: {}", other)),
        }
    }
}
