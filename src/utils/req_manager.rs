use reqwest::Client;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};

/// Counters describing how the shared HTTP client is used
#[derive(Debug, Default)]
pub struct RequestMetrics {
    /// Total number of acquired clients
    pub total_acquired: AtomicU64,
    /// Number of currently held clients
    pub active_requests: AtomicUsize,
    /// Peak concurrent holders observed
    pub peak_concurrent: AtomicUsize,
}

impl RequestMetrics {
    /// Get a formatted summary of metrics
    pub fn summary(&self) -> String {
        format!(
            "Requests - Total: {}, Active: {}, Peak: {}",
            self.total_acquired.load(Ordering::Relaxed),
            self.active_requests.load(Ordering::Relaxed),
            self.peak_concurrent.load(Ordering::Relaxed)
        )
    }
}

/// Pooled HTTP client shared by all providers of one backend.
///
/// A single long-lived `reqwest::Client` keeps connections warm while a
/// semaphore bounds the number of concurrent outbound requests.
///
/// # Example
/// ```rust,no_run
/// # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// use voxrelay::utils::req_manager::ReqManager;
///
/// let manager = ReqManager::new(8)?;
/// let guard = manager.acquire().await?;
/// let response = guard.client().get("https://api.example.com/health").send().await?;
/// println!("{} -> {}", manager.metrics().summary(), response.status());
/// # Ok(())
/// # }
/// ```
pub struct ReqManager {
    client: Arc<Client>,
    semaphore: Arc<Semaphore>,
    metrics: Arc<RequestMetrics>,
}

/// A guard that holds a pool slot and releases it when dropped
pub struct ClientGuard<'a> {
    manager: &'a ReqManager,
    client: Arc<Client>,
    _permit: SemaphorePermit<'a>,
}

impl<'a> ClientGuard<'a> {
    /// Get the HTTP client for making requests
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl<'a> Drop for ClientGuard<'a> {
    fn drop(&mut self) {
        self.manager
            .metrics
            .active_requests
            .fetch_sub(1, Ordering::Relaxed);
    }
}

/// Configuration for the HTTP request manager
#[derive(Debug, Clone)]
pub struct ReqManagerConfig {
    /// Maximum number of concurrent requests
    pub max_concurrent_requests: usize,
    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,
    /// TCP keep-alive duration
    pub tcp_keepalive: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Hard ceiling for a single request; the orchestrator applies tighter deadlines
    pub request_timeout: Duration,
}

impl Default for ReqManagerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 10,
            pool_max_idle_per_host: 32,
            tcp_keepalive: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl ReqManager {
    /// Create a new request manager with the specified maximum concurrent requests
    pub fn new(max_concurrent_requests: usize) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Self::with_config(ReqManagerConfig {
            max_concurrent_requests,
            ..Default::default()
        })
    }

    /// Create a new request manager with custom configuration
    pub fn with_config(
        config: ReqManagerConfig,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        if config.max_concurrent_requests == 0 {
            return Err("max_concurrent_requests must be greater than 0".into());
        }
        if config.max_concurrent_requests > 1000 {
            return Err("max_concurrent_requests must not exceed 1000".into());
        }

        let client = Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .tcp_keepalive(config.tcp_keepalive)
            .tcp_nodelay(true)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(concat!("voxrelay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_requests)),
            metrics: Arc::new(RequestMetrics::default()),
        })
    }

    /// Acquire a client slot, waiting while the pool is saturated
    pub async fn acquire(
        &self,
    ) -> Result<ClientGuard<'_>, Box<dyn std::error::Error + Send + Sync>> {
        let permit = self.semaphore.acquire().await?;

        self.metrics.total_acquired.fetch_add(1, Ordering::Relaxed);
        let active = self.metrics.active_requests.fetch_add(1, Ordering::Relaxed) + 1;
        self.metrics
            .peak_concurrent
            .fetch_max(active, Ordering::Relaxed);

        Ok(ClientGuard {
            manager: self,
            client: Arc::clone(&self.client),
            _permit: permit,
        })
    }

    /// Current usage counters
    pub fn metrics(&self) -> &RequestMetrics {
        &self.metrics
    }

    /// Number of slots currently free
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}
