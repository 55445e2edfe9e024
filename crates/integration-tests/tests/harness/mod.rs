//! Shared test harness: mock upstream backend and gateway builders

pub mod mock_backend;

use std::net::SocketAddr;

use prism_config::GatewayConfig;
use prism_llm::GatewayState;
use tokio_util::sync::CancellationToken;

/// Build a gateway configuration from inline TOML
pub fn config_from_toml(toml: &str) -> GatewayConfig {
    toml::from_str(toml).expect("test config must parse")
}

/// Config with one OpenAI-format provider pointed at a mock backend and
/// a direct mapping `gpt-4 -> openai/gpt-4`
pub fn single_provider_config(base_url: &str) -> GatewayConfig {
    config_from_toml(&format!(
        r#"
        [providers.openai]
        type = "openai"
        api_key = "sk-test"
        base_url = "{base_url}"

        [routing.model_mappings."gpt-4"]
        provider = "openai"
        provider_model_id = "gpt-4"
        "#
    ))
}

/// A gateway served over a real socket for HTTP-level assertions
pub struct GatewayServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
}

impl GatewayServer {
    /// Serve the gateway router for the given state
    pub async fn start(state: GatewayState) -> anyhow::Result<Self> {
        let app = prism_llm::gateway_router(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    token.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown })
    }

    /// Base URL of the served gateway
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for GatewayServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
