use mock_server::MockConfig;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let repositories = std::env::var("REPOSITORIES")
        .map(|list| list.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect())
        .unwrap_or_else(|_| vec!["test".to_string()]);
    let credentials = std::env::var("MOCK_USER")
        .ok()
        .map(|user| (user, std::env::var("MOCK_PASSWORD").unwrap_or_default()));

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, ?repositories, auth = credentials.is_some(), "mock repository server listening");
    mock_server::run_with(listener, MockConfig { repositories, credentials }).await
}
