use log::info;
use mock_server::MockDaraja;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;

    let mut state = MockDaraja::new();
    if let (Ok(key), Ok(secret)) = (
        std::env::var("MPESA_CONSUMER_KEY"),
        std::env::var("MPESA_CONSUMER_SECRET"),
    ) {
        state = state.with_credentials(&key, &secret);
    }

    info!("mock Daraja listening on {addr}");
    mock_server::run(listener, state).await
}
