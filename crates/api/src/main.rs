use flowdeck_api::app::services::{AppConfig, build_services};

#[tokio::main]
async fn main() {
    flowdeck_observability::init();

    let config = AppConfig::from_env();
    let services = build_services(&config)
        .await
        .expect("failed to build application services");
    let app = flowdeck_api::app::build_app(services);

    let bind = std::env::var("FLOWDECK_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .expect("failed to bind listen address");

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
