use std::error::Error;
use std::sync::Arc;

use completion::{Invoker, OpenAiBackend};
use dns_chat_server::{serve_tcp, serve_udp, Handler, Router, RouterSettings};
use tokio::net::{TcpListener, UdpSocket};
use tracing_subscriber::EnvFilter;

mod cli_args;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: cli_args::CliArgs = argh::from_env();
    let configuration = configuration::get_config(Some(args.config.as_path()))?;

    let invoker = match configuration.backend.api_key() {
        Some(api_key) => {
            let timeout = configuration.backend.timeout();
            let backend = OpenAiBackend::new(&configuration.backend.base_url, api_key, timeout)?;
            Some(Invoker::new(backend, timeout))
        }
        None => {
            tracing::warn!("no backend API key configured, chat queries will be rejected");
            None
        }
    };
    if configuration.auth.api_key().is_none() {
        tracing::warn!("no server API key configured, chat queries will be rejected");
    }

    let router = Router::new(RouterSettings::from(&configuration), invoker);
    let handler = Arc::new(Handler::new(router, configuration.response.ttl));

    let address = configuration.server.bind_address();
    let socket = UdpSocket::bind(address).await?;
    tracing::info!(
        "Listening on: {} (udp), models: {}, pid: {}",
        address,
        configuration.catalog(),
        std::process::id()
    );

    let serve = async {
        if configuration.server.tcp {
            let listener = TcpListener::bind(address).await?;
            tracing::info!("Listening on: {} (tcp)", address);
            futures::future::try_join(serve_udp(socket, handler.clone()), serve_tcp(listener, handler.clone()))
                .await
                .map(|_| ())
        } else {
            serve_udp(socket, handler.clone()).await
        }
    };

    tokio::select! {
        result = serve => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }

    Ok(())
}
