use std::net::SocketAddr;
use std::path::PathBuf;

use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;

use app::{create_app, create_state};
use config::{Config, read_config};

mod app;
mod config;
mod error;
mod geocoding;
mod routes;
#[cfg(test)]
mod test_support;
mod weather;
mod weather_codes;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(long, env = "WEATHER_CONFIG")]
    config: Option<PathBuf>,

    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    #[arg(short, long, env = "KEY_FILE_PATH", requires = "cert_file_path")]
    key_file_path: Option<String>,

    #[arg(short, long, env = "CERT_FILE_PATH")]
    cert_file_path: Option<String>,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => read_config(path).expect("failed to read configuration"),
        None => Config::default(),
    };

    let state = create_state(&config).expect("failed to create http client");
    let app = create_app(state, &config.assets_path);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    log::info!("serving assets from {}", config.assets_path.display());
    log::info!("listening on {}", addr);
    log::info!("health check at http://localhost:{}/api/health", args.port);
    log::info!("weather api at http://localhost:{}/api/weather/{{city}}", args.port);

    if let (Some(key_file_path), Some(cert_file_path)) = (args.key_file_path, args.cert_file_path)
    {
        log::info!(
            "using tls with key file {} and cert file {}",
            key_file_path,
            cert_file_path
        );
        let tls = RustlsConfig::from_pem_file(cert_file_path, key_file_path)
            .await
            .expect("failed to load tls certificate and key");
        axum_server::bind_rustls(addr, tls)
            .serve(app.into_make_service())
            .await
            .expect("server failed");
    } else {
        axum_server::bind(addr)
            .serve(app.into_make_service())
            .await
            .expect("server failed");
    }
}
