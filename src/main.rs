use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::anyhow;
use axum_server::tls_rustls::RustlsConfig;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use callscript_relay::{ServerConfig, routes, state::AppState};

/// Call relay - bridges browser call audio to a realtime AI provider
#[derive(Parser, Debug)]
#[command(name = "callscript-relay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Subcommand to run (defaults to serving the relay)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the relay server
    Serve,

    /// Join a call through a running relay using the local microphone and speakers
    #[cfg(feature = "audio-device")]
    Call {
        /// Relay endpoint
        #[arg(long, default_value = "ws://127.0.0.1:3001/realtime-ai")]
        url: String,

        /// Context describing the prospect and the offer
        #[arg(long)]
        context: String,

        /// Input device name (default device when omitted)
        #[arg(long)]
        input_device: Option<String>,

        /// Output device name (default device when omitted)
        #[arg(long)]
        output_device: Option<String>,
    },

    /// List audio input devices
    #[cfg(feature = "audio-device")]
    Devices,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(cli.config).await,
        #[cfg(feature = "audio-device")]
        Commands::Call {
            url,
            context,
            input_device,
            output_device,
        } => call::run(url, context, input_device, output_device).await,
        #[cfg(feature = "audio-device")]
        Commands::Devices => {
            for name in callscript_relay::audio::MicrophoneCapture::list_devices()? {
                println!("{name}");
            }
            Ok(())
        }
    }
}

async fn serve(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    // Load configuration from file or environment
    let config = if let Some(config_path) = config_path {
        println!("Loading configuration from {}", config_path.display());
        ServerConfig::from_file(&config_path).map_err(|e| anyhow!(e.to_string()))?
    } else {
        ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?
    };

    if config.resolve_api_key().is_none() {
        tracing::warn!(
            "{} is not set; calls will be rejected until it is configured",
            config.api_key_env
        );
    }

    let address = config.address();
    let tls_config = config.tls.clone();
    println!("Starting server on {address}");

    // Create application state
    let app_state = AppState::new(config).map_err(|e| anyhow!(e.to_string()))?;
    let app = routes::app(app_state);

    // Parse socket address
    let socket_addr: SocketAddr = address
        .parse()
        .map_err(|e| anyhow!("Invalid server address '{}': {}", address, e))?;

    // Start server with or without TLS
    if let Some(tls) = tls_config {
        // Load TLS configuration from certificate and key files
        let rustls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
            .await
            .map_err(|e| {
                anyhow!(
                    "Failed to load TLS certificates from {} and {}: {}",
                    tls.cert_path.display(),
                    tls.key_path.display(),
                    e
                )
            })?;

        info!("Server listening on https://{} (TLS enabled)", socket_addr);

        axum_server::bind_rustls(socket_addr, rustls_config)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|e| anyhow!("TLS server error: {}", e))?;
    } else {
        info!("Server listening on http://{}", socket_addr);

        let listener = TcpListener::bind(&socket_addr).await?;
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
    }

    Ok(())
}

#[cfg(feature = "audio-device")]
mod call {
    use std::sync::Arc;

    use callscript_relay::audio::{MicrophoneCapture, SpeakerPlayback};
    use callscript_relay::client::{RelayClient, UiEvent};

    pub async fn run(
        url: String,
        context: String,
        input_device: Option<String>,
        output_device: Option<String>,
    ) -> anyhow::Result<()> {
        let speaker = Arc::new(SpeakerPlayback::start(output_device)?);
        let microphone = Box::new(MicrophoneCapture::new(input_device));
        let (mut client, mut events) = RelayClient::new(url, microphone, speaker);

        client.connect(&context).await?;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    println!("\nHanging up");
                    client.disconnect().await;
                    break;
                }
                event = events.recv() => match event {
                    Some(UiEvent::Connected) => println!("[connected]"),
                    Some(UiEvent::ScriptDelta { delta, .. }) => {
                        print!("{delta}");
                        use std::io::Write;
                        let _ = std::io::stdout().flush();
                    }
                    Some(UiEvent::Transcript(message)) => {
                        println!("\n[{}] {}", message.role, message.content);
                    }
                    Some(UiEvent::Notice(notice)) => eprintln!("\n[notice] {notice}"),
                    Some(UiEvent::Disconnected) | None => {
                        println!("\n[disconnected]");
                        break;
                    }
                }
            }
        }

        Ok(())
    }
}
