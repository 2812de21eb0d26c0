//! Serve command handler.

use clap::Args;
use docqa_core::{config::AppConfig, AppResult};

/// Run the HTTP server
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Address to listen on
    #[arg(long, env = "DOCQA_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "DOCQA_PORT")]
    pub port: Option<u16>,

    /// Maximum accepted upload size in bytes
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,
}

impl ServeCommand {
    /// Execute the serve command.
    pub async fn execute(&self, mut config: AppConfig) -> AppResult<()> {
        tracing::info!("Executing serve command");
        tracing::debug!("Serve command options: {:?}", self);

        if let Some(ref host) = self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(limit) = self.max_upload_bytes {
            config.server.max_upload_bytes = limit;
        }

        docqa_server::run(&config).await
    }
}
