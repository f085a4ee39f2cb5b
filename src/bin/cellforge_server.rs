//! CellForge API Server binary
//!
//! Accepts workbook uploads and returns the generated C# source.

use cellforge::api::{run_api_server, server::ApiConfig};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "cellforge-server")]
#[command(version)]
#[command(about = "CellForge API Server - compile uploaded workbooks into C# classes")]
#[command(long_about = r#"
CellForge API Server

Endpoints:
  - POST /api/v1/generate  - Upload a workbook, download GeneratedCode.cs
  - GET  /health           - Health check
  - GET  /version          - Server version info
  - GET  /                 - API documentation

The generate endpoint takes a multipart form with a 'file' field (.xlsx) and
an optional 'cell_address' field (e.g. Sheet1!B7) whose computed value is
logged. Compile errors come back as HTTP 422 with a JSON body naming the error.

Example usage:
  cellforge-server                           # Start on localhost:8080
  cellforge-server --host 0.0.0.0 --port 3000

  curl -F file=@pricing.xlsx -F cell_address=Summary!B7 \
    http://localhost:8080/api/v1/generate -o GeneratedCode.cs
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "CELLFORGE_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "CELLFORGE_PORT")]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cellforge_server=info,cellforge=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();

    let config = ApiConfig {
        host: args.host,
        port: args.port,
    };

    run_api_server(config).await
}
