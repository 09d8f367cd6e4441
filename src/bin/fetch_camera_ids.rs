/// 列出分店下的摄像头ID, 以空格分隔输出到 stdout (供进程管理脚本使用)
use clap::Parser;
use dinewatch::api::{ApiClient, DEFAULT_API_URL};
use dinewatch::config::HttpConfigProvider;
use dinewatch::Error;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "列出分店摄像头ID", long_about = None)]
struct Args {
    /// 分店ID
    branch_id: u64,

    /// 后端 API 根地址
    #[arg(long, env = "FASTAPI_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Bearer token
    #[arg(long, env = "JWT_ACCESS_TOKEN", default_value = "fallback_token", hide_env_values = true)]
    token: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dinewatch=warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let provider = HttpConfigProvider::new(ApiClient::new(&args.api_url, &args.token));

    match provider.camera_ids(args.branch_id) {
        Ok(ids) => {
            let line: Vec<String> = ids.iter().map(u64::to_string).collect();
            println!("{}", line.join(" "));
            ExitCode::SUCCESS
        }
        Err(Error::HttpStatus { status: 404, .. }) => {
            eprintln!("No cameras found for branch {}", args.branch_id);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Failed to fetch cameras for branch {}: {}", args.branch_id, e);
            ExitCode::FAILURE
        }
    }
}
