use clap::Parser;
use meteo_alert_service::api::generate_openapi_spec;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "generate-openapi")]
#[command(about = "Write the OpenAPI document of the HTTP API")]
struct Args {
    /// Output file
    #[arg(short, long, default_value = "openapi.json")]
    output: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let spec = generate_openapi_spec();
    let json = serde_json::to_string_pretty(&spec)?;

    fs::write(&args.output, json)?;
    println!("✅ Generated {}", args.output.display());
    Ok(())
}
