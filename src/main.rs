use clap::{Parser, Subcommand};
use poi_choropleth::{config, data, output, pipeline, server};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count places per zone and write the choropleth layers
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Run the pipeline and serve the layers over HTTP
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

fn run_pipeline(app_config: &config::AppConfig) -> anyhow::Result<(pipeline::Pipeline, pipeline::PipelineOutput)> {
    // 1. Load Data
    let places = data::load_places(&app_config.input.points)?;
    let zones = data::load_zones(&app_config.input.zones)?;

    // 2. Reproject, filter, join, aggregate, assemble
    let pipeline = pipeline::Pipeline::from_config(app_config)?;
    let output = pipeline.run(&places, &zones)?;

    for warning in &output.warnings {
        println!("Warning: {}", warning);
    }
    Ok((pipeline, output))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Generate { config } => {
            println!("Generating choropleth with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            let (pipeline, output) = run_pipeline(&app_config)?;

            // 3. Write layers
            output::write_outputs(&app_config.output.dir, pipeline.categories(), &output)?;

            println!(
                "Generation complete! {} places, {} choropleth rows in {:?}",
                output.places.len(),
                output.choropleth.len(),
                app_config.output.dir
            );
        }
        Commands::Serve { config } => {
            println!("Serving choropleth with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            let (pipeline, output) = run_pipeline(&app_config)?;
            let categories = pipeline.categories().clone();

            server::start_server(app_config, output, categories).await?;
        }
    }

    Ok(())
}
