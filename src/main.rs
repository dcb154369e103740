mod cli;
mod enrichment;
mod error;
mod export;
mod models;
mod pipeline;
mod scoring;
mod scrapers;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use cli::{Cli, Command};
use error::PipelineError;
use models::ScoredLead;
use scrapers::{ChromeSession, MinerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli::init_tracing(cli.verbose);

    let config = cli.search.to_config();
    config.validate()?;

    info!("🎯 Lead Miner - {}", config.query());
    info!("==========================================");

    match &cli.command {
        Command::Mine { output } => {
            let browser = launch(&config).context("could not start Chrome")?;
            let candidates = pipeline::mine(&browser, &config)
                .await
                .context("mining failed")?;
            export::write_candidates(output, &candidates)?;

            info!("\n✅ Mined {} leads\n", candidates.len());
            for (i, candidate) in candidates.iter().enumerate() {
                println!("{}. {}", i + 1, candidate.name);
                println!("   📞 {}", candidate.phone_or_sentinel());
            }
        }
        Command::Enrich { input, output } => {
            let candidates = export::read_candidates(input)
                .with_context(|| format!("could not read {}", input.display()))?;
            info!("📂 Loaded {} leads from {}", candidates.len(), input.display());

            let browser = launch(&config).context("could not start Chrome")?;
            let leads = pipeline::enrich(&browser, &config, candidates)
                .await
                .context("enrichment failed")?;
            finish(&cli, output, &leads).await?;
        }
        Command::Run { output } => {
            let browser = launch(&config).context("could not start Chrome")?;
            let leads = pipeline::run(&browser, &config)
                .await
                .context("pipeline failed")?;
            finish(&cli, output, &leads).await?;
        }
    }

    Ok(())
}

fn launch(config: &MinerConfig) -> Result<ChromeSession, PipelineError> {
    Ok(ChromeSession::launch(config.headless)?)
}

async fn finish(cli: &Cli, output: &std::path::Path, leads: &[ScoredLead]) -> anyhow::Result<()> {
    export::write_leads(output, leads)?;
    if let Some(json) = &cli.json {
        export::write_json(json, leads).await?;
    }

    info!("\n✅ Scored {} leads\n", leads.len());
    println!("🏆 Top {} leads:", cli.top.min(leads.len()));
    for line in pipeline::summary(leads, cli.top) {
        println!("{}", line);
    }
    Ok(())
}
