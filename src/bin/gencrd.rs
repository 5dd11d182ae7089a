use kube::CustomResourceExt;
use operator::crd::{HealthService, MustGatherConfig, MustGatherJob, MustGatherService};

use clap::Parser;
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Output directory, `-` writes one multi-document stream to stdout
    #[arg(short, long, default_value = ".")]
    output: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let crds = [
        ("healthservice.yaml", serde_yaml::to_string(&HealthService::crd())?),
        ("mustgatherservice.yaml", serde_yaml::to_string(&MustGatherService::crd())?),
        ("mustgatherjob.yaml", serde_yaml::to_string(&MustGatherJob::crd())?),
        ("mustgatherconfig.yaml", serde_yaml::to_string(&MustGatherConfig::crd())?),
    ];
    if args.output == "-" {
        for (_, body) in &crds {
            print!("---\n{body}");
        }
        return Ok(());
    }
    // Create directory if it does not exist
    std::fs::create_dir_all(&args.output)?;
    for (file, body) in &crds {
        std::fs::write(format!("{}/{file}", args.output), body)?;
    }
    Ok(())
}
