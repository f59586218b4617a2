use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures::StreamExt;
use garde::Validate;
use kube::{Client, CustomResourceExt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gateway_controller::api::{GatewayClassConfig, MeshService};
use gateway_controller::config::Config;
use gateway_controller::mesh::InMemoryMeshClient;
use gateway_controller::reconcile::gateway::{self, Context};

#[derive(Debug, Clone, Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Subcommand)]
#[allow(clippy::large_enum_variant)]
enum Commands {
    /// Run the Gateway reconciliation loop
    Reconcile(Config),
    /// Output the Kubernetes manifest for a given CRD
    #[command(subcommand)]
    CrdManifest(Crd),
}

#[derive(Debug, Clone, Subcommand)]
enum Crd {
    MeshService,
    GatewayClassConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(EnvFilter::from_default_env())
        .try_init()?;

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Reconcile(config)) => run_controller(config).await?,
        Some(Commands::CrdManifest(crd)) => {
            let crd = match crd {
                Crd::MeshService => MeshService::crd(),
                Crd::GatewayClassConfig => GatewayClassConfig::crd(),
            };

            println!("{}", serde_yaml_ng::to_string(&crd)?);
        }
        None => {}
    }

    Ok(())
}

async fn run_controller(config: Config) -> anyhow::Result<()> {
    config.validate()?;

    let client = Client::try_default().await.expect("connect to k8s");
    let mesh_client = Arc::new(InMemoryMeshClient::new());

    let context = Arc::new(Context {
        client,
        mesh_client,
        config,
    });

    gateway::control_loop(context)
        .for_each(|res| async move {
            match res {
                Ok(o) => tracing::info!("Reconciled gateway {:?}", o),
                Err(e) => tracing::error!("Gateway reconcile failed: {:?}", e),
            }
        })
        .await;

    tracing::info!("controller terminated");
    Ok(())
}
