use colored::Colorize;
use encamp_cloud::{AssemblyId, Teardown, TeardownConfig};
use encamp_cloud_aws::AwsGateway;

pub async fn handle(id: &str) -> anyhow::Result<()> {
    let id = AssemblyId::new(id);
    println!(
        "{}",
        format!("Removing assembly '{id}'").yellow().bold()
    );
    println!(
        "{}",
        "(set RUST_LOG=encamp_cloud=info to follow each step)".dimmed()
    );

    let gateway = AwsGateway::from_env().await;
    let config = TeardownConfig::for_id(&id)?;

    Teardown::new(&gateway, id.clone(), config).run().await?;

    println!();
    println!(
        "{}",
        format!("✓ every resource tagged '{id}' is gone").green()
    );
    Ok(())
}
