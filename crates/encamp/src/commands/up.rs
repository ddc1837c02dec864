use colored::Colorize;
use encamp_cloud::{AssemblyId, ProvisionConfig, Provisioner};
use encamp_cloud_aws::{AwsGateway, CheckIp};

pub async fn handle(id: &str) -> anyhow::Result<()> {
    let id = AssemblyId::new(id);
    println!(
        "{}",
        format!("Provisioning assembly '{id}'").bold()
    );
    println!(
        "{}",
        "(set RUST_LOG=encamp_cloud=info to follow each step)".dimmed()
    );

    let gateway = AwsGateway::from_env().await;
    let discovery = CheckIp::new();
    let config = ProvisionConfig::for_id(&id)?;

    let assembly = Provisioner::new(&gateway, &discovery, id, config)
        .run()
        .await?;

    println!();
    println!("{}", "✓ assembly ready".green().bold());
    println!();
    println!("{assembly}");
    Ok(())
}
