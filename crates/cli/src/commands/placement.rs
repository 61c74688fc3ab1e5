//! Placement prediction command

use anyhow::Result;
use colored::Colorize;

use crate::client::{ApiClient, NodeScore, PredictRequest};
use crate::output::{print_json, print_success, OutputFormat};

/// Ask the scheduler for the best node for a pod
pub async fn predict(
    client: &ApiClient,
    pod_name: &str,
    namespace: &str,
    format: OutputFormat,
) -> Result<()> {
    let request = PredictRequest {
        pod_name: pod_name.to_string(),
        namespace: namespace.to_string(),
    };
    let best: NodeScore = client.post("api/v1/predict", &request).await?;

    match format {
        OutputFormat::Json => print_json(&best)?,
        OutputFormat::Table => {
            print_success(&format!(
                "{}/{} -> {} (score {:.2})",
                namespace,
                pod_name,
                best.node_name.bold(),
                best.score
            ));
            for part in best.reason.split(" | ") {
                println!("  {}", part.dimmed());
            }
        }
    }

    Ok(())
}
