//! Node ranking, analysis and history commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, NodeAnalysis, NodeHistory, NodeList};
use crate::output::{
    color_stability, color_status, format_duration_secs, format_percent, print_info, print_json,
    print_table, print_warning, OutputFormat,
};

#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Source")]
    source: String,
}

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "Observed")]
    observed_at: String,
    #[tabled(rename = "Pod")]
    pod: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Restarts")]
    restarts: u32,
}

fn score_source(reason: &str) -> &'static str {
    if reason.ends_with("local-only") {
        "local"
    } else {
        "blended"
    }
}

/// Rank every node by final score, best first
pub async fn list_nodes(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let list: NodeList = client.get("api/v1/nodes").await?;

    if let OutputFormat::Json = format {
        return print_json(&list.nodes);
    }

    let mut nodes = list.nodes;
    // stable sort keeps listing order among equal scores
    nodes.sort_by(|a, b| b.score.total_cmp(&a.score));

    let rows: Vec<NodeRow> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| NodeRow {
            rank: i + 1,
            node: n.node_name.clone(),
            score: format!("{:.2}", n.score),
            source: score_source(&n.reason).to_string(),
        })
        .collect();
    print_table(&rows);

    Ok(())
}

/// Show a node's stability analysis over a window such as `24h`
pub async fn show_analysis(
    client: &ApiClient,
    node: &str,
    window: &str,
    format: OutputFormat,
) -> Result<()> {
    let path = format!("api/v1/nodes/{}/analysis?window={}", node, window);
    let analysis: NodeAnalysis = client.get(&path).await?;

    if let OutputFormat::Json = format {
        return print_json(&analysis);
    }

    if analysis.total_pods == 0 {
        print_info(&format!("No pod events for {} in the last {}", node, window));
        return Ok(());
    }

    println!("{} ({})", analysis.node_name.bold(), window);
    println!(
        "  Pods:          {} total, {} failed, {} succeeded",
        analysis.total_pods, analysis.failed_pods, analysis.successful_pods
    );
    println!("  Failure rate:  {}", format_percent(analysis.failure_rate));
    println!("  Avg restarts:  {:.2}", analysis.avg_restart_count);
    println!("  Avg lifetime:  {}", format_duration_secs(analysis.avg_lifetime_secs));
    println!("  Stability:     {}", color_stability(analysis.stability_score));

    for recommendation in &analysis.recommendations {
        print_warning(recommendation);
    }

    Ok(())
}

/// Show the retained pod events of a node
pub async fn show_history(client: &ApiClient, node: &str, format: OutputFormat) -> Result<()> {
    let path = format!("api/v1/nodes/{}/history", node);
    let history: NodeHistory = client.get(&path).await?;

    if let OutputFormat::Json = format {
        return print_json(&history);
    }

    println!(
        "{}: failure rate {}, restart rate {:.2}",
        history.node_name.bold(),
        format_percent(history.failure_rate),
        history.restart_rate
    );

    let rows: Vec<EventRow> = history
        .events
        .into_iter()
        .map(|e| EventRow {
            observed_at: e.observed_at,
            pod: format!("{}/{}", e.namespace, e.pod_name),
            status: color_status(&e.status),
            restarts: e.restart_count,
        })
        .collect();
    print_table(&rows);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_source() {
        assert_eq!(score_source("total score: 90.00 - ready: 20.00 | local-only"), "local");
        assert_eq!(
            score_source("x | final score: 80.00 (remote: 75.00, local: 90.00, confidence: 0.50)"),
            "blended"
        );
    }
}
