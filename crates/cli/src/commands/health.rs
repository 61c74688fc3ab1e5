//! Service health command

use anyhow::Result;
use serde_json::json;
use tabled::Tabled;

use crate::client::{ApiClient, HealthReport, Readiness};
use crate::output::{color_status, print_json, print_success, print_table, print_warning, OutputFormat};

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Show component health and readiness
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let (_, health): (u16, HealthReport) = client.get_any_status("healthz").await?;
    let (_, readiness): (u16, Readiness) = client.get_any_status("readyz").await?;

    if let OutputFormat::Json = format {
        return print_json(&json!({ "health": health, "readiness": readiness }));
    }

    println!("Overall: {}", color_status(&health.status));
    let rows: Vec<ComponentRow> = health
        .components
        .into_iter()
        .map(|(name, component)| ComponentRow {
            name,
            status: color_status(&component.status),
            message: component.message.unwrap_or_default(),
        })
        .collect();
    print_table(&rows);

    if readiness.ready {
        print_success("Scheduler is ready");
    } else {
        print_warning(&format!(
            "Scheduler not ready: {}",
            readiness.reason.as_deref().unwrap_or("unknown")
        ));
    }

    Ok(())
}
