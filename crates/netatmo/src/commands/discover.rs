//! `discover`: list the station's classified modules.

use owo_colors::OwoColorize;
use tabled::Tabled;

use netatmo_core::ModuleSnapshot;

use crate::cli::GlobalOpts;
use crate::commands::connect_once;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ModuleRow {
    #[tabled(rename = "Module")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Drivers")]
    drivers: usize,
}

fn to_rows(snap: &ModuleSnapshot) -> Vec<ModuleRow> {
    vec![ModuleRow {
        name: snap.name.clone(),
        kind: snap.kind.to_string(),
        address: snap.address.to_string(),
        node: snap.node_def_id.unwrap_or("-").to_owned(),
        drivers: snap.reading.as_ref().map_or(0, netatmo_core::NormalizedReading::len),
    }]
}

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let (_, controller) = connect_once(global).await?;
    let modules = controller.readings().await;

    let rendered = output::render_list(global.output_format(), &modules, to_rows, |m| {
        vec![format!("{}\t{}", m.address, m.name)]
    })?;
    output::print_output(&rendered, global.quiet);

    if matches!(global.output_format(), crate::cli::OutputFormat::Table) && !global.quiet {
        let station = controller.station().await.unwrap_or_else(|| "station".into());
        let summary = format!("{} modules at {station}", modules.len());
        if output::should_color(global.color) {
            eprintln!("{}", summary.green());
        } else {
            eprintln!("{summary}");
        }
    }
    Ok(())
}
