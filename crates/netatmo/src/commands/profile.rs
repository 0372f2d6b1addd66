//! `profile`: print the node definitions a host installs.

use tabled::Tabled;

use netatmo_core::{NodeDefinition, node_definitions};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct DriverRow {
    #[tabled(rename = "Node")]
    node: &'static str,
    #[tabled(rename = "Driver")]
    driver: String,
    #[tabled(rename = "Reading")]
    label: &'static str,
    #[tabled(rename = "UOM")]
    uom: u8,
    #[tabled(rename = "Unit")]
    unit: String,
}

fn to_rows(node: &&'static NodeDefinition) -> Vec<DriverRow> {
    node.drivers
        .iter()
        .map(|spec| DriverRow {
            node: node.id,
            driver: spec.driver.to_string(),
            label: spec.label,
            uom: spec.uom.code(),
            unit: spec.uom.to_string(),
        })
        .collect()
}

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let nodes = node_definitions();
    let rendered = output::render_list(global.output_format(), nodes.as_slice(), to_rows, |node| {
        vec![node.id.to_owned()]
    })?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
