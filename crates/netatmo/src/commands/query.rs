//! `query`: print every module's converted readings.

use tabled::Tabled;

use netatmo_core::ModuleSnapshot;

use crate::cli::{GlobalOpts, QueryArgs};
use crate::commands::connect_once;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ReadingRow {
    #[tabled(rename = "Module")]
    module: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Driver")]
    driver: String,
    #[tabled(rename = "Reading")]
    label: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "UOM")]
    uom: u8,
}

fn to_rows(snap: &ModuleSnapshot) -> Vec<ReadingRow> {
    let Some(ref reading) = snap.reading else {
        return Vec::new();
    };
    snap.kind
        .drivers()
        .iter()
        .filter_map(|spec| {
            reading.get(spec.driver).map(|value| ReadingRow {
                module: snap.name.clone(),
                address: snap.address.to_string(),
                driver: spec.driver.to_string(),
                label: spec.label.to_owned(),
                value: value.to_string(),
                uom: spec.uom.code(),
            })
        })
        .collect()
}

fn to_lines(snap: &ModuleSnapshot) -> Vec<String> {
    snap.reading
        .iter()
        .flat_map(|reading| reading.iter())
        .map(|r| format!("{}\t{}\t{}", snap.address, r.driver, r.value))
        .collect()
}

pub async fn handle(args: &QueryArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (_, controller) = connect_once(global).await?;
    let mut modules = controller.readings().await;

    if let Some(ref wanted) = args.module {
        modules.retain(|m| m.name == *wanted || m.address.as_str() == wanted.as_str());
        if modules.is_empty() {
            return Err(CliError::ModuleNotFound {
                identifier: wanted.clone(),
            });
        }
    }

    let rendered = output::render_list(global.output_format(), &modules, to_rows, to_lines)?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
