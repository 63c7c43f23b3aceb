//! Workshop commands.

use crate::cli::{connect, output, GlobalArgs, WorkshopSource};
use crate::core::domain::WorkshopDescriptor;
use crate::core::platform::Docker;
use crate::core::portal::{PortalOutcome, TrainingPortalReconciler};
use crate::core::workshop::{self, ServeOptions, WorkshopLoader};
use crate::error::Result;

fn load(source: &WorkshopSource, portal: Option<&str>) -> Result<WorkshopDescriptor> {
    WorkshopLoader::from_current_dir()?.load(source.name.as_deref(), &source.location, portal)
}

/// Deploy a workshop and register it with a portal.
pub fn deploy(global: &GlobalArgs, source: &WorkshopSource, portal: &str) -> Result<()> {
    let descriptor = load(source, Some(portal))?;
    let store = connect(global)?;

    let outcome = workshop::deploy(&store, &descriptor, &mut rand::thread_rng())?;

    output::success(&format!("deployed {}", output::name(&descriptor.name)));
    match outcome {
        PortalOutcome::Created => {
            output::kv("portal:", format!("{} (created)", descriptor.portal));
            if let Some(password) = TrainingPortalReconciler::new(&store).password(&descriptor.portal)? {
                output::kv("password:", password);
            }
        }
        PortalOutcome::Added => output::kv("portal:", &descriptor.portal),
        PortalOutcome::Unchanged => {
            output::kv("portal:", format!("{} (already registered)", descriptor.portal))
        }
    }
    Ok(())
}

/// Unregister a workshop and delete its resource.
pub fn delete(global: &GlobalArgs, source: &WorkshopSource, portal: &str) -> Result<()> {
    let descriptor = load(source, Some(portal))?;
    let store = connect(global)?;

    if workshop::delete(&store, &descriptor)? {
        output::success(&format!("deleted {}", output::name(&descriptor.name)));
    } else {
        output::dimmed(&format!("{} was not deployed", descriptor.name));
    }
    Ok(())
}

/// Run workshop content in a standalone container.
pub fn serve(global: &GlobalArgs, source: &WorkshopSource, port: u16) -> Result<()> {
    let descriptor = load(source, None)?;
    let runtime = Docker::locate()?;
    let options = ServeOptions::new(global.data_dir()?).with_port(port);

    let served = workshop::serve(&runtime, &descriptor, &options)?;

    output::success(&format!("serving {}", output::name(&served.container)));
    output::kv("url:", &served.url);
    output::kv("config:", output::path(&served.state_file));
    Ok(())
}
