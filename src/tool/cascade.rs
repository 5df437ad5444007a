//! Cascading configuration resolution over the component tree
//!
//! Resolution is a single top-down pass: the tool's effective settings are
//! its explicit settings with harness overrides applied, and each component
//! sees its parent's effective set with its own explicit settings and scoped
//! overrides overlaid. Every node receives a fully-resolved value set - no
//! lookup chains survive past `configure`.

use tracing::debug;

use crate::config::{ConfigError, Overrides, Settings};

use super::traits::{Component, Tool};

/// Resolve and apply configuration for a tool and its whole component tree
///
/// Depth-first, parent before children. The first `ConfigError` aborts the
/// pass; by contract no resource has been acquired yet at that point.
pub(crate) fn configure_tool(tool: &mut dyn Tool, overrides: &Overrides) -> Result<(), ConfigError> {
    let name = tool.name().to_string();

    let mut effective = Settings::named(name.clone());
    effective.merge(tool.settings());
    effective.merge(&overrides.for_tool(&name));

    debug!(tool = %name, options = effective.len(), "resolved tool configuration");
    tool.configure(&effective)?;

    for child in tool.components_mut() {
        configure_component(child, &effective, overrides)?;
    }
    Ok(())
}

fn configure_component(
    component: &mut dyn Component,
    inherited: &Settings,
    overrides: &Overrides,
) -> Result<(), ConfigError> {
    let name = component.name().to_string();

    // Parent-supplied values first, then the component's own explicit
    // settings, then harness overrides scoped to this component
    let mut effective = inherited.clone();
    effective.set_owner(name.clone());
    effective.merge(component.settings());
    effective.merge(&overrides.for_component(&name));

    debug!(component = %name, options = effective.len(), "resolved component configuration");
    component.configure(&effective)?;

    for child in component.children_mut() {
        configure_component(child, &effective, overrides)?;
    }
    Ok(())
}
