//! Config command handler

use crate::error::CliResult;
use crate::ConfigArgs;
use swiftcheck::HarnessConfig;

/// Render the configuration the run command would use
pub fn render_config(harness: &HarnessConfig, args: &ConfigArgs) -> CliResult<String> {
    let yaml = if args.defaults {
        HarnessConfig::default().to_yaml()?
    } else {
        harness.to_yaml()?
    };
    Ok(yaml)
}

/// Execute the config command
pub fn execute_config(harness: &HarnessConfig, args: &ConfigArgs) -> CliResult<()> {
    print!("{}", render_config(harness, args)?);
    Ok(())
}
