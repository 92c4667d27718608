use anyhow::Result;

use crate::common::{ConfigArgs, resolve_partitions};

/// List the partition tables a run would process, in order.
pub fn partitions_command(args: &ConfigArgs) -> Result<()> {
    let config = args.load()?;
    for partition in resolve_partitions(&config)? {
        println!("{partition}");
    }
    Ok(())
}
