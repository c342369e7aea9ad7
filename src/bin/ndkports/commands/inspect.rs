//! `ndkports inspect` command

use anyhow::Result;

use crate::cli::InspectArgs;
use ndkports::ops::inspect;

pub fn execute(args: InspectArgs) -> Result<()> {
    let report = inspect(&args.path)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }
    Ok(())
}
