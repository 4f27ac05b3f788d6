//! `skysync init`

use std::path::PathBuf;

use skysync_config::{ENV_FILE, write_env_template};

use crate::cli::{GlobalOpts, InitArgs};
use crate::error::CliError;
use crate::output;

pub fn handle(args: &InitArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = global
        .env_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(ENV_FILE));
    write_env_template(&path, args.force)?;

    output::print_output(&format!(
        "Created {}\n\n\
         Next steps:\n  \
         1. Edit {} and add your credentials\n  \
         2. Run: skysync version  (to verify configuration)\n  \
         3. Run: skysync sync --site <site-name> --dry-run",
        path.display(),
        path.display()
    ));
    Ok(())
}
