//! The `xiaoqiao validate` command.

use std::path::PathBuf;

use anyhow::Result;

use xiaoqiao_core::model::AbilityProfile;
use xiaoqiao_core::parser::{profile_files, read_profile_value, validate_profile};

pub fn execute(profile_path: PathBuf) -> Result<()> {
    let files = if profile_path.is_dir() {
        profile_files(&profile_path)?
    } else {
        vec![profile_path]
    };
    let single = files.len() == 1;

    let mut total_warnings = 0;
    let mut unreadable = 0;

    for path in &files {
        let document = match read_profile_value(path) {
            Ok(document) => document,
            // a single bad file is a hard error; in a directory keep going
            Err(e) if single => return Err(e),
            Err(e) => {
                println!("{}: ERROR: {e:#}", path.display());
                unreadable += 1;
                continue;
            }
        };

        let profile = AbilityProfile::from_value(&document);
        println!("Profile: {} ({})", profile.display_name(), path.display());

        let warnings = validate_profile(&document);
        for w in &warnings {
            println!("  WARNING: {w}");
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All profiles valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    if unreadable > 0 {
        anyhow::bail!("{unreadable} profile file(s) could not be read");
    }

    Ok(())
}
