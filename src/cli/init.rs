use crate::error::{PosError, Result};
use crate::settings::{
    load_settings, save_settings, settings_file_exists, settings_path, shellexpand_path,
};

pub fn run(data_dir: Option<String>, location: Option<String>, force: bool) -> Result<()> {
    if settings_file_exists() && !force {
        return Err(PosError::Settings(format!(
            "{} already exists (use --force to overwrite)",
            settings_path().display()
        )));
    }

    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    if let Some(name) = location {
        settings.location_name = name;
    }

    std::fs::create_dir_all(&settings.data_dir)?;
    save_settings(&settings)?;
    println!("Settings written to {}", settings_path().display());
    println!("Data directory: {}", settings.data_dir);
    Ok(())
}
