use directories::ProjectDirs;
use std::path::PathBuf;

const CONFIG_FILE_NAME: &str = "sapling.toml";

/// Default location of the configuration file, if the platform has a home
/// directory to put it in.
pub fn config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "sapling", "Sapling")
}
