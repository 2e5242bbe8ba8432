//! Settings read from the user's configuration file.

use std::{
    fs,
    io,
    path::{Path, PathBuf},
};

#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Dump the scope stack to the log whenever a symbol cannot be found.
    pub debug_symbol_not_found: bool,

    /// Include global bindings in scope dumps.
    pub show_global_scope: bool,

    /// Files to source before anything else runs.
    pub prelude: Vec<PathBuf>,
}

impl Config {
    /// Parse a configuration file. Relative prelude paths are resolved
    /// against the directory the file is in.
    pub fn load(path: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        let mut config = Self::from_toml(&text)?;

        if let Some(dir) = path.parent() {
            for file in config.prelude.iter_mut() {
                if file.is_relative() {
                    *file = dir.join(&*file);
                }
            }
        }

        log::debug!("loaded config from {}", path.display());

        Ok(config)
    }

    pub fn from_toml(text: &str) -> io::Result<Self> {
        toml::from_str(text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_use_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());

        let config = Config::from_toml("show-global-scope = true").unwrap();
        assert!(config.show_global_scope);
        assert!(!config.debug_symbol_not_found);
    }

    #[test]
    fn unknown_types_are_rejected() {
        let error = Config::from_toml("prelude = 1").unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn prelude_paths_are_relative_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sapling.toml");
        fs::write(&path, "debug-symbol-not-found = true\nprelude = [\"init.sap\", \"/abs.sap\"]").unwrap();

        let config = Config::load(&path).unwrap();

        assert!(config.debug_symbol_not_found);
        assert_eq!(config.prelude, vec![dir.path().join("init.sap"), PathBuf::from("/abs.sap")]);
    }
}
