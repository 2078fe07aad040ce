use std::path::PathBuf;

const APP_DIR: &str = "nadctl";
const CACHE_FILE_NAME: &str = ".nadctl_cache.json";

pub fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

pub fn config_dir() -> PathBuf {
    // On macOS and Linux, always use ~/.config/nadctl/
    // (avoid macOS Application Support folder for consistency)
    #[cfg(unix)]
    {
        home_dir().join(".config").join(APP_DIR)
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }
}

pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Log files live here.
pub fn data_dir() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(".local")
            .join("share")
            .join(APP_DIR)
    }
    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }
}

/// Discovery cache, kept directly in the home directory.
pub fn cache_file() -> PathBuf {
    home_dir().join(CACHE_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_namespaced() {
        assert!(config_file().ends_with("nadctl/config.toml"));
        assert!(data_dir().ends_with("nadctl"));
        assert_eq!(cache_file().file_name().unwrap(), ".nadctl_cache.json");
    }
}
