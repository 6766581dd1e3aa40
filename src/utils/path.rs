use std::path::PathBuf;

const CONFIG_ENV: &str = "STUDY_LEAGUE_CONFIG";

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("org", "studyleague", "StudyLeague")
}

/// Default database location
pub fn get_database_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("study_league.db"))
        .unwrap_or_else(|| PathBuf::from("study_league.db"))
}

/// Config file location, `$STUDY_LEAGUE_CONFIG` wins over the platform directory
pub fn get_config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }

    project_dirs()
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_path_has_file_name() {
        let path = get_database_path();
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("study_league.db"));
    }
}
