use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Settings that can come from the rc file or the command line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub markdown: bool,
    pub perf: bool,
    pub catalog: Option<PathBuf>,
    pub custom: Option<PathBuf>,
    pub asset_base: Option<String>,
    pub max_results: Option<usize>,
}

impl ConfigFlags {
    pub fn union(&self, other: &Self) -> Self {
        Self {
            markdown: self.markdown || other.markdown,
            perf: self.perf || other.perf,
            catalog: other.catalog.clone().or_else(|| self.catalog.clone()),
            custom: other.custom.clone().or_else(|| self.custom.clone()),
            asset_base: other
                .asset_base
                .clone()
                .or_else(|| self.asset_base.clone()),
            max_results: other.max_results.or(self.max_results),
        }
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("fedimoji").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("fedimoji")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("fedimoji").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("fedimoji")
                .join("config");
        }
    }

    PathBuf::from(".fedimojirc")
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".fedimojirc")
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = Vec::new();
    lines.push("# fedimoji defaults (saved with --save)".to_string());
    if flags.markdown {
        lines.push("--markdown".to_string());
    }
    if flags.perf {
        lines.push("--perf".to_string());
    }
    if let Some(path) = &flags.catalog {
        lines.push(format!("--catalog {}", path.display()));
    }
    if let Some(path) = &flags.custom {
        lines.push(format!("--custom {}", path.display()));
    }
    if let Some(base) = &flags.asset_base {
        lines.push(format!("--asset-base {base}"));
    }
    if let Some(max) = flags.max_results {
        lines.push(format!("--max-results {max}"));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick the known flags out of a token list. Anything else (subcommands,
/// positional arguments, unknown flags) is ignored.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let (name, inline) = match token.split_once('=') {
            Some((name, value)) if name.starts_with("--") => (name, Some(value)),
            _ => (token, None),
        };
        match name {
            "--markdown" => flags.markdown = true,
            "--perf" => flags.perf = true,
            "--catalog" | "--custom" | "--asset-base" | "--max-results" => {
                let value = match inline {
                    Some(value) => Some(value),
                    None => {
                        i += 1;
                        tokens.get(i).map(String::as_str)
                    }
                };
                if let Some(value) = value {
                    apply_value(&mut flags, name, value);
                }
            }
            _ => {}
        }
        i += 1;
    }
    flags
}

fn apply_value(flags: &mut ConfigFlags, name: &str, value: &str) {
    match name {
        "--catalog" => flags.catalog = Some(PathBuf::from(value)),
        "--custom" => flags.custom = Some(PathBuf::from(value)),
        "--asset-base" => flags.asset_base = Some(value.to_string()),
        "--max-results" => match value.parse() {
            Ok(max) => flags.max_results = Some(max),
            Err(_) => tracing::warn!(value, "ignoring invalid --max-results"),
        },
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_flag_tokens_extracts_known_flags() {
        let args = vec![
            "fedimoji".to_string(),
            "--markdown".to_string(),
            "--catalog".to_string(),
            "emoji.json".to_string(),
            "--asset-base=/static/emoji".to_string(),
            "--max-results".to_string(),
            "8".to_string(),
            "render".to_string(),
            "post.html".to_string(),
        ];
        let flags = parse_flag_tokens(&args);
        assert!(flags.markdown);
        assert_eq!(flags.catalog, Some(PathBuf::from("emoji.json")));
        assert_eq!(flags.asset_base.as_deref(), Some("/static/emoji"));
        assert_eq!(flags.max_results, Some(8));
        assert!(!flags.perf);
    }

    #[test]
    fn test_parse_flag_tokens_ignores_invalid_max_results() {
        let args = vec!["--max-results=lots".to_string()];
        assert_eq!(parse_flag_tokens(&args).max_results, None);
    }

    #[test]
    fn test_config_union_merges_cli_over_file_for_options() {
        let file = ConfigFlags {
            markdown: true,
            asset_base: Some("/file".to_string()),
            max_results: Some(3),
            ..ConfigFlags::default()
        };
        let cli = ConfigFlags {
            perf: true,
            asset_base: Some("/cli".to_string()),
            ..ConfigFlags::default()
        };
        let merged = file.union(&cli);
        assert!(merged.markdown);
        assert!(merged.perf);
        assert_eq!(merged.asset_base.as_deref(), Some("/cli"));
        assert_eq!(merged.max_results, Some(3));
    }

    #[test]
    fn test_save_load_and_clear_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(".fedimojirc");
        let flags = ConfigFlags {
            markdown: true,
            perf: true,
            catalog: Some(PathBuf::from("emoji.json")),
            custom: Some(PathBuf::from("custom.json")),
            asset_base: Some("/static/emoji".to_string()),
            max_results: Some(12),
        };

        save_config_flags(&path, &flags).unwrap();
        let loaded = load_config_flags(&path).unwrap();
        assert_eq!(loaded, flags);

        clear_config_flags(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_load_missing_config_is_default() {
        let dir = tempdir().unwrap();
        let loaded = load_config_flags(&dir.path().join("absent")).unwrap();
        assert_eq!(loaded, ConfigFlags::default());
    }
}
