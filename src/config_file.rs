use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

const PROJECT_CONFIG_NAME: &str = ".cityfilterrc";

/// Configuration file handler for cityfilter
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ConfigFile {
    /// Arguments applied before the user's own on every run
    pub defaults: Option<String>,
}

impl ConfigFile {
    /// Find project-level .cityfilterrc by walking up from the working directory
    pub fn find_project_config() -> Option<PathBuf> {
        let current = env::current_dir().ok()?;
        Self::find_project_config_from(&current)
    }

    pub fn find_project_config_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let config_path = current.join(PROJECT_CONFIG_NAME);
            if config_path.is_file() {
                return Some(config_path);
            }
            if !current.pop() {
                // Reached filesystem root
                break;
            }
        }
        None
    }

    /// User config file locations in order of preference
    pub fn get_user_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if cfg!(windows) {
            if let Ok(appdata) = env::var("APPDATA") {
                paths.push(PathBuf::from(appdata).join("cityfilter").join("config.ini"));
            }
            if let Ok(userprofile) = env::var("USERPROFILE") {
                paths.push(PathBuf::from(userprofile).join(PROJECT_CONFIG_NAME));
            }
        } else {
            // $XDG_CONFIG_HOME/cityfilter/config.ini, then ~/.cityfilterrc
            let xdg_config = env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    env::var("HOME")
                        .map(|h| PathBuf::from(h).join(".config"))
                        .unwrap_or_else(|_| PathBuf::from(".config"))
                });

            paths.push(xdg_config.join("cityfilter").join("config.ini"));

            if let Ok(home) = env::var("HOME") {
                paths.push(PathBuf::from(home).join(PROJECT_CONFIG_NAME));
            }
        }

        paths
    }

    /// Load configuration with precedence: project > user > none
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::get_user_config_paths().into_iter().find(|p| p.is_file()) {
            config = Self::merge_configs(config, Self::load_from_path(&path)?);
        }

        if let Some(project_path) = Self::find_project_config() {
            config = Self::merge_configs(config, Self::load_from_path(&project_path)?);
        }

        Ok(config)
    }

    /// Load configuration, with an explicit file replacing discovery
    pub fn load_with_custom_path(custom_path: Option<&str>) -> Result<Self> {
        match custom_path {
            Some(path) => Self::load_from_path(Path::new(path)),
            None => Self::load(),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Ok(Self::parse_ini_content(&content))
    }

    /// Parse INI content; only the root-level `defaults` key is meaningful
    fn parse_ini_content(content: &str) -> Self {
        let mut defaults = None;
        let mut in_section = false;

        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                in_section = true;
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                if !in_section && key.trim() == "defaults" {
                    defaults = Some(value.trim().to_string());
                }
            }
        }

        Self { defaults }
    }

    /// Merge two configurations, the overlay taking precedence
    fn merge_configs(base: Self, overlay: Self) -> Self {
        Self {
            defaults: overlay.defaults.or(base.defaults),
        }
    }

    /// Insert configured defaults right after the program name
    pub fn process_args(&self, args: Vec<String>) -> Result<Vec<String>> {
        let defaults = match &self.defaults {
            Some(defaults) => defaults,
            None => return Ok(args),
        };

        let default_args = shell_words::split(defaults)
            .with_context(|| "Invalid defaults: failed to parse arguments".to_string())?;

        let mut args = args.into_iter();
        let mut result: Vec<String> = args.next().into_iter().collect();
        result.extend(default_args);
        result.extend(args);
        Ok(result)
    }

    /// Print where configuration is read from and what is active
    pub fn show_config() {
        println!("Configuration precedence: CLI > project .cityfilterrc > user config > defaults\n");

        let project_config_path = Self::find_project_config();
        let user_config_paths = Self::get_user_config_paths();
        let user_config_path = user_config_paths.iter().find(|p| p.is_file());

        match Self::load() {
            Ok(merged_config) => {
                let mut loaded_from = Vec::new();
                if let Some(project_path) = &project_config_path {
                    loaded_from.push(format!("Project: {}", project_path.display()));
                }
                if let Some(user_path) = user_config_path {
                    loaded_from.push(format!("User: {}", user_path.display()));
                }

                if loaded_from.is_empty() {
                    println!("No configuration files found. Using defaults.");
                } else {
                    println!("Configuration loaded from:");
                    for source in loaded_from {
                        println!("  {}", source);
                    }
                }

                if let Some(defaults) = &merged_config.defaults {
                    println!("\nActive defaults:");
                    println!("  defaults = {}", defaults);
                }
            }
            Err(e) => {
                eprintln!("Error loading configuration: {}", e);
            }
        }

        println!("\nConfiguration search locations (in precedence order):");
        match &project_config_path {
            Some(project_path) => println!("  1. Project: {} (found)", project_path.display()),
            None => println!("  1. Project: .cityfilterrc (searched up directory tree, not found)"),
        }
        for (i, path) in user_config_paths.iter().enumerate() {
            let status = if path.is_file() { "(found)" } else { "(not found)" };
            println!("  {}. User: {} {}", i + 2, path.display(), status);
        }

        if project_config_path.is_none() && user_config_path.is_none() {
            println!("\nExample configuration file (.cityfilterrc):");
            println!();
            println!("# Arguments applied to every cityfilter command");
            println!("defaults = --sort --stats --filter-workers 0");
        }
    }
}

/// Value of `--config-file`, looked up before clap sees the arguments
pub fn extract_config_file_arg(args: &[String]) -> Option<String> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config-file" {
            return iter.next().cloned();
        }
        if let Some(value) = arg.strip_prefix("--config-file=") {
            return Some(value.to_string());
        }
    }
    None
}
