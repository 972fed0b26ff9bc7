use crate::cli::Args;
use crate::image_processing::profile::{parse_hex_color, Profile, ProfileName};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// JSON configuration file: a base profile plus optional overrides
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub profile: Option<String>,
    pub canvas_width: Option<u32>,
    pub canvas_height: Option<u32>,
    pub face_height_ratio: Option<f64>,
    pub face_position_ratio: Option<f64>,
    /// `#RRGGBB` or `#RGB`
    pub background: Option<String>,
    pub fallback_divisor: Option<u32>,
    pub min_face_size: Option<u32>,
    pub extensions: Option<String>,
    pub model: Option<String>,
    pub quality: Option<u8>,
    pub jobs: Option<usize>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Apply the file's overrides on top of `base` and validate the result
    pub fn apply_to_profile(&self, base: Profile) -> Result<Profile> {
        let mut profile = base;

        if let Some(width) = self.canvas_width {
            profile.canvas_width = width;
        }
        if let Some(height) = self.canvas_height {
            profile.canvas_height = height;
        }
        if let Some(ratio) = self.face_height_ratio {
            profile.face_height_ratio = ratio;
        }
        if let Some(ratio) = self.face_position_ratio {
            profile.face_position_ratio = ratio;
        }
        if let Some(color) = &self.background {
            profile.background = parse_hex_color(color).ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid background color format: '{}'. Expected hex format like #RRGGBB",
                    color
                )
            })?;
        }
        if let Some(divisor) = self.fallback_divisor {
            profile.fallback_divisor = divisor;
        }
        if let Some(size) = self.min_face_size {
            profile.min_face_size = size;
        }

        profile.validate()?;
        Ok(profile)
    }
}

impl Args {
    /// Load configuration from a JSON file and merge with command-line arguments.
    /// Command-line arguments take precedence over config file values.
    pub fn load_and_merge_config(&mut self) -> Result<Option<ConfigFile>> {
        let Some(config_path) = self.config_file.clone() else {
            return Ok(None);
        };

        let config = ConfigFile::load(&config_path)?;
        let args_from_cli = std::env::args().collect::<Vec<_>>();
        self.merge_from_config(&config, &args_from_cli)?;

        Ok(Some(config))
    }

    /// Take values from `config` for every option not given in `cli_args`
    pub fn merge_from_config(&mut self, config: &ConfigFile, cli_args: &[String]) -> Result<()> {
        if !given_on_cli(cli_args, &["--profile"]) {
            if let Some(name) = &config.profile {
                self.profile = ProfileName::parse(name)
                    .ok_or_else(|| anyhow::anyhow!("Unknown profile in config file: '{}'", name))?;
            }
        }

        if !given_on_cli(cli_args, &["--extensions"]) {
            if let Some(ext) = &config.extensions {
                self.extensions_str = ext.clone();
            }
        }

        if !given_on_cli(cli_args, &["--model"]) {
            if let Some(model) = &config.model {
                self.model = model.clone();
            }
        }

        if !given_on_cli(cli_args, &["--quality"]) {
            if let Some(quality) = config.quality {
                self.quality = quality;
            }
        }

        if !given_on_cli(cli_args, &["-j", "--jobs"]) {
            if let Some(jobs) = config.jobs {
                self.jobs = jobs;
            }
        }

        Ok(())
    }

    /// Named profile with any config file overrides applied
    pub fn resolve_profile(&self, config: Option<&ConfigFile>) -> Result<Profile> {
        let base = Profile::named(self.profile);
        match config {
            Some(config) => config.apply_to_profile(base),
            None => {
                base.validate()?;
                Ok(base)
            }
        }
    }
}

/// Whether any of `names` was passed, as `--flag value`, `--flag=value` or `-jN`
fn given_on_cli(cli_args: &[String], names: &[&str]) -> bool {
    cli_args.iter().any(|arg| {
        names.iter().any(|name| {
            arg == name
                || (name.starts_with("--") && arg.starts_with(&format!("{}=", name)))
                || (name.len() == 2 && !name.starts_with("--") && arg.starts_with(name) && arg.len() > 2)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_camel_case_fields() {
        let config: ConfigFile = serde_json::from_str(
            r##"{
                "profile": "uhd",
                "canvasWidth": 1000,
                "faceHeightRatio": 0.2,
                "background": "#ffffff",
                "fallbackDivisor": 3,
                "jobs": 2
            }"##,
        )
        .unwrap();

        assert_eq!(config.profile.as_deref(), Some("uhd"));
        assert_eq!(config.canvas_width, Some(1000));
        assert_eq!(config.face_height_ratio, Some(0.2));
        assert_eq!(config.fallback_divisor, Some(3));
        assert_eq!(config.jobs, Some(2));
        assert!(config.canvas_height.is_none());
    }

    #[test]
    fn test_file_overrides_profile_defaults() {
        let config = ConfigFile {
            canvas_width: Some(600),
            background: Some("#ffffff".to_string()),
            ..Default::default()
        };

        let profile = config.apply_to_profile(Profile::standard()).unwrap();

        assert_eq!(profile.canvas_width, 600);
        assert_eq!(profile.canvas_height, 1440);
        assert_eq!(profile.background, [255, 255, 255]);
        assert_eq!(profile.face_position_ratio, 0.38);
    }

    #[test]
    fn test_invalid_overrides_are_rejected() {
        let bad_ratio = ConfigFile {
            face_position_ratio: Some(1.5),
            ..Default::default()
        };
        assert!(bad_ratio.apply_to_profile(Profile::standard()).is_err());

        let bad_color = ConfigFile {
            background: Some("grey".to_string()),
            ..Default::default()
        };
        assert!(bad_color.apply_to_profile(Profile::standard()).is_err());

        let tiny_faces = ConfigFile {
            min_face_size: Some(10),
            ..Default::default()
        };
        assert!(tiny_faces.apply_to_profile(Profile::standard()).is_err());
    }

    #[test]
    fn test_cli_wins_over_file() {
        let config = ConfigFile {
            profile: Some("uhd".to_string()),
            quality: Some(70),
            jobs: Some(8),
            model: Some("u2net".to_string()),
            ..Default::default()
        };

        let mut args = Args {
            quality: 90,
            ..Default::default()
        };
        args.merge_from_config(&config, &cli(&["prog", "in", "out", "--quality", "90", "-j2"]))
            .unwrap();

        assert_eq!(args.quality, 90);
        assert_eq!(args.jobs, 1);
        assert_eq!(args.profile, ProfileName::Uhd);
        assert_eq!(args.model, "u2net");
    }

    #[test]
    fn test_unknown_profile_name() {
        let config = ConfigFile {
            profile: Some("passport".to_string()),
            ..Default::default()
        };
        let mut args = Args::default();
        assert!(args.merge_from_config(&config, &cli(&["prog"])).is_err());
    }

    #[test]
    fn test_resolve_profile_without_file() {
        let args = Args {
            profile: ProfileName::Uhd,
            ..Default::default()
        };
        assert_eq!(args.resolve_profile(None).unwrap(), Profile::uhd());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, r#"{"minFaceSize": 80, "extensions": "jpg"}"#).unwrap();

        let config = ConfigFile::load(&path).unwrap();
        assert_eq!(config.min_face_size, Some(80));
        assert_eq!(config.extensions.as_deref(), Some("jpg"));

        fs::write(&path, "{not json").unwrap();
        assert!(ConfigFile::load(&path).is_err());
    }

    #[test]
    fn test_given_on_cli_forms() {
        let args = cli(&["prog", "--quality=80", "-j4"]);
        assert!(given_on_cli(&args, &["--quality"]));
        assert!(given_on_cli(&args, &["-j", "--jobs"]));
        assert!(!given_on_cli(&args, &["--model"]));
    }
}
