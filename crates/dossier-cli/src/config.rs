//! Where the API lives and how to authenticate against it.

use std::path::{Path, PathBuf};

use anyhow::Context;
use dossier_api::{ClientOptions, DEFAULT_BASE_URL};
use serde::Deserialize;

use crate::args::ApiArgs;

/// The configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "dossier.toml";

/// The contents of `dossier.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigFile {
    /// The root URL of the API.
    pub api_url: Option<String>,
    /// A bearer token.
    pub token: Option<String>,
    /// A PEM certificate to trust, relative to the file.
    pub cert: Option<PathBuf>,
}

impl ConfigFile {
    /// Parses a configuration file, resolving relative paths against its
    /// directory.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config: Self = toml::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;

        if let (Some(cert), Some(dir)) = (&config.cert, path.parent())
            && cert.is_relative()
        {
            config.cert = Some(dir.join(cert));
        }
        Ok(config)
    }

    /// Loads the explicitly given file, or `dossier.toml` if it exists.
    pub fn discover(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None if Path::new(CONFIG_FILE).is_file() => Self::load(Path::new(CONFIG_FILE)),
            None => Ok(Self::default()),
        }
    }
}

/// Merges flags and environment over the file over the defaults.
pub fn client_options(args: &ApiArgs, file: ConfigFile) -> ClientOptions {
    let base_url = args
        .api_url
        .clone()
        .or(file.api_url)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());

    ClientOptions {
        base_url: base_url.into(),
        token: args.token.clone().or(file.token).map(Into::into),
        cert_path: args.cert.clone().or(file.cert),
    }
}

/// Resolves the client options of a remote command.
pub fn resolve(args: &ApiArgs) -> anyhow::Result<ClientOptions> {
    let file = ConfigFile::discover(args.config.as_deref())?;
    let options = client_options(args, file);
    log::debug!("using API at {}", options.base_url);
    Ok(options)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn flags_override_the_file() {
        let file = ConfigFile {
            api_url: Some("https://dossier.example".into()),
            token: Some("from-file".into()),
            cert: None,
        };

        let args = ApiArgs::default();
        let options = client_options(&args, file.clone());
        assert_eq!(options.base_url, "https://dossier.example");
        assert_eq!(options.token.as_deref(), Some("from-file"));

        let args = ApiArgs {
            token: Some("from-flag".into()),
            ..ApiArgs::default()
        };
        let options = client_options(&args, file);
        assert_eq!(options.base_url, "https://dossier.example");
        assert_eq!(options.token.as_deref(), Some("from-flag"));
    }

    #[test]
    fn defaults_without_a_file() {
        let options = client_options(&ApiArgs::default(), ConfigFile::default());
        assert_eq!(options, ClientOptions::default());
    }

    #[test]
    fn load_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "api-url = \"http://10.0.0.5:3000\"").unwrap();
        writeln!(file, "cert = \"ca.pem\"").unwrap();

        let config = ConfigFile::load(&path).unwrap();
        assert_eq!(config.api_url.as_deref(), Some("http://10.0.0.5:3000"));
        assert_eq!(config.token, None);
        assert_eq!(config.cert, Some(dir.path().join("ca.pem")));
    }

    #[test]
    fn reject_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "api_url = \"http://x\"\n").unwrap();

        let err = ConfigFile::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse config file"));
    }
}
