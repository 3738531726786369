use pgdyn::DbConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Contents of `pgdyn.toml`.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub config_path: PathBuf,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    database: DatabaseConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    pub sequence_prefix: Option<String>,
    pub id_column: Option<String>,
    pub pool_size: Option<usize>,
}

impl ProjectConfig {
    pub fn load(config_path: PathBuf) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(&config_path).map_err(|e| {
            anyhow::anyhow!(
                "failed to read config file {}: {e}",
                config_path.display()
            )
        })?;
        Self::parse(config_path, &raw, |key| std::env::var(key).ok())
    }

    fn parse(
        config_path: PathBuf,
        raw: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let mut file: ConfigFile = toml::from_str(raw).map_err(|e| {
            anyhow::anyhow!(
                "failed to parse config file {}: {e}",
                config_path.display()
            )
        })?;

        let db = &mut file.database;
        db.url = expand_env_vars(&db.url, &lookup)?;
        if let Some(prefix) = db.sequence_prefix.as_mut() {
            *prefix = expand_env_vars(prefix, &lookup)?;
        }
        if let Some(id) = db.id_column.as_mut() {
            *id = expand_env_vars(id, &lookup)?;
        }

        Ok(Self {
            config_path,
            database: file.database,
        })
    }

    /// Load `path` when it exists. A missing file is fine only when the URL
    /// comes from `--database`.
    pub fn resolve(path: &Path, database_override: Option<&str>) -> anyhow::Result<Self> {
        let mut config = if database_override.is_some() && !path.exists() {
            Self {
                config_path: path.to_path_buf(),
                database: DatabaseConfig::default(),
            }
        } else {
            Self::load(path.to_path_buf())?
        };

        if let Some(url) = database_override {
            config.database.url = url.to_string();
        }
        if config.database.url.trim().is_empty() {
            anyhow::bail!(
                "database.url must not be empty (set it in {} or pass --database)",
                config.config_path.display()
            );
        }
        Ok(config)
    }

    /// Environment defaults (`PGDYN_*`), overridden by the file.
    pub fn db_config(&self) -> anyhow::Result<DbConfig> {
        let mut config = DbConfig::from_env()?;
        if let Some(prefix) = &self.database.sequence_prefix {
            config = config.sequence_prefix(prefix.as_str());
        }
        if let Some(id) = &self.database.id_column {
            config = config.id_column(id.as_str());
        }
        if let Some(size) = self.database.pool_size {
            if size == 0 {
                anyhow::bail!("database.pool_size must be at least 1");
            }
            config = config.max_pool_size(size);
        }
        Ok(config)
    }
}

fn expand_env_vars(input: &str, lookup: &impl Fn(&str) -> Option<String>) -> anyhow::Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut key = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                key.push(ch);
            }

            if !closed {
                anyhow::bail!("unterminated env var reference: ${{{key}}}");
            }
            if key.is_empty() {
                anyhow::bail!("invalid env var reference: ${{}}");
            }

            let v = lookup(&key)
                .ok_or_else(|| anyhow::anyhow!("missing env var for config expansion: {key}"))?;
            out.push_str(&v);
            continue;
        }

        out.push(c);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(key: &str) -> Option<String> {
        match key {
            "PGUSER" => Some("app".to_string()),
            "PGHOST" => Some("db.local".to_string()),
            _ => None,
        }
    }

    #[test]
    fn parse_full_config() {
        let raw = r#"
[database]
url = "postgres://${PGUSER}@${PGHOST}/test"
sequence_prefix = "seq_"
id_column = "pk"
pool_size = 4
"#;
        let config = ProjectConfig::parse(PathBuf::from("pgdyn.toml"), raw, env).unwrap();
        assert_eq!(config.database.url, "postgres://app@db.local/test");
        assert_eq!(config.database.sequence_prefix.as_deref(), Some("seq_"));
        assert_eq!(config.database.id_column.as_deref(), Some("pk"));
        assert_eq!(config.database.pool_size, Some(4));
    }

    #[test]
    fn missing_env_var_is_an_error() {
        let raw = "[database]\nurl = \"postgres://${NOPE}/test\"\n";
        let err = ProjectConfig::parse(PathBuf::from("pgdyn.toml"), raw, env).unwrap_err();
        assert!(err.to_string().contains("NOPE"));
    }

    #[test]
    fn unterminated_reference_is_an_error() {
        let err = expand_env_vars("postgres://${PGUSER", &env).unwrap_err();
        assert!(err.to_string().contains("unterminated"));
        assert!(expand_env_vars("${}", &env).is_err());
        assert_eq!(expand_env_vars("plain $ text", &env).unwrap(), "plain $ text");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let raw = "[database]\nurl = \"postgres://h/db\"\nschema = \"public\"\n";
        assert!(ProjectConfig::parse(PathBuf::from("pgdyn.toml"), raw, env).is_err());
    }

    #[test]
    fn database_flag_works_without_config_file() {
        let path = PathBuf::from("definitely/not/here/pgdyn.toml");
        let config = ProjectConfig::resolve(&path, Some("postgres://h/db")).unwrap();
        assert_eq!(config.database.url, "postgres://h/db");
        assert!(ProjectConfig::resolve(&path, None).is_err());
    }

    #[test]
    fn file_settings_override_defaults() {
        let config = ProjectConfig {
            config_path: PathBuf::from("pgdyn.toml"),
            database: DatabaseConfig {
                url: "postgres://h/db".into(),
                sequence_prefix: Some("seq_".into()),
                id_column: None,
                pool_size: Some(2),
            },
        };
        let db = config.db_config().unwrap();
        assert_eq!(db.sequence_prefix, "seq_");
        assert_eq!(db.max_pool_size, 2);
    }
}
