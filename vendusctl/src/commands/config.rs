use clap::Args;
use tracing::debug;
use vendus_core::ConfigStore;

use crate::Result;

/// Reads a persisted setting, or writes it when a value is given.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Setting name (base-url, user, password, output, month)
    pub name: String,
    /// New value; omit to print the current one
    pub value: Option<String>,
}

/// Returns the stored value on reads, `None` on writes or when unset.
pub fn config_command(store: &ConfigStore, args: &ConfigArgs) -> Result<Option<String>> {
    match &args.value {
        Some(value) => {
            store.set(&args.name, value)?;
            debug!(key = %args.name, path = %store.path().display(), "setting stored");
            Ok(None)
        }
        None => Ok(store.get(&args.name)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(name: &str, value: Option<&str>) -> ConfigArgs {
        ConfigArgs {
            name: name.to_string(),
            value: value.map(str::to_string),
        }
    }

    #[test]
    fn set_then_get_round_trips_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::open(Some(dir.path().join("nested/.config.json"))).unwrap();

        assert_eq!(config_command(&store, &args("user", Some("ana@example.com"))).unwrap(), None);
        assert_eq!(
            config_command(&store, &args("user", None)).unwrap().as_deref(),
            Some("ana@example.com")
        );

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["user"], "ana@example.com");
    }

    #[test]
    fn unset_name_reads_as_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::open(Some(dir.path().join(".config.json"))).unwrap();
        assert_eq!(config_command(&store, &args("month", None)).unwrap(), None);
    }

    #[test]
    fn writing_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::open(Some(dir.path().join(".config.json"))).unwrap();
        config_command(&store, &args("base-url", Some("https://x"))).unwrap();
        config_command(&store, &args("user", Some("a"))).unwrap();
        config_command(&store, &args("user", Some("b"))).unwrap();
        assert_eq!(store.get("base-url").unwrap().as_deref(), Some("https://x"));
        assert_eq!(store.get("user").unwrap().as_deref(), Some("b"));
    }
}
