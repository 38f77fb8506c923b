//! CLI Tests

#[cfg(test)]
mod tests {
    use crate::cli::{execute, parse_value, Cli, CliConfig, CliError, OutputFormat, ValueKind};
    use clap::Parser;
    use docpref_core::{PrefError, PrefValue};
    use std::collections::BTreeSet;
    use std::path::Path;
    use tempfile::TempDir;

    async fn run(dir: &Path, args: &[&str]) -> Result<String, CliError> {
        let db = dir.join("prefs.db");
        let config = dir.join("absent.yaml");
        let mut argv = vec![
            "docpref".to_string(),
            "--config".to_string(),
            config.display().to_string(),
            "--db".to_string(),
            db.display().to_string(),
        ];
        argv.extend(args.iter().map(|a| a.to_string()));
        let cli = Cli::try_parse_from(argv).unwrap();
        execute(cli).await
    }

    /// Test CliError display implementations
    #[test]
    fn test_cli_error_display() {
        let error = CliError::KeyNotFound("theme".to_string());
        assert_eq!(format!("{}", error), "Key not found: theme");

        let error = CliError::InvalidValue {
            kind: "int".to_string(),
            value: "abc".to_string(),
        };
        assert_eq!(format!("{}", error), "Invalid int value: abc");
    }

    /// Test PrefError conversion
    #[test]
    fn test_cli_error_from_pref_error() {
        let error: CliError = PrefError::Config("bad".to_string()).into();
        assert_eq!(error, CliError::ConfigError("bad".to_string()));

        let error: CliError = PrefError::Storage("disk".to_string()).into();
        assert_eq!(error, CliError::StorageError("Storage error: disk".to_string()));
    }

    /// Test CliConfig default
    #[test]
    fn test_cli_config_default() {
        let config = CliConfig::default();
        assert!(!config.verbose);
        assert_eq!(config.output_format, OutputFormat::Pretty);
        assert_eq!(config.store.storage.collection, "prefs");
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value(ValueKind::Bool, "true").unwrap(), PrefValue::Bool(true));
        assert_eq!(parse_value(ValueKind::Int, "-3").unwrap(), PrefValue::Int(-3));
        assert_eq!(
            parse_value(ValueKind::Long, "10000000000").unwrap(),
            PrefValue::Long(10_000_000_000)
        );
        assert_eq!(parse_value(ValueKind::Float, "0.5").unwrap(), PrefValue::Float(0.5));
        assert_eq!(
            parse_value(ValueKind::String, "a,b").unwrap(),
            PrefValue::String("a,b".to_string())
        );

        let set: BTreeSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        assert_eq!(parse_value(ValueKind::Set, "b, a,").unwrap(), PrefValue::StringSet(set));
    }

    #[test]
    fn test_parse_value_rejects_bad_input() {
        assert!(matches!(
            parse_value(ValueKind::Int, "3000000000"),
            Err(CliError::InvalidValue { .. })
        ));
        assert!(parse_value(ValueKind::Bool, "yes").is_err());
        assert!(parse_value(ValueKind::Float, "one").is_err());
    }

    #[tokio::test]
    async fn test_set_get_remove() {
        let dir = TempDir::new().unwrap();

        run(dir.path(), &["set", "volume", "7", "--type", "int"]).await.unwrap();
        assert_eq!(run(dir.path(), &["get", "volume"]).await.unwrap(), "7");
        assert_eq!(run(dir.path(), &["contains", "volume"]).await.unwrap(), "true");

        let json = run(dir.path(), &["--output", "json", "get", "volume"]).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["value"]["type"], "int");
        assert_eq!(parsed["value"]["value"], 7);

        run(dir.path(), &["remove", "volume"]).await.unwrap();
        assert_eq!(
            run(dir.path(), &["get", "volume"]).await,
            Err(CliError::KeyNotFound("volume".to_string()))
        );
        assert_eq!(run(dir.path(), &["contains", "volume"]).await.unwrap(), "false");
    }

    #[tokio::test]
    async fn test_list_and_clear() {
        let dir = TempDir::new().unwrap();
        run(dir.path(), &["set", "b", "x"]).await.unwrap();
        run(dir.path(), &["set", "a", "true", "-t", "bool"]).await.unwrap();

        assert_eq!(run(dir.path(), &["list"]).await.unwrap(), "a = true\nb = x");

        run(dir.path(), &["clear"]).await.unwrap();
        assert_eq!(run(dir.path(), &["list"]).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_collections_are_separate() {
        let dir = TempDir::new().unwrap();
        run(dir.path(), &["-c", "ui", "set", "theme", "dark"]).await.unwrap();
        run(dir.path(), &["-c", "net", "set", "proxy", "none"]).await.unwrap();

        assert!(run(dir.path(), &["-c", "ui", "get", "proxy"]).await.is_err());
        assert_eq!(run(dir.path(), &["collections"]).await.unwrap(), "net\nui");
    }

    #[tokio::test]
    async fn test_non_finite_float_keeps_list_working() {
        let dir = TempDir::new().unwrap();
        run(dir.path(), &["set", "ratio", "NaN", "-t", "float"]).await.unwrap();
        run(dir.path(), &["set", "limit", "inf", "-t", "float"]).await.unwrap();
        run(dir.path(), &["set", "name", "x"]).await.unwrap();

        assert_eq!(run(dir.path(), &["get", "ratio"]).await.unwrap(), "NaN");
        assert_eq!(
            run(dir.path(), &["list"]).await.unwrap(),
            "limit = inf\nname = x\nratio = NaN"
        );

        let json = run(dir.path(), &["--output", "json", "list"]).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["limit"]["value"], "Infinity");
    }

    #[tokio::test]
    async fn test_invalid_set_value_is_not_stored() {
        let dir = TempDir::new().unwrap();
        let result = run(dir.path(), &["set", "n", "abc", "-t", "long"]).await;
        assert!(matches!(result, Err(CliError::InvalidValue { .. })));
        assert_eq!(run(dir.path(), &["contains", "n"]).await.unwrap(), "false");
    }

    #[tokio::test]
    async fn test_invalid_collection_name() {
        let dir = TempDir::new().unwrap();
        let result = run(dir.path(), &["-c", "bad name", "list"]).await;
        assert!(matches!(result, Err(CliError::StorageError(_))));
    }
}
