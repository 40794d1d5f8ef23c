use super::*;

#[test]
fn defaults_resolve() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.api.base_url.as_str(), "https://api.immersionkit.com/");
    assert_eq!(settings.api.max_attempts.get(), 5);
    assert_eq!(settings.api.retry_backoff, Duration::from_secs(2));
    assert_eq!(settings.store.path, PathBuf::from("ImmersionKitDB.sqlite3"));
    assert_eq!(settings.store.ttl, Duration::from_secs(604_800));
    assert_eq!(settings.store.capacity.get(), 500);
    assert!(settings.preferences.path.is_none());
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.api.base_url = Some("https://file.example".to_string());
    raw.store.path = Some(PathBuf::from("from-file.sqlite3"));
    raw.logging.level = Some("info".to_string());

    let overrides = GlobalOverrides {
        api_base_url: Some("http://127.0.0.1:9000".to_string()),
        store_path: Some(PathBuf::from("from-cli.sqlite3")),
        log_level: Some("debug".to_string()),
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.api.base_url.as_str(), "http://127.0.0.1:9000/");
    assert_eq!(settings.store.path, PathBuf::from("from-cli.sqlite3"));
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_capacity_is_rejected() {
    let mut raw = RawSettings::default();
    raw.store.capacity = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero capacity");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "store.capacity",
            ..
        }
    ));
}

#[test]
fn zero_attempts_are_rejected() {
    let mut raw = RawSettings::default();
    raw.api.max_attempts = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero attempts");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "api.max_attempts",
            ..
        }
    ));
}

#[test]
fn invalid_base_url_is_rejected() {
    let mut raw = RawSettings::default();
    raw.api.base_url = Some("not a url".to_string());

    let err = Settings::from_raw(raw).expect_err("bad url");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "api.base_url",
            ..
        }
    ));
}

#[test]
fn zero_backoff_is_allowed() {
    let mut raw = RawSettings::default();
    raw.api.retry_backoff_ms = Some(0);

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.api.retry_backoff, Duration::ZERO);
}

#[test]
fn store_settings_feed_store_config() {
    let mut raw = RawSettings::default();
    raw.store.ttl_seconds = Some(60);
    raw.store.capacity = Some(3);

    let settings = Settings::from_raw(raw).expect("valid settings");
    let config = StoreConfig::from(&settings.store);
    assert_eq!(config.ttl, Duration::from_secs(60));
    assert_eq!(config.capacity.get(), 3);
}

#[test]
fn parse_lookup_arguments() {
    let args = CliArgs::parse_from(["immersion-lookup", "lookup", "食べる", "--exact"]);
    match args.command {
        Command::Lookup(lookup) => {
            assert_eq!(lookup.vocab, "食べる");
            assert!(lookup.exact);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parse_find_sentence_arguments() {
    let args = CliArgs::parse_from([
        "immersion-lookup",
        "find-sentence",
        "ご飯を食べる",
        "--occurrence",
        "2",
        "--store-path",
        "/tmp/db.sqlite3",
    ]);
    assert_eq!(
        args.overrides.store_path,
        Some(PathBuf::from("/tmp/db.sqlite3"))
    );
    match args.command {
        Command::FindSentence(find) => {
            assert_eq!(find.sentence, "ご飯を食べる");
            assert_eq!(find.occurrence, 2);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parse_cache_subcommands() {
    let args = CliArgs::parse_from(["immersion-lookup", "cache", "delete", "「猫」"]);
    match args.command {
        Command::Cache(CacheArgs {
            command: CacheCommand::Delete { key },
        }) => assert_eq!(key, "「猫」"),
        other => panic!("unexpected command: {other:?}"),
    }

    let args = CliArgs::parse_from(["immersion-lookup", "cache", "destroy"]);
    assert!(matches!(
        args.command,
        Command::Cache(CacheArgs {
            command: CacheCommand::Destroy
        })
    ));
}

#[test]
fn file_env_and_cli_layers_resolve_in_order() {
    use std::io::Write;

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("tmp config");
    writeln!(
        file,
        "[store]\ncapacity = 7\nttl_seconds = 90\n\n[api]\nmax_attempts = 2"
    )
    .expect("write config");

    let vars: ::config::Map<String, String> = [
        ("IMMERSION__STORE__CAPACITY", "11"),
        ("IMMERSION__API__MAX_ATTEMPTS", "4"),
        ("UNRELATED__STORE__CAPACITY", "99"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect();

    let args = CliArgs::parse_from([
        "immersion-lookup",
        "--config-file",
        file.path().to_str().expect("utf-8 path"),
        "--api-max-attempts",
        "9",
        "cache",
        "list",
    ]);
    let settings =
        load_with_environment(&args, environment().source(Some(vars))).expect("settings load");

    assert_eq!(settings.store.ttl, Duration::from_secs(90));
    assert_eq!(settings.store.capacity.get(), 11);
    assert_eq!(settings.api.max_attempts.get(), 9);
}
