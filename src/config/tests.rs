use super::*;

#[test]
fn defaults_match_documented_values() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.auth.max_attempts.get(), 3);
    assert_eq!(settings.auth.lockout, Duration::from_secs(15 * 60));
    assert_eq!(settings.auth.max_sessions.get(), 10_000);
    assert_eq!(settings.cache.expiry, Duration::from_secs(24 * 3600));
    assert_eq!(settings.listing.page_size.get(), 6);
    assert!(settings.database.url.is_none());
    assert!(settings.auth.access_code.is_none());
    assert!(settings.uploads.media.is_none());
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.auth.max_attempts = Some(5);

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        auth_max_attempts: Some(4),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.auth.max_attempts.get(), 4);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn blank_strings_count_as_unset() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());
    raw.auth.access_code = Some(String::new());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
    assert!(settings.auth.access_code.is_none());
}

#[test]
fn zero_values_are_rejected() {
    let mut raw = RawSettings::default();
    raw.auth.max_attempts = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero attempts");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "auth.max_attempts",
            ..
        }
    ));

    let mut raw = RawSettings::default();
    raw.listing.page_size = Some(0);
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.auth.max_sessions = Some(0);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "auth.max_sessions",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.cache.expiry_hours = Some(0);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn media_service_needs_cloud_name_and_preset() {
    let mut raw = RawSettings::default();
    raw.uploads.cloud_name = Some("demo".to_string());
    let err = Settings::from_raw(raw.clone()).expect_err("preset missing");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "uploads.upload_preset",
            ..
        }
    ));

    raw.uploads.upload_preset = Some("unsigned".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    let media = settings.uploads.media.expect("media configured");
    assert_eq!(media.cloud_name, "demo");
    assert_eq!(media.api_base.as_str(), "https://api.cloudinary.com/");
}

#[test]
fn access_code_is_redacted_in_debug_output() {
    let mut raw = RawSettings::default();
    raw.auth.access_code = Some("hunter2".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    let rendered = format!("{:?}", settings.auth);
    assert!(!rendered.contains("hunter2"), "{rendered}");
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["folio"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_seed_arguments() {
    let args = CliArgs::parse_from(["folio", "seed", "--database-url", "postgres://example"]);

    match args.command.expect("seed command") {
        Command::Seed(seed) => {
            assert_eq!(
                seed.database.database_url.as_deref(),
                Some("postgres://example")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "folio",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--listing-page-size",
        "9",
        "--uploads-cloud-name",
        "demo",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(serve.overrides.listing_page_size, Some(9));
            assert_eq!(serve.overrides.uploads_cloud_name.as_deref(), Some("demo"));
        }
        _ => panic!("wrong command parsed"),
    }
}
