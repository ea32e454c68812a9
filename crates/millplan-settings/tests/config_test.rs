use millplan_settings::{ConfigError, PlannerConfig, SettingsError};

#[test]
fn test_toml_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = PlannerConfig::default();
    config.set("material", "Acetal").unwrap();
    config.set("tag_y_margin", "2.5").unwrap();
    config.stock.insert("Acetal", vec![6.0, 5.0]);
    config.save_to_file(&path).unwrap();

    let loaded = PlannerConfig::load_from_file(&path).unwrap();
    assert_eq!(loaded.material, "Acetal");
    assert_eq!(loaded.tag_y_margin, 2.5);
    assert_eq!(loaded.stock.thicknesses("Acetal"), Some(&[5.0, 6.0][..]));
    assert_eq!(loaded, config);
}

#[test]
fn test_json_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    let config = PlannerConfig::default();
    config.save_to_file(&path).unwrap();
    assert_eq!(PlannerConfig::load_from_file(&path).unwrap(), config);
}

#[test]
fn test_partial_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "x_margin = 10.0\nmaterial = \"Mild Steel\"\n").unwrap();

    let config = PlannerConfig::load_from_file(&path).unwrap();
    assert_eq!(config.x_margin, 10.0);
    assert_eq!(config.material, "Mild Steel");
    assert_eq!(config.y_margin, 3.0);
    assert_eq!(config.stock.thicknesses("Mild Steel").map(<[f64]>::len), Some(5));
}

#[test]
fn test_invalid_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "precision = -1.0\n").unwrap();
    assert!(matches!(
        PlannerConfig::load_from_file(&path),
        Err(SettingsError::InvalidSetting { .. })
    ));

    let yaml = dir.path().join("config.yaml");
    std::fs::write(&yaml, "precision: 1").unwrap();
    assert!(matches!(
        PlannerConfig::load_from_file(&yaml),
        Err(SettingsError::Config(ConfigError::UnsupportedFormat(_)))
    ));
}

#[test]
fn test_load_or_default_without_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = PlannerConfig::load_or_default(&dir.path().join("missing.toml")).unwrap();
    assert_eq!(config, PlannerConfig::default());
}

#[test]
fn test_unsorted_stock_row_is_sorted_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[stock]\n\"Alu Alloy\" = [10.0, 5.0]\n").unwrap();

    let config = PlannerConfig::load_from_file(&path).unwrap();
    assert_eq!(config.stock.thicknesses("Alu Alloy"), Some(&[5.0, 10.0][..]));
    assert_eq!(
        config.stock.select("Alu Alloy", 4.0, config.precision),
        millplan_core::StockSelection::Thickness(5.0)
    );
}
