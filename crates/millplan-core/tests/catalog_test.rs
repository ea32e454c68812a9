use millplan_core::data::tools::{ToolCatalog, ToolCategory, BIG_CUTTER_DIAMETER};
use std::io::Write;

const CATALOG_JSON: &str = r#"{
    "materials": [
        {
            "name": "Alu Alloy",
            "slot_cutters": [
                { "diameter": 12.0, "rest_machining": false, "cutting_length": 15.0, "hfeed": 600.0, "vfeed": 100.0, "spin": 8000.0, "rough_step_down": 2.0, "finish_step_down": 1.0 },
                { "diameter": 6.0, "rest_machining": true, "cutting_length": 20.0, "hfeed": 400.0, "finish_hfeed": 250.0, "vfeed": 80.0, "spin": 12000.0, "rough_step_down": 1.0, "finish_step_down": 0.5 },
                { "diameter": 6.0, "rest_machining": true, "cutting_length": 8.0, "hfeed": 450.0, "vfeed": 80.0, "spin": 12000.0, "rough_step_down": 1.0 },
                { "diameter": 3.0, "rest_machining": true, "cutting_length": 10.0, "hfeed": 300.0, "vfeed": 50.0, "spin": 16000.0, "rough_step_down": 0.5 }
            ],
            "drills": [
                { "diameter": 20.0, "cutting_length": 10.0, "hfeed": 100.0, "vfeed": 40.0, "spin": 800.0, "rough_step_down": 2.0 }
            ]
        }
    ]
}"#;

#[test]
fn test_load_json_catalog_from_file() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(CATALOG_JSON.as_bytes()).unwrap();

    let catalog = ToolCatalog::load_from_file(file.path()).unwrap();
    assert_eq!(catalog.material_names(), vec!["Alu Alloy"]);

    let cutters = catalog.load_for_material(ToolCategory::SlotCutter, "ALU ALLOY");
    assert_eq!(cutters.len(), 4);

    // 5 mm deep: the 8 mm long 6 mm cutter is the shortest adequate one
    let sorted = cutters.best_single_cutters_for(5.0, None, false);
    assert_eq!(sorted, vec![0, 2, 3]);

    let capped = cutters.best_single_cutters_for(5.0, Some(BIG_CUTTER_DIAMETER), false);
    assert_eq!(capped, vec![2, 3]);

    // 9 mm deep: only the long 6 mm cutter reaches
    let deep = cutters.best_single_cutters_for(9.0, Some(BIG_CUTTER_DIAMETER), true);
    assert_eq!(deep, vec![1, 3]);
}

#[test]
fn test_catalog_toml_round_trip() {
    let catalog = ToolCatalog::from_json_str(CATALOG_JSON).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tools.toml");
    catalog.save_to_file(&path).unwrap();

    let loaded = ToolCatalog::load_from_file(&path).unwrap();
    let drills = loaded.load_for_material(ToolCategory::Drill, "alu alloy");
    assert_eq!(drills.len(), 1);
    assert_eq!(drills.tools()[0].name(), "20 mm Drill");
    assert_eq!(drills.tool_of_diameter(20.0, 6.0, 0.1), Some(0));
}

#[test]
fn test_unsupported_extension_is_rejected() {
    let file = tempfile::Builder::new().suffix(".xml").tempfile().unwrap();
    let err = ToolCatalog::load_from_file(file.path()).unwrap_err();
    assert!(err.is_catalog_error());
}

#[test]
fn test_missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = ToolCatalog::load_from_file(&dir.path().join("absent.json")).unwrap_err();
    assert!(err.to_string().starts_with("Failed to read tool catalog"));
}
