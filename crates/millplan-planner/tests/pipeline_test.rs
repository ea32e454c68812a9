use millplan_core::{Point, Region, ToolCatalog};
use millplan_planner::{
    Document, MachiningPlanPipeline, Operation, PlanError, PrismaticPart, Report, ScriptedHost,
    SetupSheet, Stage, ToolSide,
};
use millplan_settings::PlannerConfig;

const CATALOG_JSON: &str = r#"{
    "materials": [
        {
            "name": "Alu Alloy",
            "slot_cutters": [
                { "diameter": 12.0, "cutting_length": 15.0, "hfeed": 600.0, "vfeed": 100.0, "spin": 8000.0, "rough_step_down": 2.0, "finish_step_down": 1.0 },
                { "diameter": 6.0, "rest_machining": true, "cutting_length": 20.0, "hfeed": 400.0, "finish_hfeed": 250.0, "vfeed": 80.0, "spin": 12000.0, "rough_step_down": 1.0, "finish_step_down": 0.5 },
                { "diameter": 3.0, "rest_machining": true, "cutting_length": 10.0, "hfeed": 300.0, "vfeed": 50.0, "spin": 16000.0, "rough_step_down": 0.5, "finish_step_down": 0.25 }
            ],
            "drills": [
                { "diameter": 20.0, "cutting_length": 10.0, "hfeed": 100.0, "vfeed": 40.0, "spin": 800.0, "rough_step_down": 2.0 },
                { "diameter": 3.0, "cutting_length": 12.0, "hfeed": 100.0, "vfeed": 30.0, "spin": 3000.0, "rough_step_down": 1.5 }
            ]
        },
        {
            "name": "Mild Steel",
            "slot_cutters": [
                { "diameter": 6.0, "rest_machining": true, "cutting_length": 20.0, "hfeed": 150.0, "vfeed": 30.0, "spin": 4000.0, "rough_step_down": 0.5 }
            ]
        },
        {
            "name": "Oak",
            "slot_cutters": [
                { "diameter": 6.0, "cutting_length": 20.0 }
            ]
        }
    ]
}"#;

fn catalog() -> ToolCatalog {
    ToolCatalog::from_json_str(CATALOG_JSON).unwrap()
}

/// 100 x 40 plate, `depth` thick, bottom at z = 0
fn plate(depth: f64) -> PrismaticPart {
    let mut part = PrismaticPart::new("plate", 0.0);
    part.add_face(
        depth,
        Region::rectangle(Point::new(0.0, 0.0), Point::new(100.0, 40.0)),
    );
    part
}

/// Plate with a 3 mm deep pocket and two through holes
fn pocketed_plate() -> PrismaticPart {
    let outline = Region::rectangle(Point::new(0.0, 0.0), Point::new(100.0, 40.0));
    let pocket = Region::rectangle(Point::new(20.0, 10.0), Point::new(50.0, 30.0));
    let small_hole = Region::circle(Point::new(80.0, 20.0), 1.5);
    let big_hole = Region::circle(Point::new(65.0, 20.0), 4.0);

    let mut part = PrismaticPart::new("pocketed", 0.0);
    part.add_face(
        6.0,
        outline
            .subtract(&pocket)
            .subtract(&small_hole)
            .subtract(&big_hole),
    );
    part.add_face(3.0, pocket);
    part
}

fn titles(document: &Document) -> Vec<String> {
    document
        .program
        .operations
        .iter()
        .map(|op| op.title().unwrap_or(op.kind()).to_string())
        .collect()
}

#[test]
fn test_single_hole_is_drilled() {
    let mut config = PlannerConfig::default();
    config.big_rigid_part = true;
    let catalog = catalog();

    let mut part = plate(6.0);
    part.faces[0].region = part.faces[0]
        .region
        .subtract(&Region::circle(Point::new(50.0, 20.0), 10.0));
    let mut document = Document::with_solid(part);
    let mut host = ScriptedHost::new(true);

    let outcome = MachiningPlanPipeline::new(&config, &catalog)
        .run(&mut document, &mut host, None)
        .unwrap();
    assert!(outcome.succeeded(), "{:?}", outcome.failure);
    assert_eq!(outcome.stage, Stage::Done);

    let drills: Vec<_> = document
        .program
        .operations
        .iter()
        .filter_map(|op| match op {
            Operation::Drill(d) => Some(d),
            _ => None,
        })
        .collect();
    assert_eq!(drills.len(), 1);
    let drill = drills[0];
    assert_eq!(drill.points.len(), 1);
    assert!(drill.points[0].distance(Point::new(70.0, 23.0)) < 0.01);
    assert_eq!(drill.tool_diameter, 20.0);
    assert_eq!(drill.feeds.hfeed, 100.0);
    assert_eq!(drill.feeds.vfeed, 40.0);
    assert_eq!(drill.feeds.spin, 800.0);
    assert_eq!(drill.peck_depth, 2.0);
    assert_eq!(drill.bottom_z, -6.0);

    // Only the outside is profiled
    for op in &document.program.operations {
        if let Operation::Profile(p) = op {
            assert_eq!(p.side, ToolSide::Outside);
            assert_eq!(p.tool_diameter, 12.0);
        }
    }
    assert_eq!(
        titles(&document),
        vec!["Drill", "Outside", "Outside Finish Pass"]
    );

    let slots: Vec<u32> = document.program.tools.iter().map(|t| t.slot).collect();
    assert_eq!(slots, vec![1, 3]);
    assert!(host.reports.is_empty());
}

#[test]
fn test_pocketed_plate_plan() {
    let config = PlannerConfig::default();
    let catalog = catalog();
    let mut document = Document::with_solid(pocketed_plate());
    let mut host = ScriptedHost::new(true);
    let mut sheet = SetupSheet::default();

    let outcome = MachiningPlanPipeline::new(&config, &catalog)
        .run(&mut document, &mut host, Some(&mut sheet))
        .unwrap();
    assert!(outcome.succeeded(), "{:?}", outcome.failure);

    let program = &document.program;
    let stock = program.stock.as_ref().unwrap();
    assert_eq!(stock.thickness, 6.0);
    assert_eq!(stock.width, 140.0);
    assert_eq!(stock.height, 46.0);
    assert_eq!(program.clearance_height, Some(5.0));

    let titles = titles(&document);
    assert_eq!(titles[0], "Drill");
    let first_hole = titles.iter().position(|t| t == "Hole").unwrap();
    let first_level = titles.iter().position(|t| t.starts_with("Level 1")).unwrap();
    let first_outside = titles.iter().position(|t| t == "Outside").unwrap();
    assert!(first_hole < first_level);
    assert!(first_level < first_outside);

    // The pocket is cleared at its floor depth
    let pocket = program
        .operations
        .iter()
        .find_map(|op| match op {
            Operation::Pocket(p) => Some(p),
            _ => None,
        })
        .unwrap();
    assert_eq!(pocket.bottom_z, -3.0);
    assert_eq!(pocket.tool_diameter, 6.0);
    assert_eq!(pocket.title.as_deref(), Some("Level 1 Area Clear"));

    // Every operation's tool reaches its depth
    for op in &program.operations {
        let tool = program.tool_in_slot(op.slot()).unwrap();
        assert!(tool.cutting_length + 1e-9 >= op.depth(), "{}", tool.name);
    }

    // Level operations use descending diameters
    let level_diameters: Vec<f64> = program
        .operations
        .iter()
        .filter(|op| op.title().is_some_and(|t| t.starts_with("Level 1")))
        .map(|op| op.tool_diameter())
        .collect();
    assert!(level_diameters.windows(2).all(|w| w[0] >= w[1]));

    assert_eq!(outcome.levels.len(), 1);
    assert_eq!(outcome.levels[0].top_z, -3.0);

    let sheet_text = program.output.as_deref().unwrap();
    assert!(sheet_text.contains("Stock: Alu Alloy 140.0 x 46.0 x 6.0 mm"));
    assert!(sheet_text.contains("OPERATIONS"));
}

#[test]
fn test_no_visible_solid() {
    let config = PlannerConfig::default();
    let catalog = catalog();
    let mut part = plate(6.0);
    part.visible = false;
    let mut document = Document::with_solid(part);
    let mut host = ScriptedHost::new(true);

    let outcome = MachiningPlanPipeline::new(&config, &catalog)
        .run(&mut document, &mut host, None)
        .unwrap();

    assert_eq!(outcome.failure, Some(PlanError::NoSolidFound));
    assert_eq!(outcome.stage, Stage::Failed);
    assert_eq!(
        host.reports,
        vec![Report::Failure("No Solid Found!".to_string())]
    );
    assert!(document.program.operations.is_empty());
}

#[test]
fn test_missing_catalog_material() {
    let mut config = PlannerConfig::default();
    config.material = "Acetal".to_string();
    let catalog = catalog();
    let mut document = Document::with_solid(plate(6.0));
    let mut host = ScriptedHost::new(true);

    let outcome = MachiningPlanPipeline::new(&config, &catalog)
        .run(&mut document, &mut host, None)
        .unwrap();
    assert!(matches!(
        outcome.failure,
        Some(PlanError::CatalogMissing { .. })
    ));
    assert_eq!(outcome.stages, vec![Stage::Idle, Stage::ToolsLoaded, Stage::Failed]);
}

#[test]
fn test_stock_failures() {
    let catalog = catalog();

    let mut config = PlannerConfig::default();
    config.material = "Oak".to_string();
    let mut document = Document::with_solid(plate(6.0));
    let outcome = MachiningPlanPipeline::new(&config, &catalog)
        .run(&mut document, &mut ScriptedHost::new(true), None)
        .unwrap();
    assert_eq!(
        outcome.failure,
        Some(PlanError::MaterialUnknown {
            material: "Oak".to_string()
        })
    );

    let mut config = PlannerConfig::default();
    config.material = "Mild Steel".to_string();
    let mut document = Document::with_solid(plate(8.0));
    let mut host = ScriptedHost::new(true);
    let outcome = MachiningPlanPipeline::new(&config, &catalog)
        .run(&mut document, &mut host, None)
        .unwrap();
    assert!(matches!(
        outcome.failure,
        Some(PlanError::PartTooThick { thickest, .. }) if thickest == 6.0
    ));
    assert!(document.program.tools.is_empty());
    assert!(matches!(&host.reports[0], Report::Failure(msg) if msg.starts_with("part too thick")));

    // Using the part thickness bypasses the table limit
    config.use_part_thickness = true;
    let mut document = Document::with_solid(plate(8.0));
    let outcome = MachiningPlanPipeline::new(&config, &catalog)
        .run(&mut document, &mut ScriptedHost::new(true), None)
        .unwrap();
    assert!(outcome.succeeded(), "{:?}", outcome.failure);
    assert_eq!(document.program.stock.as_ref().unwrap().thickness, 8.0);
}

#[test]
fn test_part_is_moved_into_stock() {
    let config = PlannerConfig::default();
    let catalog = catalog();
    let mut part = plate(5.0);
    part.translate(-30.0, 12.0, 7.0);
    let mut document = Document::with_solid(part);

    MachiningPlanPipeline::new(&config, &catalog)
        .run(&mut document, &mut ScriptedHost::new(true), None)
        .unwrap();

    let bounds = document.solids[0].bounding_box();
    assert!((bounds.plan.min_x - 20.0).abs() < 1e-9);
    assert!((bounds.plan.min_y - 3.0).abs() < 1e-9);
    assert!((bounds.min_z + 5.0).abs() < 1e-9);
    assert!(bounds.max_z.abs() < 1e-9);
}

#[test]
fn test_slot_exhaustion_withholds_tools() {
    let mut config = PlannerConfig::default();
    config.slot_cutter_slots = vec![3];
    let catalog = catalog();
    let mut document = Document::with_solid(pocketed_plate());
    let mut host = ScriptedHost::new(true);

    let outcome = MachiningPlanPipeline::new(&config, &catalog)
        .run(&mut document, &mut host, None)
        .unwrap();

    assert!(matches!(
        outcome.failure,
        Some(PlanError::SlotsExhausted { .. })
    ));
    assert!(document.program.tools.is_empty());
    assert_eq!(outcome.tools_added, 0);
    // Nothing planned before the failure reaches the program
    assert!(document.program.operations.is_empty());
    assert_eq!(outcome.operations_added, 0);
    match &host.reports[0] {
        Report::Failure(msg) => {
            assert_eq!(
                msg,
                "no more slot cutters available!\ntrying to add: 3 mm Slot Cutter"
            )
        }
        other => panic!("unexpected report {:?}", other),
    }
}

#[test]
fn test_cancel_restores_document() {
    let config = PlannerConfig::default();
    let catalog = catalog();
    let mut document = Document::with_solid(plate(6.0));
    let mut host = ScriptedHost::new(true).cancelling_after(3);

    let result = MachiningPlanPipeline::new(&config, &catalog).run(&mut document, &mut host, None);

    assert_eq!(result.unwrap_err(), PlanError::Cancelled);
    assert!(document.program.stock.is_none());
    assert_eq!(document.solids[0].bottom_z, 0.0);
    assert_eq!(document.history_len(), 0);
    assert!(host.reports.is_empty());
}

#[test]
fn test_existing_program_overwrite() {
    let config = PlannerConfig::default();
    let catalog = catalog();
    let mut document = Document::with_solid(plate(6.0));

    MachiningPlanPipeline::new(&config, &catalog)
        .run(&mut document, &mut ScriptedHost::new(true), None)
        .unwrap();
    let first_count = document.program.operations.len();
    assert!(first_count > 0);

    // Declined: new operations are appended
    let mut host = ScriptedHost::new(false);
    MachiningPlanPipeline::new(&config, &catalog)
        .run(&mut document, &mut host, None)
        .unwrap();
    assert_eq!(host.questions.len(), 1);
    assert_eq!(document.program.operations.len(), 2 * first_count);

    // Confirmed: the program is rebuilt from scratch
    MachiningPlanPipeline::new(&config, &catalog)
        .run(&mut document, &mut ScriptedHost::new(true), None)
        .unwrap();
    assert_eq!(document.program.operations.len(), first_count);
}

#[test]
fn test_progress_and_history() {
    let config = PlannerConfig::default();
    let catalog = catalog();
    let mut document = Document::with_solid(plate(6.0));
    let mut host = ScriptedHost::new(true);

    let outcome = MachiningPlanPipeline::new(&config, &catalog)
        .run(&mut document, &mut host, None)
        .unwrap();

    assert_eq!(outcome.stages.first(), Some(&Stage::Idle));
    assert_eq!(outcome.stages.last(), Some(&Stage::Done));
    assert!(!outcome.stages.contains(&Stage::GcodeGenerated));
    assert_eq!(host.progress.last().map(|p| p.0), Some(100));
    assert!(host.progress.windows(2).all(|w| w[0].0 <= w[1].0));

    assert_eq!(document.history_len(), 1);
    assert_eq!(document.undo().as_deref(), Some("Create Operations"));
    assert!(document.program.operations.is_empty());
}

#[test]
fn test_plan_part_loaded_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plate.json");
    std::fs::write(
        &path,
        r#"{
            "name": "plate",
            "faces": [
                { "z": 6.0, "boundaries": [
                    { "shape": "rect", "min": [0, 0], "max": [100, 40] },
                    { "shape": "circle", "center": [50, 20], "radius": 1.5, "hole": true }
                ] }
            ]
        }"#,
    )
    .unwrap();

    let part = PrismaticPart::load_from_file(&path).unwrap();
    let mut document = Document::with_solid(part);
    let config = PlannerConfig::default();
    let catalog = catalog();
    let outcome = MachiningPlanPipeline::new(&config, &catalog)
        .run(&mut document, &mut ScriptedHost::new(true), None)
        .unwrap();

    assert!(outcome.succeeded(), "{:?}", outcome.failure);
    assert_eq!(document.program.stock.as_ref().unwrap().thickness, 6.0);
    assert_eq!(titles(&document)[0], "Drill");
    assert!(PrismaticPart::load_from_file(&dir.path().join("missing.json")).is_err());
}

/// Plate with a rectangular cut-out through the whole thickness
fn plate_with_window() -> PrismaticPart {
    let mut part = PrismaticPart::new("window", 0.0);
    part.add_face(
        6.0,
        Region::rectangle(Point::new(0.0, 0.0), Point::new(100.0, 40.0)).subtract(
            &Region::rectangle(Point::new(35.0, 10.0), Point::new(65.0, 30.0)),
        ),
    );
    part
}

#[test]
fn test_inner_profiles_get_finish_pass() {
    let config = PlannerConfig::default();
    let catalog = catalog();
    let mut document = Document::with_solid(plate_with_window());

    let outcome = MachiningPlanPipeline::new(&config, &catalog)
        .run(&mut document, &mut ScriptedHost::new(true), None)
        .unwrap();
    assert!(outcome.succeeded(), "{:?}", outcome.failure);

    let titles = titles(&document);
    let rough = titles.iter().position(|t| t == "Shadow Inner").unwrap();
    let finish = titles
        .iter()
        .position(|t| t == "Shadow Inner Finish Pass")
        .unwrap();
    assert_eq!(finish, rough + 1);

    let inner: Vec<_> = document
        .program
        .operations
        .iter()
        .filter_map(|op| match op {
            Operation::Profile(p) if p.title.as_deref() == Some("Shadow Inner") => Some(p),
            _ => None,
        })
        .collect();
    assert_eq!(inner.len(), 1);
    assert_eq!(inner[0].side, ToolSide::Inside);
    assert!((inner[0].allowance - 0.1).abs() < 1e-9);
    assert!(titles.iter().any(|t| t == "Shadow Inner Rest Machining Finish Pass"));
}

#[test]
fn test_failed_run_leaves_no_dangling_operations() {
    let mut config = PlannerConfig::default();
    config.slot_cutter_slots = vec![3];
    let catalog = catalog();
    let mut document = Document::with_solid(plate_with_window());

    let outcome = MachiningPlanPipeline::new(&config, &catalog)
        .run(&mut document, &mut ScriptedHost::new(true), None)
        .unwrap();
    assert!(matches!(
        outcome.failure,
        Some(PlanError::SlotsExhausted { .. })
    ));
    for op in &document.program.operations {
        assert!(document.program.tool_in_slot(op.slot()).is_some());
    }
    assert!(document.program.operations.is_empty());
}

#[test]
fn test_finish_passes_can_be_disabled() {
    let mut config = PlannerConfig::default();
    config.finish_passes = false;
    let catalog = catalog();
    let mut document = Document::with_solid(plate_with_window());

    let outcome = MachiningPlanPipeline::new(&config, &catalog)
        .run(&mut document, &mut ScriptedHost::new(true), None)
        .unwrap();
    assert!(outcome.succeeded(), "{:?}", outcome.failure);
    let titles = titles(&document);
    assert!(titles.iter().any(|t| t == "Outside"));
    assert!(!titles.iter().any(|t| t.ends_with("Finish Pass")));
}

#[test]
fn test_covered_level_keeps_its_number() {
    let config = PlannerConfig::default();
    let catalog = catalog();
    let outline = Region::rectangle(Point::new(0.0, 0.0), Point::new(100.0, 60.0));
    let shallow = Region::rectangle(Point::new(10.0, 10.0), Point::new(40.0, 40.0));
    let covered = Region::rectangle(Point::new(15.0, 15.0), Point::new(25.0, 25.0));
    let deep = Region::rectangle(Point::new(60.0, 20.0), Point::new(85.0, 40.0));

    let mut part = PrismaticPart::new("levels", 0.0);
    part.add_face(10.0, outline.subtract(&shallow).subtract(&deep));
    part.add_face(7.0, shallow);
    part.add_face(4.0, covered);
    part.add_face(2.0, deep);
    let mut document = Document::with_solid(part);

    let outcome = MachiningPlanPipeline::new(&config, &catalog)
        .run(&mut document, &mut ScriptedHost::new(true), None)
        .unwrap();
    assert!(outcome.succeeded(), "{:?}", outcome.failure);

    let names: Vec<&str> = outcome.levels.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["Level 1", "Level 3"]);
    let titles = titles(&document);
    assert!(titles.iter().any(|t| t.starts_with("Level 3")));
    assert!(!titles.iter().any(|t| t.starts_with("Level 2")));
}
