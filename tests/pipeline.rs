use std::fs;
use std::path::Path;

use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use tempfile::TempDir;

use gazekit::data::model::ColumnType;
use gazekit::definition::CategoryConfig;
use gazekit::{
    load_event_files, load_gaze_files, load_precomputed_event_files,
    load_precomputed_reading_measures, save_events, save_preprocessed, scan_dataset,
    subset_from_json, take_subset, DataCategory, DatasetDefinition, DatasetPaths, EventFrame,
    GazeError, GazeLoadOptions,
};

fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn definition() -> DatasetDefinition {
    DatasetDefinition::from_json_str(
        r#"{
            "name": "toy",
            "gaze": {
                "filename_format": "{subject_id:d}/{session}.csv",
                "schema_overrides": {"subject_id": "int64"}
            },
            "trial_columns": ["subject_id", "trial_id"],
            "time_column": "t",
            "pixel_columns": ["x", "y"]
        }"#,
    )
    .unwrap()
}

/// Two subjects with one or two sessions each, plus a file the pattern ignores.
fn dataset() -> (TempDir, DatasetPaths) {
    let dir = tempfile::tempdir().unwrap();
    let paths = DatasetPaths::new(dir.path(), "toy");
    let raw = paths.raw();
    write(&raw.join("2/a.csv"), "t,x,y,trial_id\n0,10.5,20.5,1\n2,11.5,21.5,1\n4,12.5,22.5,2\n");
    write(&raw.join("1/b.csv"), "t,x,y,trial_id\n0,1.5,2.5,1\n2,1.25,2.75,1\n");
    write(&raw.join("1/a.csv"), "t,x,y,trial_id\n0,5.5,6.5,1\n");
    write(&raw.join("notes.txt"), "not a recording\n");
    (dir, paths)
}

fn quiet() -> GazeLoadOptions<'static> {
    GazeLoadOptions {
        show_progress: false,
        ..GazeLoadOptions::default()
    }
}

#[test]
fn scan_sorts_and_casts_fileinfo() {
    let (_dir, paths) = dataset();
    let fileinfo = scan_dataset(&definition(), &paths).unwrap();

    assert!(fileinfo.get(DataCategory::PrecomputedEvents).is_none());
    let gaze = fileinfo.gaze().unwrap();
    assert_eq!(gaze.column_names(), vec!["filepath", "subject_id", "session"]);
    assert_eq!(gaze.len(), 3);
    assert_eq!(gaze.filepath(0), Some("1/a.csv"));
    assert_eq!(gaze.filepath(2), Some("2/a.csv"));
    assert_eq!(gaze.columns()[1].dtype, ColumnType::Int64);
}

#[test]
fn empty_raw_directory_is_a_discovery_error() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DatasetPaths::new(dir.path(), ".");
    fs::create_dir_all(paths.raw()).unwrap();

    let err = scan_dataset(&definition(), &paths).unwrap_err();
    assert!(matches!(err, GazeError::Discovery { .. }));
}

#[test]
fn loaded_frames_carry_metadata_and_trial_columns() {
    let (_dir, paths) = dataset();
    let definition = definition();
    let fileinfo = scan_dataset(&definition, &paths).unwrap();
    let gaze_fileinfo = fileinfo.gaze().unwrap();

    let gaze = load_gaze_files(&definition, gaze_fileinfo, &paths, quiet()).unwrap();
    assert_eq!(gaze.len(), 3);

    let last = &gaze[2];
    assert_eq!(
        last.columns(),
        vec!["subject_id", "session", "time", "pixel", "trial_id"]
    );
    assert_eq!(last.trial_columns, vec!["subject_id", "session", "trial_id"]);
    assert_eq!(last.n_components("pixel"), Some(2));

    let subject = last.frame.column_by_name("subject_id").unwrap();
    assert_eq!(subject.data_type(), &DataType::Int64);
    assert_eq!(subject.as_primitive::<Int64Type>().value(0), 2);
}

#[test]
fn subset_restricts_loaded_files() {
    let (_dir, paths) = dataset();
    let definition = definition();
    let fileinfo = scan_dataset(&definition, &paths).unwrap();

    let subset = subset_from_json(serde_json::json!({"subject_id": 1})).unwrap();
    let fileinfo = take_subset(fileinfo, Some(&subset)).unwrap();
    let gaze = load_gaze_files(&definition, fileinfo.gaze().unwrap(), &paths, quiet()).unwrap();
    assert_eq!(gaze.len(), 2);

    let err = take_subset(
        scan_dataset(&definition, &paths).unwrap(),
        Some(&subset_from_json(serde_json::json!({"unknown_col": 1})).unwrap()),
    )
    .unwrap_err();
    assert!(matches!(err, GazeError::Configuration(_)));
}

#[test]
fn feather_round_trip_restores_frames() {
    let (_dir, paths) = dataset();
    let definition = definition();
    let fileinfo = scan_dataset(&definition, &paths).unwrap();
    let gaze_fileinfo = fileinfo.gaze().unwrap();
    let gaze = load_gaze_files(&definition, gaze_fileinfo, &paths, quiet()).unwrap();

    save_preprocessed(&gaze, gaze_fileinfo, &paths, None, 0, "feather").unwrap();
    let saved = paths.preprocessed().join("1").join("b.feather");
    assert!(saved.is_file());

    let options = GazeLoadOptions {
        preprocessed: true,
        ..quiet()
    };
    let reloaded = load_gaze_files(&definition, gaze_fileinfo, &paths, options).unwrap();
    assert_eq!(reloaded, gaze);
}

#[test]
fn csv_round_trip_unnests_and_renests_components() {
    let (_dir, paths) = dataset();
    let definition = definition();
    let fileinfo = scan_dataset(&definition, &paths).unwrap();
    let gaze_fileinfo = fileinfo.gaze().unwrap();
    let gaze = load_gaze_files(&definition, gaze_fileinfo, &paths, quiet()).unwrap();

    save_preprocessed(&gaze, gaze_fileinfo, &paths, Some("preprocessed_csv"), 0, "csv").unwrap();
    let saved = paths.dataset().join("preprocessed_csv").join("2").join("a.csv");
    let text = fs::read_to_string(&saved).unwrap();
    assert_eq!(text.lines().next(), Some("time,pixel_x,pixel_y,trial_id"));

    let options = GazeLoadOptions {
        preprocessed: true,
        preprocessed_dirname: Some("preprocessed_csv"),
        extension: "csv",
        show_progress: false,
    };
    let reloaded = load_gaze_files(&definition, gaze_fileinfo, &paths, options).unwrap();
    assert_eq!(reloaded[2].columns(), gaze[2].columns());

    let pixel = reloaded[2].frame.column_by_name("pixel").unwrap();
    let pixel = pixel.as_list::<i32>();
    let first = pixel.value(0);
    let first = first.as_primitive::<Float64Type>();
    assert_eq!(first.values().to_vec(), vec![10.5, 20.5]);
}

#[test]
fn saving_twice_is_byte_identical() {
    let (_dir, paths) = dataset();
    let definition = definition();
    let fileinfo = scan_dataset(&definition, &paths).unwrap();
    let gaze_fileinfo = fileinfo.gaze().unwrap();
    let gaze = load_gaze_files(&definition, gaze_fileinfo, &paths, quiet()).unwrap();

    for extension in ["feather", "csv"] {
        save_preprocessed(&gaze, gaze_fileinfo, &paths, None, 0, extension).unwrap();
        let path = paths.preprocessed().join("1").join(format!("a.{extension}"));
        let first = fs::read(&path).unwrap();

        save_preprocessed(&gaze, gaze_fileinfo, &paths, None, 0, extension).unwrap();
        assert_eq!(fs::read(&path).unwrap(), first);
    }
}

#[test]
fn unsupported_formats_name_the_valid_set() {
    let (_dir, paths) = dataset();
    let definition = definition();
    let fileinfo = scan_dataset(&definition, &paths).unwrap();
    let gaze_fileinfo = fileinfo.gaze().unwrap();
    let gaze = load_gaze_files(&definition, gaze_fileinfo, &paths, quiet()).unwrap();

    let err = save_preprocessed(&gaze, gaze_fileinfo, &paths, None, 0, "json").unwrap_err();
    assert_eq!(
        err.to_string(),
        "unsupported file format \"json\". Supported formats are: csv, feather"
    );
    assert!(!paths.preprocessed().exists());

    let options = GazeLoadOptions {
        preprocessed: true,
        extension: "xyz",
        show_progress: false,
        ..GazeLoadOptions::default()
    };
    let err = load_gaze_files(&definition, gaze_fileinfo, &paths, options).unwrap_err();
    assert_eq!(
        err.to_string(),
        "unsupported file format \".xyz\". Supported formats are: csv, tsv, txt, feather, asc"
    );
}

#[test]
fn events_round_trip_through_events_tree() {
    let (_dir, paths) = dataset();
    let definition = definition();
    let fileinfo = scan_dataset(&definition, &paths).unwrap();
    let gaze_fileinfo = fileinfo.gaze().unwrap();

    let events: Vec<EventFrame> = (0..gaze_fileinfo.len())
        .map(|i| {
            let path = paths.dataset().join(format!("events_{i}.csv"));
            write(&path, "name,onset,offset\nfixation,0.5,120.5\nsaccade,120.5,150.5\n");
            let batch = gazekit::formats::delimited::read_delimited(
                &path,
                &gazekit::definition::ReadOptions::default(),
            )
            .unwrap();
            EventFrame::new(batch).unwrap()
        })
        .collect();

    save_events(&events, gaze_fileinfo, &paths, None, 0, "feather").unwrap();
    assert!(paths.events().join("2").join("a.feather").is_file());

    let loaded = load_event_files(&definition, gaze_fileinfo, &paths, None, "feather").unwrap();
    assert_eq!(loaded.len(), 3);
    let schema = loaded[0].frame.schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(names, vec!["subject_id", "session", "name", "onset", "offset", "duration"]);

    let duration = loaded[0].frame.column_by_name("duration").unwrap();
    assert_eq!(duration.as_primitive::<Float64Type>().value(1), 30.0);
}

#[test]
fn asc_recordings_load_as_gaze() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DatasetPaths::new(dir.path(), ".");
    write(
        &paths.raw().join("sub_7.asc"),
        "** CONVERTED FROM sub_7.edf\n\
         SAMPLES\tGAZE\tRIGHT\tRATE\t1000.00\tTRACKING\tCR\n\
         100\t512.5\t384.0\t1100.0\t...\n\
         101\t.\t.\t0.0\t...\n\
         EFIX R 100 101 2 512.5 384.0 1100\n\
         102\t514.0\t385.5\t1098.0\t...\n",
    );

    let definition = DatasetDefinition {
        gaze: CategoryConfig {
            filename_format: Some("sub_{subject_id:d}.asc".into()),
            ..CategoryConfig::default()
        },
        ..DatasetDefinition::default()
    };
    let fileinfo = scan_dataset(&definition, &paths).unwrap();
    let gaze = load_gaze_files(&definition, fileinfo.gaze().unwrap(), &paths, quiet()).unwrap();

    let frame = &gaze[0];
    assert_eq!(frame.num_rows(), 3);
    assert_eq!(frame.columns(), vec!["subject_id", "time", "pixel", "pupil"]);
    assert!(frame.frame.column_by_name("pixel").unwrap().as_list::<i32>().value(1).is_null(0));
}

#[test]
fn precomputed_tables_load_from_their_trees() {
    let dir = tempfile::tempdir().unwrap();
    let paths = DatasetPaths::new(dir.path(), ".");
    write(&paths.raw().join("1.csv"), "t,x,y\n0,1.5,2.5\n");
    write(
        &paths.precomputed_events().join("fixations_1.tsv"),
        "subject\tonset\toffset\n1\t0\t200\n",
    );
    write(
        &paths.precomputed_reading_measures().join("rm_1.csv"),
        "# exported\nword,dwell\nthe,120\n",
    );

    let mut definition = definition();
    definition.gaze.filename_format = Some("{subject_id:d}.csv".into());
    definition.precomputed_events = CategoryConfig {
        filename_format: Some("fixations_{subject_id:d}.tsv".into()),
        ..CategoryConfig::default()
    };
    definition.precomputed_reading_measures = CategoryConfig {
        filename_format: Some("rm_{subject_id:d}.csv".into()),
        ..CategoryConfig::default()
    };
    definition.precomputed_reading_measures.read_options.comment_prefix = Some('#');

    let fileinfo = scan_dataset(&definition, &paths).unwrap();
    assert_eq!(fileinfo.iter().count(), 3);

    let events = load_precomputed_event_files(
        &definition,
        fileinfo.get(DataCategory::PrecomputedEvents).unwrap(),
        &paths,
    )
    .unwrap();
    assert_eq!(events[0].frame.num_columns(), 3);

    let measures = load_precomputed_reading_measures(
        &definition,
        fileinfo.get(DataCategory::PrecomputedReadingMeasures).unwrap(),
        &paths,
    )
    .unwrap();
    assert_eq!(measures[0].frame.num_rows(), 1);
}

#[test]
fn malformed_file_aborts_the_whole_load() {
    let (_dir, paths) = dataset();
    // second of the three files in fileinfo order
    write(&paths.raw().join("1/b.csv"), "t,x,y,trial_id\n0,1.5,2.5,1\n2,1.5\n");
    let definition = definition();
    let fileinfo = scan_dataset(&definition, &paths).unwrap();
    let gaze_fileinfo = fileinfo.gaze().unwrap();
    assert_eq!(gaze_fileinfo.filepath(1), Some("1/b.csv"));

    let err = load_gaze_files(&definition, gaze_fileinfo, &paths, quiet()).unwrap_err();
    match err {
        GazeError::Parse { path, .. } => assert!(path.ends_with("1/b.csv")),
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn failed_write_stops_the_remaining_saves() {
    let (_dir, paths) = dataset();
    let definition = definition();
    let fileinfo = scan_dataset(&definition, &paths).unwrap();
    let gaze_fileinfo = fileinfo.gaze().unwrap();
    let gaze = load_gaze_files(&definition, gaze_fileinfo, &paths, quiet()).unwrap();

    // a directory where the second destination file should go
    let preprocessed = paths.preprocessed();
    fs::create_dir_all(preprocessed.join("1").join("b.feather")).unwrap();

    let err = save_preprocessed(&gaze, gaze_fileinfo, &paths, None, 0, "feather").unwrap_err();
    assert!(matches!(err, GazeError::Io(_)), "{err:?}");
    assert!(preprocessed.join("1").join("a.feather").is_file());
    assert!(!preprocessed.join("2").join("a.feather").exists());
}

#[test]
fn empty_recording_keeps_its_components_in_csv() {
    let (_dir, paths) = dataset();
    write(&paths.raw().join("1/a.csv"), "t,x,y,trial_id\n");
    let definition = definition();
    let fileinfo = scan_dataset(&definition, &paths).unwrap();
    let gaze_fileinfo = fileinfo.gaze().unwrap();
    let gaze = load_gaze_files(&definition, gaze_fileinfo, &paths, quiet()).unwrap();
    assert_eq!(gaze[0].num_rows(), 0);

    save_preprocessed(&gaze, gaze_fileinfo, &paths, None, 0, "csv").unwrap();
    let text = fs::read_to_string(paths.preprocessed().join("1").join("a.csv")).unwrap();
    assert_eq!(text.lines().collect::<Vec<_>>(), vec!["time,pixel_x,pixel_y,trial_id"]);
}
