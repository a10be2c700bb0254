//! Workspace-level sweep lifecycle tests.
//!
//! These exercise the full enumerate → reconcile → dispatch cycle against a
//! real temp directory, with a sink that plays the generation server: each
//! accepted prompt "produces" its output file, so resume behaves exactly as
//! it would across real runs.

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

use sweepgrid_core::dispatch::{run_sweep, set_input_literal};
use sweepgrid_core::{
    reconcile, Axis, AxisId, AxisSet, AxisSpec, AxisValue, PromptSink, SaveTarget, SegmentKey,
    SubmitError, SweepError, ValueKind,
};

/// Plays the server: every accepted submission drops the expected output
/// file into the images folder, like a completed generation would.
struct FileDroppingSink {
    dir: PathBuf,
    submitted: Vec<String>,
    fail_on: Option<usize>,
}

impl FileDroppingSink {
    fn new(dir: &Path) -> Self {
        FileDroppingSink {
            dir: dir.to_path_buf(),
            submitted: Vec::new(),
            fail_on: None,
        }
    }
}

impl PromptSink for FileDroppingSink {
    fn submit(&mut self, key: &SegmentKey, prompt: &Value) -> Result<(), SubmitError> {
        if self.fail_on == Some(self.submitted.len() + 1) {
            return Err(SubmitError::Transport {
                message: "connection reset".to_string(),
            });
        }
        assert!(
            prompt.get("9").is_some(),
            "sink must receive the full mutated template"
        );
        fs::create_dir_all(&self.dir).unwrap();
        fs::write(self.dir.join(key.output_file_name()), b"png").unwrap();
        self.submitted.push(key.to_string());
        Ok(())
    }
}

fn template() -> Value {
    json!({
        "9": {"inputs": {"filename_prefix": "default"}},
        "31": {"inputs": {"steps": ["4", 0], "cfg": 7.0}},
        "38": {"inputs": {"text": "placeholder"}},
    })
}

fn axis(id: AxisId, node: &str, input: &str, values: Vec<AxisValue>) -> Axis {
    Axis {
        id,
        target: sweepgrid_core::AxisTarget {
            node_id: node.to_string(),
            input: input.to_string(),
        },
        values,
    }
}

fn steps_cfg_set(steps: &[i64], cfgs: &[f64]) -> AxisSet {
    AxisSet::from_axes(vec![
        axis(
            AxisId::S,
            "31",
            "steps",
            steps.iter().copied().map(AxisValue::Int).collect(),
        ),
        axis(
            AxisId::T,
            "31",
            "cfg",
            cfgs.iter().copied().map(AxisValue::Float).collect(),
        ),
    ])
}

#[test]
fn second_identical_run_submits_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("images").join("Demo");
    let set = steps_cfg_set(&[10, 20], &[4.0, 7.5, 8.0]);
    let save = SaveTarget::parse("9:filename_prefix:Demo").unwrap();
    let template = template();

    let mut sink = FileDroppingSink::new(&out);
    let first = run_sweep(&set, &template, &save, &out, &mut sink).unwrap();
    assert_eq!(first.submitted, 6);
    assert_eq!(first.skipped, 0);

    let mut sink = FileDroppingSink::new(&out);
    let second = run_sweep(&set, &template, &save, &out, &mut sink).unwrap();
    assert_eq!(second.submitted, 0, "identical rerun is a no-op");
    assert_eq!(second.skipped, 6);
}

#[test]
fn axis_change_cleans_orphans_then_fills_gaps() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("images").join("Demo");
    let save = SaveTarget::parse("9:filename_prefix:Demo").unwrap();
    let template = template();

    let old = steps_cfg_set(&[10, 20], &[4.0]);
    let mut sink = FileDroppingSink::new(&out);
    run_sweep(&old, &template, &save, &out, &mut sink).unwrap();
    fs::create_dir(out.join("keepme")).unwrap();

    // New definition drops steps=20 and adds cfg=8.0.
    let new = steps_cfg_set(&[10, 30], &[4.0, 8.0]);
    let expected = reconcile::expected_set(&new);
    let removed = reconcile::clean_output_dir(&out, &expected);
    assert_eq!(
        removed,
        vec!["31-steps-20--31-cfg-4_0_00001.png".to_string()],
        "only the orphaned combination is deleted"
    );
    assert!(out.join("keepme").is_dir(), "subdirectories survive cleanup");

    let mut sink = FileDroppingSink::new(&out);
    let outcome = run_sweep(&new, &template, &save, &out, &mut sink).unwrap();
    assert_eq!(outcome.skipped, 1, "steps=10/cfg=4.0 survives from the old run");
    assert_eq!(outcome.submitted, 3, "the three new combinations are filled in");

    let on_disk: Vec<String> = fs::read_dir(&out)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(on_disk.len(), expected.len());
    assert!(on_disk.iter().all(|n| expected.contains(n)));
}

#[test]
fn interrupted_run_resumes_from_the_gap() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("images").join("Demo");
    let set = steps_cfg_set(&[1, 2, 3], &[4.0, 7.5]);
    let save = SaveTarget::parse("9:filename_prefix:Demo").unwrap();
    let template = template();

    let mut sink = FileDroppingSink::new(&out);
    sink.fail_on = Some(5);
    let err = run_sweep(&set, &template, &save, &out, &mut sink).unwrap_err();
    assert!(matches!(err, SweepError::Submit(SubmitError::Transport { .. })));
    assert_eq!(
        sink.submitted.len(),
        4,
        "combinations 1-4 landed, 5 failed, 6 was never attempted"
    );

    let mut sink = FileDroppingSink::new(&out);
    let outcome = run_sweep(&set, &template, &save, &out, &mut sink).unwrap();
    assert_eq!(outcome.skipped, 4);
    assert_eq!(outcome.submitted, 2, "rerun picks up combination 5 and 6 only");
    assert_eq!(
        sink.submitted,
        vec![
            "31-steps-3--31-cfg-4_0".to_string(),
            "31-steps-3--31-cfg-7_5".to_string(),
        ]
    );
}

#[test]
fn loaded_axes_drive_the_same_pipeline_as_handmade_ones() {
    let tmp = tempfile::tempdir().unwrap();
    let params = tmp.path().join("params");
    fs::create_dir_all(&params).unwrap();
    fs::write(params.join("31-steps.txt"), "10\n20\n").unwrap();
    fs::write(params.join("31-cfg.txt"), "# sweep cfg\n7.5\n").unwrap();

    let template = template();
    let mut specs: [Option<AxisSpec>; AxisId::COUNT] = Default::default();
    specs[AxisId::S.slot()] = Some(AxisSpec {
        file_name: "31-steps.txt".to_string(),
        kind: ValueKind::Int,
    });
    specs[AxisId::T.slot()] = Some(AxisSpec {
        file_name: "31-cfg.txt".to_string(),
        kind: ValueKind::Float,
    });
    let set = AxisSet::load(specs, &params, &template).unwrap();

    let out = params.join("images").join("Demo");
    let save = SaveTarget::parse("9:filename_prefix:Demo").unwrap();
    let mut sink = FileDroppingSink::new(&out);
    let outcome = run_sweep(&set, &template, &save, &out, &mut sink).unwrap();
    assert_eq!(outcome.submitted, 2);
    assert!(out.join("31-steps-10--31-cfg-7_5_00001.png").is_file());
    assert!(out.join("31-steps-20--31-cfg-7_5_00001.png").is_file());
}

#[test]
fn save_target_slot_receives_the_folder_qualified_key() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("images").join("Demo");
    let set = steps_cfg_set(&[10], &[4.0]);
    let save = SaveTarget::parse("9:filename_prefix:Demo").unwrap();

    struct CapturingSink(Option<Value>);
    impl PromptSink for CapturingSink {
        fn submit(&mut self, _key: &SegmentKey, prompt: &Value) -> Result<(), SubmitError> {
            self.0 = Some(prompt.clone());
            Ok(())
        }
    }

    let mut sink = CapturingSink(None);
    run_sweep(&set, &template(), &save, &out, &mut sink).unwrap();
    let prompt = sink.0.expect("one submission");
    assert_eq!(
        prompt["9"]["inputs"]["filename_prefix"],
        json!("Demo/31-steps-10--31-cfg-4_0")
    );
    assert_eq!(prompt["31"]["inputs"]["steps"], json!(10), "link replaced by literal");
    assert_eq!(prompt["31"]["inputs"]["cfg"], json!(4.0));

    // And a slot write against a foreign document still behaves.
    let mut other = json!({"7": {"inputs": {}}});
    set_input_literal(&mut other, "7", "seed", json!(42)).unwrap();
    assert_eq!(other["7"]["inputs"]["seed"], json!(42));
}
