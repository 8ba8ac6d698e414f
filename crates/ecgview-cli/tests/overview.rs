use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::error::Error;

#[test]
fn overview_covers_recording() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let csv = dir.path().join("minute.csv");
    let mut cmd = cargo_bin_cmd!("ecgview");
    cmd.args([
        "sample",
        "--out",
        csv.to_str().unwrap(),
        "--duration-s",
        "60",
    ]);
    cmd.assert().success();

    let mut cmd = cargo_bin_cmd!("ecgview");
    cmd.args(["overview", "--input", csv.to_str().unwrap(), "--batch", "4"]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let state: Value = serde_json::from_slice(&output)?;

    assert_eq!(state["status"], "complete");
    assert_eq!(state["progress"].as_f64(), Some(1.0));
    assert_eq!(state["total_steps"], 15);
    let points = state["points"].as_array().expect("points");
    assert!(!points.is_empty() && points.len() <= 15);
    for point in points {
        let bpm = point["average_bpm"].as_f64().unwrap();
        assert!((65.0..=85.0).contains(&bpm), "{}", point);
        assert_eq!(point["center_time"].as_f64().unwrap() % 4.0, 0.0);
    }
    let min = state["range"]["min_bpm"].as_f64().expect("locked range");
    let max = state["range"]["max_bpm"].as_f64().expect("locked range");
    assert!(max - min >= 40.0);
    Ok(())
}
