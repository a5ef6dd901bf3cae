use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_mvacut"))
}

fn tmp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    std::env::temp_dir().join(format!("mvacut_cli_split_{}_{}_{}", std::process::id(), nanos, name))
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

/// 200 events: even rows are CC muon neutrinos, every 25th has no CVN score.
fn write_events_csv(path: &PathBuf) {
    let mut s = String::from("TrueNuPdg,IsCC,CVNScoreNuE,CVNScoreNuMu,CVNScoreNC,TrueNuE,BDT\n");
    for i in 0..200 {
        let pdg = match i % 4 {
            0 => 14,
            2 => -14,
            1 => 12,
            _ => 16,
        };
        let is_cc = if i % 2 == 0 || i % 3 != 0 { "true" } else { "false" };
        let nue = if i % 25 == 0 { -999.0 } else { 0.3 };
        let (numu, nc) = if i % 2 == 0 { (0.6, 0.1) } else { (0.2, 0.5) };
        let energy = (i % 10) as f64 + 0.5;
        let frac = ((i * 37) % 100) as f64 / 100.0;
        let bdt = if i % 2 == 0 { 0.2 + 0.6 * frac } else { -0.6 + 0.55 * frac };
        s.push_str(&format!("{pdg},{is_cc},{nue},{numu},{nc},{energy},{bdt}\n"));
    }
    std::fs::write(path, s).unwrap();
}

#[test]
fn split_numu_preset_partitions_events() {
    let csv = tmp_path("events.csv");
    let out = tmp_path("filtered");
    write_events_csv(&csv);

    let res = run(&[
        "split",
        "-i",
        csv.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "--preset",
        "numu",
        "--define-cvn-max",
    ]);
    assert!(res.status.success(), "split failed, stderr={}", String::from_utf8_lossy(&res.stderr));

    let summary: serde_json::Value = serde_json::from_slice(&res.stdout).unwrap();
    assert_eq!(summary["input_rows"], 200);
    assert_eq!(summary["excluded_rows"], 8);
    assert_eq!(summary["signal_rows"], 96);
    assert_eq!(summary["background_rows"], 96);
    assert!(out.join("Signal.parquet").is_file());
    assert!(out.join("Background.parquet").is_file());

    let export = tmp_path("signal.csv");
    let res = run(&[
        "convert",
        "-i",
        out.to_str().unwrap(),
        "--tree",
        "Signal",
        "-o",
        export.to_str().unwrap(),
        "--to-csv",
    ]);
    assert!(res.status.success(), "convert failed, stderr={}", String::from_utf8_lossy(&res.stderr));
    let text = std::fs::read_to_string(&export).unwrap();
    assert!(text.lines().next().unwrap().ends_with("CVNMax_NuMu"));
    assert_eq!(text.lines().count(), 97);

    std::fs::remove_file(&csv).ok();
    std::fs::remove_file(&export).ok();
    std::fs::remove_dir_all(&out).ok();
}

#[test]
fn split_with_custom_signal_and_keep() {
    let csv = tmp_path("events.csv");
    let out = tmp_path("custom");
    write_events_csv(&csv);

    let res = run(&[
        "split",
        "-i",
        csv.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "--signal",
        "TrueNuPdg == 12",
        "--keep",
        "BDT,TrueNuE",
    ]);
    assert!(res.status.success(), "split failed, stderr={}", String::from_utf8_lossy(&res.stderr));
    let summary: serde_json::Value = serde_json::from_slice(&res.stdout).unwrap();
    assert_eq!(summary["excluded_rows"], 0);
    assert_eq!(summary["signal_rows"], 50);

    std::fs::remove_file(&csv).ok();
    std::fs::remove_dir_all(&out).ok();
}

#[test]
fn split_rejects_bad_expression_and_missing_input() {
    let out = tmp_path("bad");
    let res = run(&[
        "split",
        "-i",
        "/definitely/not/here.csv",
        "-o",
        out.to_str().unwrap(),
        "--preset",
        "nue",
    ]);
    assert!(!res.status.success());
    assert!(String::from_utf8_lossy(&res.stderr).contains("not/here.csv"));

    let csv = tmp_path("events.csv");
    write_events_csv(&csv);
    let res = run(&[
        "split",
        "-i",
        csv.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "--signal",
        "TrueNuPdg ==",
    ]);
    assert!(!res.status.success());
    std::fs::remove_file(&csv).ok();
}

#[test]
fn version_prints_name() {
    let res = run(&["version"]);
    assert!(res.status.success());
    assert!(String::from_utf8_lossy(&res.stdout).starts_with("mvacut "));
}
