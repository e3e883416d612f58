use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;

const CSV: &str = "\
address,amount
0x00000000000000000000000000000000000000cc,300
0x00000000000000000000000000000000000000aa,100
0x00000000000000000000000000000000000000bb,200
0x00000000000000000000000000000000000000dd,400
0x00000000000000000000000000000000000000ee,500
";

const FIRST: &str = "0x00000000000000000000000000000000000000aa";

/// Scratch directory unique to this process and test.
fn workdir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join(format!("airdrop-merkle-cli-{}-{}", std::process::id(), name));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_airdrop-merkle"))
        .args(args)
        .env_remove("AIRDROP_HASH")
        .env_remove("AIRDROP_PARALLEL")
        .env_remove("AIRDROP_MIN_PARALLEL_PAIRS")
        .env("RUST_LOG", "warn")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

struct Built {
    dir: PathBuf,
    manifest: PathBuf,
    claims: PathBuf,
    root: String,
}

fn build(name: &str, extra: &[&str]) -> Built {
    let dir = workdir(name);
    let input = dir.join("recipients.csv");
    let manifest = dir.join("epoch.manifest");
    let claims = dir.join("claims.json");
    let snapshot = dir.join("levels.tree");
    fs::write(&input, CSV).unwrap();

    let mut args = vec![
        "build",
        "--input",
        path_arg(&input),
        "--manifest",
        path_arg(&manifest),
        "--claims",
        path_arg(&claims),
        "--snapshot",
        path_arg(&snapshot),
    ];
    args.extend_from_slice(extra);
    let output = run(&args);
    assert!(output.status.success(), "build failed: {}", stderr(&output));

    let root = stdout(&output);
    Built { dir, manifest, claims, root }
}

fn claims_json(built: &Built) -> Value {
    serde_json::from_str(&fs::read_to_string(&built.claims).unwrap()).unwrap()
}

/// `--leaf` and `--proof` arguments for one claim.
fn verify_args(claim: &Value) -> (String, String) {
    let leaf = claim["leaf"].as_str().unwrap().to_string();
    let siblings: Vec<&str> = claim["proof"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["sibling"].as_str().unwrap())
        .collect();
    (leaf, siblings.join(","))
}

#[test]
fn build_writes_every_output_and_prints_root() {
    let built = build("build", &[]);

    assert!(built.root.starts_with("0x"));
    assert_eq!(built.root.len(), 66);
    assert!(built.manifest.exists());
    assert!(built.dir.join("levels.tree").exists());

    let claims = claims_json(&built);
    assert_eq!(claims["root"], built.root.as_str());
    assert_eq!(claims["hash"], "sha256");
    assert_eq!(claims["recipient_count"], 5);
    assert_eq!(claims["claims"][0]["address"], FIRST);

    // Temp files are renamed into place, never left behind.
    for entry in fs::read_dir(&built.dir).unwrap() {
        let name = entry.unwrap().file_name().to_string_lossy().to_string();
        assert!(!name.ends_with(".tmp"), "leftover temp file {}", name);
    }

    let _ = fs::remove_dir_all(&built.dir);
}

#[test]
fn build_is_deterministic_across_runs() {
    let first = build("determinism-a", &[]);
    let second = build("determinism-b", &["--parallel"]);
    assert_eq!(first.root, second.root);
    assert_eq!(fs::read(&first.manifest).unwrap(), fs::read(&second.manifest).unwrap());

    let keccak = build("determinism-keccak", &["--hash", "keccak256"]);
    assert_ne!(first.root, keccak.root);

    for built in [first, second, keccak] {
        let _ = fs::remove_dir_all(&built.dir);
    }
}

#[test]
fn failed_build_leaves_outputs_untouched() {
    let dir = workdir("failed-build");
    let input = dir.join("recipients.csv");
    let manifest = dir.join("epoch.manifest");
    let claims = dir.join("claims.json");
    fs::write(&manifest, b"previous epoch").unwrap();

    let duplicate = format!("{},1\n{},2\n", FIRST, FIRST);
    fs::write(&input, duplicate).unwrap();

    let output = run(&[
        "build",
        "--input",
        path_arg(&input),
        "--manifest",
        path_arg(&manifest),
        "--claims",
        path_arg(&claims),
    ]);
    assert!(!output.status.success());
    assert!(stdout(&output).is_empty());
    assert_eq!(fs::read(&manifest).unwrap(), b"previous epoch");
    assert!(!claims.exists());
    assert!(!dir.join(".epoch.manifest.tmp").exists());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn build_with_missing_input_writes_nothing() {
    let dir = workdir("missing-input");
    let manifest = dir.join("epoch.manifest");

    let output = run(&[
        "build",
        "--input",
        path_arg(&dir.join("absent.csv")),
        "--manifest",
        path_arg(&manifest),
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("failed to read recipients"));
    assert!(!manifest.exists());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn prove_prints_claim_json() {
    let built = build("prove", &[]);

    let output = run(&["prove", "--manifest", path_arg(&built.manifest), "--address", FIRST]);
    assert!(output.status.success(), "prove failed: {}", stderr(&output));

    let claim: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(claim["address"], FIRST);
    assert_eq!(claim["amount"], "100");
    assert_eq!(claim["index"], 0);
    assert_eq!(claim, claims_json(&built)["claims"][0]);

    let unknown = "0x00000000000000000000000000000000000000ff";
    let output = run(&["prove", "--manifest", path_arg(&built.manifest), "--address", unknown]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("no claim"));

    let _ = fs::remove_dir_all(&built.dir);
}

#[test]
fn verify_reports_valid_and_invalid_with_success_status() {
    let built = build("verify", &[]);
    let claims = claims_json(&built);

    for claim in claims["claims"].as_array().unwrap() {
        let (leaf, proof) = verify_args(claim);
        let mut args = vec!["verify", "--root", built.root.as_str(), "--leaf", leaf.as_str()];
        if !proof.is_empty() {
            args.extend_from_slice(&["--proof", proof.as_str()]);
        }
        let output = run(&args);
        assert!(output.status.success());
        assert_eq!(stdout(&output), "valid");
    }

    // Another recipient's leaf under the first recipient's path.
    let (_, proof) = verify_args(&claims["claims"][0]);
    let (other_leaf, _) = verify_args(&claims["claims"][1]);
    let output = run(&["verify", "--root", &built.root, "--leaf", &other_leaf, "--proof", &proof]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "invalid");

    let (leaf, proof) = verify_args(&claims["claims"][0]);
    let output = run(&[
        "verify",
        "--root",
        &built.root,
        "--leaf",
        &leaf,
        "--proof",
        &proof,
        "--hash",
        "keccak256",
    ]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "invalid");

    let _ = fs::remove_dir_all(&built.dir);
}

#[test]
fn verify_rejects_malformed_digests() {
    let root = format!("0x{}", "ab".repeat(32));
    let leaf = format!("0x{}", "cd".repeat(32));

    let output = run(&["verify", "--root", &root, "--leaf", "zz"]);
    assert!(!output.status.success());
    assert!(stdout(&output).is_empty());

    let short = format!("{},0x1234", leaf);
    let output = run(&["verify", "--root", &root, "--leaf", &leaf, "--proof", &short]);
    assert!(!output.status.success());
    assert!(stdout(&output).is_empty());
}

#[test]
fn inspect_summarizes_good_manifest() {
    let built = build("inspect", &[]);

    let output = run(&["inspect", "--manifest", path_arg(&built.manifest)]);
    assert!(output.status.success(), "inspect failed: {}", stderr(&output));
    let summary = stdout(&output);
    assert!(summary.contains(&built.root));
    assert!(summary.contains("recipients: 5"));
    assert!(summary.contains("all proofs verify"));

    let _ = fs::remove_dir_all(&built.dir);
}

#[test]
fn inspect_fails_on_corrupt_manifest() {
    let built = build("inspect-corrupt", &[]);
    let mut bytes = fs::read(&built.manifest).unwrap();

    bytes.push(0);
    fs::write(&built.manifest, &bytes).unwrap();
    let output = run(&["inspect", "--manifest", path_arg(&built.manifest)]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("1 trailing bytes after checksum"));

    bytes.pop();
    // Inside the stored root.
    bytes[10] ^= 0x01;
    fs::write(&built.manifest, &bytes).unwrap();
    let output = run(&["inspect", "--manifest", path_arg(&built.manifest)]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("checksum mismatch"));

    let _ = fs::remove_dir_all(&built.dir);
}

#[test]
fn inspect_with_wrong_hash_family_fails() {
    let built = build("inspect-family", &["--hash", "keccak256"]);

    let output = run(&["inspect", "--manifest", path_arg(&built.manifest)]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("does not verify"));

    let output = run(&["inspect", "--manifest", path_arg(&built.manifest), "--hash", "keccak256"]);
    assert!(output.status.success(), "inspect failed: {}", stderr(&output));

    let _ = fs::remove_dir_all(&built.dir);
}
