use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

const COMPLEX: &str = r#"
graph.name = "social"
graph.type = "complex"
graph.relation = ["knows:[person]->[person]", "lives:[person]->[city]"]
"#;

const SIMPLE: &str = r#"
[graph]
name = "notes"
"#;

struct Env {
    dir: TempDir,
    config: PathBuf,
}

impl Env {
    fn new(config: &str) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, config).expect("write config");
        Self { dir, config: path }
    }

    fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("docgraph").expect("docgraph binary");
        cmd.env_remove("DOCGRAPH_CONFIG")
            .env_remove("DOCGRAPH_DATA_DIR")
            .arg("--config")
            .arg(&self.config)
            .arg("--data-dir")
            .arg(self.data_dir());
        cmd
    }

    fn json(&self, args: &[&str]) -> Value {
        let output = self.cmd().args(["--format", "json"]).args(args).output().expect("run");
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        serde_json::from_slice(&output.stdout).expect("json output")
    }
}

fn db_file(data_dir: &Path) -> PathBuf {
    data_dir.join("docgraph.redb")
}

#[test]
fn test_schema_needs_no_store() {
    let env = Env::new(COMPLEX);
    env.cmd()
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("Graph: social (complex"))
        .stdout(predicate::str::contains("social_knows: [social_person] -> [social_person]"));
    assert!(!env.data_dir().exists());
}

#[test]
fn test_schema_json() {
    let env = Env::new(COMPLEX);
    let schema = env.json(&["schema"]);
    assert_eq!(schema["graph"], "social");
    assert_eq!(schema["graph_type"], "complex");
    assert_eq!(schema["edge_collections"], serde_json::json!(["social_knows", "social_lives"]));
}

#[test]
fn test_open_creates_database() {
    let env = Env::new(COMPLEX);
    env.cmd()
        .arg("open")
        .assert()
        .success()
        .stdout(predicate::str::contains("Opened graph 'social'"))
        .stdout(predicate::str::contains("Layout version 1"));
    assert!(db_file(&env.data_dir()).exists());

    // Second open finds the graph as configured
    env.cmd().arg("open").assert().success();
}

#[test]
fn test_open_rejects_changed_relations() {
    let env = Env::new(COMPLEX);
    env.cmd().arg("open").assert().success();

    fs::write(
        &env.config,
        r#"
graph.name = "social"
graph.type = "complex"
graph.relation = ["knows:[person]->[city]", "lives:[person]->[city]"]
"#,
    )
    .unwrap();
    env.cmd()
        .arg("open")
        .assert()
        .failure()
        .stderr(predicate::str::contains("social_knows"));
}

#[test]
fn test_vertex_lifecycle() {
    let env = Env::new(COMPLEX);
    env.cmd()
        .args(["vertex", "add", "--label", "person", "--id", "marko", "-p", "name=marko", "-p", "age=29"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created vertex: social_person/marko"));

    let vertex = env.json(&["vertex", "get", "social_person/marko"]);
    assert_eq!(vertex["label"], "person");
    assert_eq!(vertex["properties"]["age"], serde_json::json!([29]));

    env.cmd()
        .args(["vertex", "add", "-l", "person", "-i", "marko"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    let all = env.json(&["vertex", "list"]);
    assert_eq!(all.as_array().map(Vec::len), Some(1));

    env.cmd()
        .args(["vertex", "rm", "social_person/marko"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted vertex"));
    env.cmd()
        .args(["vertex", "rm", "social_person/marko"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already absent"));
    env.cmd()
        .args(["vertex", "get", "social_person/marko"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Vertex not found"));
}

#[test]
fn test_unknown_label_rejected() {
    let env = Env::new(COMPLEX);
    env.cmd()
        .args(["vertex", "add", "--label", "planet"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("planet"));
}

#[test]
fn test_edges_and_neighbors() {
    let env = Env::new(COMPLEX);
    for (label, id) in [("person", "marko"), ("person", "josh"), ("city", "rome")] {
        env.cmd().args(["vertex", "add", "-l", label, "-i", id]).assert().success();
    }
    env.cmd()
        .args(["edge", "add", "--from", "social_person/marko", "--to", "social_person/josh"])
        .args(["--label", "knows", "-p", "weight=0.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created edge: social_knows/"));
    env.cmd()
        .args(["edge", "add", "--from", "social_person/marko", "--to", "social_city/rome", "-l", "lives"])
        .assert()
        .success();

    // Relation does not allow a city as the source of `knows`
    env.cmd()
        .args(["edge", "add", "--from", "social_city/rome", "--to", "social_person/josh", "-l", "knows"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("from vertex"));

    let out = env.json(&["neighbors", "social_person/marko", "--direction", "out"]);
    let mut ids: Vec<&str> = out
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v["id"].as_str())
        .collect();
    ids.sort();
    assert_eq!(ids, ["social_city/rome", "social_person/josh"]);

    let knows = env.json(&["neighbors", "social_person/marko", "--label", "knows"]);
    assert_eq!(knows.as_array().map(Vec::len), Some(1));
    assert_eq!(knows[0]["id"], "social_person/josh");

    let incoming = env.json(&["edges", "social_person/josh", "--direction", "in"]);
    assert_eq!(incoming.as_array().map(Vec::len), Some(1));
    assert_eq!(incoming[0]["from"], "social_person/marko");
    assert_eq!(incoming[0]["properties"]["weight"], 0.5);

    env.cmd()
        .args(["neighbors", "social_person/josh", "--direction", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No neighbors found"));

    // Removing a vertex takes its edges along
    env.cmd().args(["vertex", "rm", "social_person/marko"]).assert().success();
    let left = env.json(&["edge", "list"]);
    assert_eq!(left.as_array().map(Vec::len), Some(0));
}

#[test]
fn test_simple_graph_ids() {
    let env = Env::new(SIMPLE);
    env.cmd()
        .args(["vertex", "add", "-l", "person", "-i", "a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created vertex: a"));
    env.cmd().args(["vertex", "add", "-l", "song", "-i", "b"]).assert().success();
    env.cmd()
        .args(["edge", "add", "--from", "a", "--to", "b", "-l", "sings", "-i", "e1"])
        .assert()
        .success();

    let edge = env.json(&["edge", "get", "e1"]);
    assert_eq!(edge["label"], "sings");
    assert_eq!(edge["from"], "a");
    assert_eq!(edge["to"], "b");
}

#[test]
fn test_variables() {
    let env = Env::new(COMPLEX);
    env.cmd()
        .args(["var", "set", "owner", "ops"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set owner = ops"));
    env.cmd().args(["var", "set", "limit", "10"]).assert().success();

    env.cmd()
        .args(["var", "get", "owner"])
        .assert()
        .success()
        .stdout(predicate::str::contains("owner = ops"));

    let limit = env.json(&["var", "get", "limit"]);
    assert_eq!(limit["value"], 10);

    env.cmd()
        .args(["var", "get", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown variable"));
}

#[test]
fn test_missing_config() {
    let dir = TempDir::new().unwrap();
    Command::cargo_bin("docgraph")
        .unwrap()
        .env_remove("DOCGRAPH_DATA_DIR")
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("schema")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn test_invalid_config() {
    let env = Env::new("graph.type = \"complex\"\n");
    env.cmd()
        .arg("schema")
        .assert()
        .failure()
        .stderr(predicate::str::contains("graph.name is required"));
}
