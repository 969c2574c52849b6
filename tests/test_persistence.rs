use slurm_env_gen::api::scenario_dto::ScenarioDto;
use slurm_env_gen::domain::scenario::Scenario;
use slurm_env_gen::domain::topology::node::Node;
use slurm_env_gen::domain::topology::switch_tree::print_topology;
use slurm_env_gen::domain::utils::id::{AccountName, UserName};
use slurm_env_gen::domain::utils::random::rng_from_seed;
use slurm_env_gen::domain::utils::statistics::StatParameter;
use slurm_env_gen::domain::workload::job_generator::JobGenerator;
use slurm_env_gen::domain::workload::user::User;
use slurm_env_gen::domain::workload::workload::WorkLoad;
use slurm_env_gen::error::{Error, ParseError};
use slurm_env_gen::loader::{parser, writer};

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Fresh per-test scratch directory below the system temp dir.
fn scratch_dir(test_name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("slurm_env_gen_{}_{}", test_name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn users() -> Vec<User> {
    vec![User::new("admin", 1000, "admin", 1000), User::new("user1", 1001, "group1", 2001), User::new("user2", 1002, "group2", 2002)]
}

#[test]
fn test_cluster_files_round_trip() {
    let dir = scratch_dir("cluster_files");
    let mut scenario = Scenario::new(ScenarioDto { seed: Some(11), cluster_size: 8, ..Default::default() }).unwrap();
    let topology = scenario.generate_topology();

    writer::write_node_config(dir.join("slurm.conf"), None, topology.nodes()).unwrap();
    writer::write_topology(dir.join("conf/topology.conf"), &topology).unwrap();

    let nodes = parser::read_node_config(dir.join("slurm.conf")).unwrap();
    assert_eq!(nodes, topology.nodes());

    let parsed = parser::read_topology(&nodes, dir.join("conf/topology.conf")).unwrap();
    let mut expected: Vec<String> = topology.nodes().iter().map(Node::name_range).collect();
    let mut actual: Vec<String> = parsed.nodes().iter().map(Node::name_range).collect();
    expected.sort();
    actual.sort();
    assert_eq!(expected, actual);
    assert_eq!(parsed.total_machines(), topology.total_machines());
    assert_eq!(print_topology(&parsed).lines().count(), print_topology(&topology).lines().count());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_gres_config_matches_gpu_nodes() {
    let dir = scratch_dir("gres_config");
    let mut scenario = Scenario::new(ScenarioDto { seed: Some(5), cluster_size: 12, ..Default::default() }).unwrap();
    let topology = scenario.generate_topology();

    writer::write_gres_config(dir.join("gres.conf"), topology.nodes()).unwrap();
    let text = fs::read_to_string(dir.join("gres.conf")).unwrap();

    let gpu_nodes: Vec<&Node> = topology.nodes().iter().filter(|node| node.gpus > 0).collect();
    assert_eq!(text.lines().count(), gpu_nodes.len());
    for (line, node) in text.lines().zip(gpu_nodes) {
        assert_eq!(line, format!("NodeName={} Name=gpu Count={}", node.name_range(), node.gpus));
    }

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_workload_from_persisted_cluster() {
    let dir = scratch_dir("persisted_cluster");
    let mut scenario = Scenario::new(ScenarioDto { seed: Some(3), ..Default::default() }).unwrap();
    let topology = scenario.generate_topology();
    let accounts = HashMap::from([(UserName::new("user1"), AccountName::new("account1"))]);

    writer::write_node_config(dir.join("slurm.conf"), None, topology.nodes()).unwrap();
    writer::write_topology(dir.join("topology.conf"), &topology).unwrap();
    writer::write_users(dir.join("users.sim"), &users()).unwrap();
    writer::write_accounts(dir.join("accounts.json"), &accounts).unwrap();

    let nodes = parser::read_node_config(dir.join("slurm.conf")).unwrap();
    let parsed = Arc::new(parser::read_topology(&nodes, dir.join("topology.conf")).unwrap());
    let read_users = parser::read_users(dir.join("users.sim")).unwrap();
    let read_accounts = parser::read_accounts(dir.join("accounts.json")).unwrap();
    assert_eq!(read_users, users());
    assert_eq!(read_accounts, accounts);

    let dto = ScenarioDto::default();
    let job_generator = JobGenerator::try_from((&dto.job_generator, parsed, rng_from_seed(Some(1)))).unwrap();
    let mut workload = WorkLoad::try_from((&dto.workload, read_users, read_accounts, job_generator, rng_from_seed(Some(2)))).unwrap();
    let entries = workload.generate_workload(20, true);

    writer::write_events(dir.join("out/workload.events"), &entries).unwrap();
    writer::write_workload_statistics(dir.join("out/stats.csv"), &entries).unwrap();

    let events = fs::read_to_string(dir.join("out/workload.events")).unwrap();
    assert_eq!(events.lines().count(), 20);
    assert!(events.lines().all(|line| line.starts_with("-dt ") && line.contains(" -e submit_batch_job | -J jobid_")));
    assert!(events.lines().all(|line| line.ends_with(" pseudo.job")));

    let stats = fs::read_to_string(dir.join("out/stats.csv")).unwrap();
    let mut lines = stats.lines();
    assert_eq!(lines.next().unwrap(), StatParameter::headers().join(";"));
    assert_eq!(lines.count(), 20);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_reading_broken_files() {
    let dir = scratch_dir("broken_files");

    let missing = parser::read_users(dir.join("does_not_exist.sim"));
    assert!(matches!(missing, Err(Error::IoError(_))));

    fs::write(dir.join("users.sim"), "user1:1001:group1:2001\nuser2:1002\n").unwrap();
    let bad_user = parser::read_users(dir.join("users.sim"));
    assert!(matches!(bad_user, Err(Error::Parse(ParseError::InvalidUserRecord { line: 2, .. }))));

    fs::write(dir.join("topology.conf"), "SwitchName=IBA Nodes=a[1-4]\n").unwrap();
    let no_root = parser::read_topology(&[], dir.join("topology.conf"));
    assert!(matches!(no_root, Err(Error::Parse(_))));

    fs::write(dir.join("scenario.json"), "{ \"clusterSize\": \"six\" }").unwrap();
    let bad_json = parser::parse_json_file::<ScenarioDto>(dir.join("scenario.json"));
    assert!(matches!(bad_json, Err(Error::DeserializationError(_))));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_load_scenario_configuration_file() {
    let dir = scratch_dir("scenario_file");
    let path = dir.join("scenario.json");
    fs::write(&path, r#"{ "seed": 8, "workload": { "jobCount": 5 } }"#).unwrap();

    let dto = slurm_env_gen::load_scenario_dto(Some(path.as_path())).unwrap();
    assert_eq!(dto.seed, Some(8));
    assert_eq!(dto.workload.job_count, 5);
    assert_eq!(dto.cluster_size, 6);

    let defaults = slurm_env_gen::load_scenario_dto(None).unwrap();
    assert_eq!(defaults.seed, None);
    assert_eq!(defaults.workload.job_count, 50);

    fs::remove_dir_all(&dir).unwrap();
}
