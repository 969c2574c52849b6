/// Unit tests for job drawing, the submission stream and the user list format.
#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use tracing_test::traced_test;

    use crate::domain::topology::{
        feature::{BIG_MEM_FEATURE, FeatureTag, MANY_CORES_FEATURE},
        node::{Node, NodeCount},
        topology::{Topology, TreeNode},
    };
    use crate::domain::utils::id::{AccountName, JobId, UserName};
    use crate::domain::utils::random::rng_from_seed;
    use crate::domain::utils::statistics::{StatParameter, StatValue, StatisticEvent};
    use crate::domain::workload::{
        job::{Job, JobKind, JobRequest, RequestedTime, TaskShape, WALLTIME_FROM_LIMIT},
        job_generator::{JobGenerator, JobGeneratorSettings, MAX_WALLTIME_SHRINK, ShapeConstraint},
        user::{User, parse_users, print_users},
        workload::{WorkLoad, WorkLoadSettings, format_events},
    };
    use crate::error::{ConfigError, ParseError};

    // --- HELPERS ---

    /// One group per resource class: GPU-equipped default nodes, big memory nodes and many-core nodes.
    fn mixed_topology() -> Arc<Topology> {
        let a = Node::new("a", NodeCount::from_scalar(4), 16, 2, 48000).with_gpus(2).with_features(["CPU-A"]);
        let b = Node::new("b", NodeCount::from_scalar(3), 32, 2, 256000).with_features(["CPU-B", BIG_MEM_FEATURE]);
        let c = Node::new("c", NodeCount::from_scalar(3), 128, 4, 64000).with_gpus(4).with_features(["CPU-C", MANY_CORES_FEATURE]);

        Arc::new(Topology::new(vec![
            TreeNode::Group(vec![TreeNode::Leaf(a)]),
            TreeNode::Group(vec![TreeNode::Leaf(b)]),
            TreeNode::Group(vec![TreeNode::Leaf(c)]),
        ]))
    }

    fn flat_topology(machines: u32) -> Arc<Topology> {
        let node = Node::new("a", NodeCount::from_scalar(machines), 8, 1, 16000).with_features(["CPU-A"]);
        Arc::new(Topology::new(vec![TreeNode::Group(vec![TreeNode::Leaf(node)])]))
    }

    fn job_generator(topology: Arc<Topology>, seed: u64) -> JobGenerator {
        JobGenerator::new(topology, JobGeneratorSettings::default(), rng_from_seed(Some(seed))).unwrap()
    }

    fn users() -> Vec<User> {
        vec![User::new("admin", 0, "admin", 0), User::new("alice", 1001, "users", 100), User::new("bob", 1002, "users", 100)]
    }

    fn accounts() -> HashMap<UserName, AccountName> {
        HashMap::from([(UserName::new("alice"), AccountName::new("physics"))])
    }

    fn workload(topology: Arc<Topology>, settings: WorkLoadSettings, seed: u64) -> WorkLoad {
        WorkLoad::new(users(), accounts(), job_generator(topology, seed), settings, rng_from_seed(Some(seed + 1))).unwrap()
    }

    fn required_features(job: &Job) -> Vec<&'static str> {
        job.request.constraint.and_then(|tag| tag.constraint()).into_iter().collect()
    }

    /// Checks every per-job guarantee against the topology the job was drawn for.
    fn assert_job_fits(topology: &Topology, job: &Job) {
        let request = &job.request;
        let shape = request.shape;
        let class = request.constraint.expect("generated jobs always carry a class");

        assert!(shape.nodes >= 1);
        assert!(shape.matching_nodes > shape.nodes, "{:?}", shape);
        assert!(shape.tasks_per_node >= 1);
        assert!(shape.tasks_per_node <= topology.aggregate(class).max_cores_per_machine);

        let recount = topology.count_matching_nodes(shape.tasks_per_node, request.memory_mb.unwrap_or(0), request.gpus.unwrap_or(0), &required_features(job));
        assert_eq!(recount, shape.matching_nodes);

        if let Some(memory_mb) = request.memory_mb {
            assert!(memory_mb >= 1000);
            assert_eq!(memory_mb % 1000, 0);
        }
        if let Some(gpus) = request.gpus {
            assert!(gpus >= 1);
        }

        let limit = request.time.as_seconds();
        assert!(limit > 0);
        assert!(request.time.hours < 24);
        assert!(request.time.minutes < 60);
        assert!(
            job.simulated_walltime == WALLTIME_FROM_LIMIT || (limit - MAX_WALLTIME_SHRINK..limit).contains(&job.simulated_walltime),
            "walltime {} for limit {}",
            job.simulated_walltime,
            limit
        );
    }

    // --- JOB ---

    #[test]
    fn test_flags_follow_fixed_order() {
        let request = JobRequest {
            time: RequestedTime { hours: 2, minutes: 30 },
            shape: TaskShape { tasks_per_node: 4, nodes: 3, matching_nodes: 5 },
            account: Some(AccountName::new("physics")),
            constraint: Some(FeatureTag::BigMem),
            memory_mb: Some(8000),
            gpus: Some(2),
        };

        assert_eq!(
            request.to_flags(),
            vec![
                "-t 02:30:00",
                "-n 12",
                "--ntasks-per-node=4",
                "-A physics",
                "-p normal",
                "-q normal",
                "--constraint=BigMem",
                "--mem=8000",
                "--gres=gpu:2",
            ]
        );

        let job = Job::new(JobId::new("jobid_1001"), JobKind::Generic, -1, UserName::new("alice"), request);
        assert_eq!(
            job.to_string(),
            "-J jobid_1001 -sim-walltime -1 --uid=alice -t 02:30:00 -n 12 --ntasks-per-node=4 -A physics -p normal -q normal \
             --constraint=BigMem --mem=8000 --gres=gpu:2 pseudo.job"
        );
    }

    #[test]
    fn test_default_class_has_no_constraint_flag() {
        let request = JobRequest {
            time: RequestedTime { hours: 0, minutes: 5 },
            shape: TaskShape { tasks_per_node: 1, nodes: 1, matching_nodes: 2 },
            account: None,
            constraint: Some(FeatureTag::Default),
            memory_mb: None,
            gpus: None,
        };

        assert_eq!(request.to_flags(), vec!["-t 00:05:00", "-n 1", "--ntasks-per-node=1", "-p normal", "-q normal"]);
    }

    // --- JOB GENERATOR ---

    #[test]
    fn test_generated_jobs_fit_topology() {
        let topology = mixed_topology();
        let mut generator = job_generator(topology.clone(), 11);

        for kind in [JobKind::Classic, JobKind::Gpu, JobKind::Generic] {
            let mut produced = 0;
            for i in 0..300 {
                let id = JobId::new(format!("jobid_{}", i));
                if let Some(job) = generator.generate(kind, id, UserName::new("alice"), None) {
                    assert_eq!(job.kind, kind);
                    assert_job_fits(&topology, &job);
                    produced += 1;
                }
            }
            assert!(produced > 0, "no feasible {} job in 300 draws", kind);
        }
    }

    #[test]
    fn test_classic_jobs_never_fail_on_viable_classes() {
        let topology = flat_topology(3);
        let mut generator = job_generator(topology.clone(), 5);

        for i in 0..100 {
            let job = generator.generate_classic_job(JobId::new(format!("jobid_{}", i)), UserName::new("bob"), None);
            let job = job.expect("every class offers three machines with enough cores");
            assert!(job.request.memory_mb.is_none());
            assert!(job.request.gpus.is_none());
            assert!(job.request.shape.nodes < 3);
        }
    }

    #[test]
    fn test_single_machine_topology_is_rejected() {
        let result = JobGenerator::new(flat_topology(1), JobGeneratorSettings::default(), rng_from_seed(Some(1)));
        assert!(matches!(result, Err(ConfigError::InfeasibleTopology(_))));
    }

    #[test]
    fn test_invalid_job_probabilities() {
        let settings = JobGeneratorSettings { long_job_probability: 1.5, ..Default::default() };
        let result = JobGenerator::new(flat_topology(2), settings, rng_from_seed(Some(1)));
        assert!(matches!(result, Err(ConfigError::InvalidProbabilities(_))));
    }

    #[test]
    fn test_requested_time_bounds() {
        let mut generator = job_generator(flat_topology(2), 3);

        for _ in 0..200 {
            let short = generator.generate_requested_time(false);
            assert_eq!(short.hours, 0);
            assert!((1..60).contains(&short.minutes));

            let long = generator.generate_requested_time(true);
            assert!(long.hours < 24);
            if long.hours > 0 {
                assert!(long.minutes == 0 || long.minutes == 30);
            } else {
                assert!((1..60).contains(&long.minutes));
            }
        }
    }

    #[test]
    fn test_long_jobs_without_hours_budget() {
        let settings = JobGeneratorSettings { max_long_job_hours: 1, ..Default::default() };
        let mut generator = JobGenerator::new(flat_topology(2), settings, rng_from_seed(Some(9))).unwrap();

        for _ in 0..50 {
            assert_eq!(generator.generate_requested_time(true).hours, 0);
        }
    }

    #[test]
    fn test_simulated_walltime_never_exceeds_limit() {
        let mut generator = job_generator(flat_topology(2), 21);
        let time = RequestedTime { hours: 0, minutes: 1 };

        for _ in 0..200 {
            let walltime = generator.generate_simulated_walltime(&time);
            assert!(walltime == WALLTIME_FROM_LIMIT || (0..60).contains(&walltime), "{}", walltime);
        }
    }

    #[test]
    fn test_generate_mem_respects_class_maximum() {
        let mut generator = job_generator(mixed_topology(), 8);

        for _ in 0..100 {
            let memory_mb = generator.generate_mem(FeatureTag::BigMem).unwrap();
            assert!((1000..204800).contains(&memory_mb));
            assert_eq!(memory_mb % 1000, 0);
        }

        // 4/5 of 1000 MB is below the minimum request.
        let tiny = Node::new("t", NodeCount::from_scalar(2), 4, 1, 1000);
        let mut generator = job_generator(Arc::new(Topology::new(vec![TreeNode::Leaf(tiny)])), 8);
        assert_eq!(generator.generate_mem(FeatureTag::Default), None);
    }

    #[test]
    fn test_generate_gres_borrows_cluster_maximum() {
        let mut generator = job_generator(mixed_topology(), 4);

        for _ in 0..100 {
            // BigMem nodes carry no GPUs, the cluster maximum is 4.
            assert!((1..=4).contains(&generator.generate_gres(FeatureTag::BigMem)));
            assert!((1..=2).contains(&generator.generate_gres(FeatureTag::Default)));
        }

        let mut generator = job_generator(flat_topology(2), 4);
        assert_eq!(generator.generate_gres(FeatureTag::Default), 0);
    }

    #[test]
    fn test_task_shape_needs_two_matching_machines() {
        let mut generator = job_generator(mixed_topology(), 2);

        let constraint = ShapeConstraint { class: Some(FeatureTag::Default), memory_mb: Some(1_000_000), gpus: None };
        assert_eq!(generator.generate_task_shape(16, &constraint), None);
        assert_eq!(generator.generate_task_shape(0, &Default::default()), None);
    }

    #[test]
    fn test_gpu_jobs_only_count_gpu_machines() {
        let a = Node::new("a", NodeCount::from_scalar(4), 16, 2, 48000).with_gpus(2).with_features(["CPU-A"]);
        let d = Node::new("d", NodeCount::from_scalar(6), 16, 2, 48000).with_features(["CPU-D"]);
        let topology = Arc::new(Topology::new(vec![TreeNode::Group(vec![TreeNode::Leaf(a)]), TreeNode::Group(vec![TreeNode::Leaf(d)])]));
        let mut generator = job_generator(topology.clone(), 12);

        for n in 0..200 {
            let job = generator.generate_gpu_job(JobId::new(format!("jobid_{}", n)), UserName::new("alice"), None).unwrap();
            assert!((1..=2).contains(&job.request.gpus.unwrap()));
            assert_eq!(job.request.shape.matching_nodes, 4);
            assert!(job.request.shape.nodes < 4);
            assert_job_fits(&topology, &job);
        }
    }

    #[test]
    fn test_gpu_job_needs_two_gpu_machines() {
        let a = Node::new("a", NodeCount::from_scalar(1), 16, 2, 48000).with_gpus(2).with_features(["CPU-A"]);
        let d = Node::new("d", NodeCount::from_scalar(6), 16, 2, 48000).with_features(["CPU-D"]);
        let topology = Arc::new(Topology::new(vec![TreeNode::Group(vec![TreeNode::Leaf(a)]), TreeNode::Group(vec![TreeNode::Leaf(d)])]));
        let mut generator = job_generator(topology, 13);

        for n in 0..50 {
            assert_eq!(generator.generate_gpu_job(JobId::new(format!("jobid_{}", n)), UserName::new("bob"), None), None);
        }
    }

    // --- WORKLOAD ---

    #[test]
    fn test_two_machine_topology_generates_workload() {
        let mut workload = workload(flat_topology(2), WorkLoadSettings::default(), 17);
        let entries = workload.generate_workload(10, true);

        assert_eq!(entries.len(), 10);
        assert_eq!(entries[0].arrival, 0);
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry.job.id.as_str(), format!("jobid_{}", 1001 + i));
            assert_ne!(entry.job.user.as_str(), "admin");
            assert_job_fits(&flat_topology(2), &entry.job);
        }
        for pair in entries.windows(2) {
            let gap = pair[1].arrival - pair[0].arrival;
            assert!((1800..6000).contains(&gap), "inter-arrival {}", gap);
        }
    }

    #[test]
    fn test_reset_restarts_clock_and_ids() {
        let mut workload = workload(mixed_topology(), WorkLoadSettings::default(), 3);
        workload.generate_workload(5, true);
        assert!(workload.timestamp() > 0);
        assert_eq!(workload.job_counter(), 6);

        let continued = workload.generate_workload(2, false);
        assert_eq!(continued[0].job.id.as_str(), "jobid_1006");

        let restarted = workload.generate_workload(2, true);
        assert_eq!(restarted[0].arrival, 0);
        assert_eq!(restarted[0].job.id.as_str(), "jobid_1001");
    }

    #[test]
    fn test_same_seed_same_workload() {
        let mut left = workload(mixed_topology(), WorkLoadSettings::default(), 99);
        let mut right = workload(mixed_topology(), WorkLoadSettings::default(), 99);

        assert_eq!(format_events(&left.generate_workload(25, true)), format_events(&right.generate_workload(25, true)));
    }

    #[test]
    fn test_missing_account_omits_flag() {
        let mut workload = workload(mixed_topology(), WorkLoadSettings::default(), 12);

        for entry in workload.generate_workload(40, true) {
            let has_account = entry.job.flags.iter().any(|flag| flag.starts_with("-A "));
            match entry.job.user.as_str() {
                "alice" => assert!(entry.job.flags.contains(&"-A physics".to_string())),
                _ => assert!(!has_account),
            }
        }
    }

    #[test]
    fn test_admin_only_user_list_is_rejected() {
        let admins = vec![User::new("admin", 0, "admin", 0)];
        let result = WorkLoad::new(admins, HashMap::new(), job_generator(flat_topology(2), 1), WorkLoadSettings::default(), rng_from_seed(Some(1)));
        assert!(matches!(result, Err(ConfigError::EmptyUserList)));

        let result = WorkLoad::new(Vec::new(), HashMap::new(), job_generator(flat_topology(2), 1), WorkLoadSettings::default(), rng_from_seed(Some(1)));
        assert!(matches!(result, Err(ConfigError::EmptyUserList)));
    }

    #[test]
    fn test_invalid_workload_settings() {
        let settings = WorkLoadSettings { classic_probability: 0.9, gpu_probability: 0.5, ..Default::default() };
        let result = WorkLoad::new(users(), accounts(), job_generator(flat_topology(2), 1), settings, rng_from_seed(Some(1)));
        assert_eq!(result.err(), Some(ConfigError::InvalidProbabilities(vec![0.9, 0.5])));

        let settings = WorkLoadSettings { min_inter_arrival: 10, max_inter_arrival: 5, ..Default::default() };
        let result = WorkLoad::new(users(), accounts(), job_generator(flat_topology(2), 1), settings, rng_from_seed(Some(1)));
        assert!(matches!(result, Err(ConfigError::InvalidRange { .. })));
    }

    #[test]
    fn test_kind_thresholds() {
        let settings = WorkLoadSettings::default();
        assert_eq!(settings.kind_for(0.0), JobKind::Classic);
        assert_eq!(settings.kind_for(0.69), JobKind::Classic);
        assert_eq!(settings.kind_for(0.7), JobKind::Gpu);
        assert_eq!(settings.kind_for(0.89), JobKind::Gpu);
        assert_eq!(settings.kind_for(0.9), JobKind::Generic);
    }

    #[test]
    fn test_infeasible_gpu_jobs_fall_back_to_classic() {
        // Only the single big memory machine has GPUs, so no GPU job can span two machines.
        let a = Node::new("a", NodeCount::from_scalar(2), 16, 2, 48000).with_features(["CPU-A"]);
        let b = Node::new("b", NodeCount::from_scalar(1), 32, 2, 256000).with_gpus(4).with_features(["CPU-B", BIG_MEM_FEATURE]);
        let topology = Arc::new(Topology::new(vec![TreeNode::Group(vec![TreeNode::Leaf(a), TreeNode::Leaf(b)])]));

        let settings = WorkLoadSettings { classic_probability: 0.0, gpu_probability: 1.0, retry: 3, ..Default::default() };
        let mut workload = workload(topology.clone(), settings, 6);

        for entry in workload.generate_workload(10, true) {
            assert!(entry.fallback);
            assert!(entry.attempts > 3);
            assert_eq!(entry.job.kind, JobKind::Classic);
            assert_job_fits(&topology, &entry.job);
        }
    }

    #[test]
    fn test_entry_line_and_statistics() {
        let mut workload = workload(flat_topology(2), WorkLoadSettings::default(), 30);
        let entries = workload.generate_workload(2, true);

        let line = entries[1].to_string();
        assert!(line.starts_with(&format!("-dt {} -e submit_batch_job | -J jobid_1002 -sim-walltime ", entries[1].arrival)));
        assert!(line.ends_with(" pseudo.job"));
        assert_eq!(format_events(&entries).lines().count(), 2);

        let event = StatisticEvent::from(&entries[0]);
        assert_eq!(event.get(StatParameter::Time), Some(&StatValue::Integer(0)));
        assert_eq!(event.get(StatParameter::JobId), Some(&StatValue::Text("jobid_1001".to_string())));
        assert_eq!(event.get(StatParameter::Constraint), None);
    }

    #[traced_test]
    #[test]
    fn test_analytics_event_per_job() {
        let mut workload = workload(mixed_topology(), WorkLoadSettings::default(), 44);
        workload.generate_workload(3, true);

        assert!(logs_contain("jobid_1001"));
        assert!(logs_contain("jobid_1003"));
        assert!(!logs_contain("jobid_1004"));
    }

    // --- USERS ---

    #[test]
    fn test_users_round_trip() {
        let text = print_users(&users());
        assert_eq!(text, "admin:0:admin:0\nalice:1001:users:100\nbob:1002:users:100\n");
        assert_eq!(parse_users(&text).unwrap(), users());
    }

    #[test]
    fn test_bad_user_record_reports_line() {
        let result = parse_users("alice:1001:users:100\n\nbob:x:users:100\n");
        assert_eq!(result, Err(ParseError::InvalidUserRecord { line: 3, content: "bob:x:users:100".to_string() }));
    }
}
