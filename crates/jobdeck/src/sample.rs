//! Seeded sample data for the offline self-check.
//!
//! Every generator runs its own fixed-seed PCG stream, so the produced
//! documents are stable across runs while still looking like a live cluster.

use std::collections::BTreeMap;

use jobdeck_api::{PoolOverview, PoolWorker, PoolWorkerConfig, WorkerGroup, WorkerGroups, WorkerProfile};
use pagekit::TablePage;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde_json::{json, Value};

const QUEUE_NAMES: [&str; 5] = ["default", "mail", "crawl", "timed_retry", "raw_events"];

const TASK_PATHS: [&str; 6] = [
    "tasks.crawl.Fetch",
    "tasks.crawl.Parse",
    "tasks.mail.SendDigest",
    "tasks.io.SyncUsers",
    "tasks.index.Rebuild",
    "tasks.billing.Invoice",
];

const STATUSES: [&str; 7] = [
    "queued", "started", "success", "failed", "interrupt", "retry", "cancel",
];

const EXCEPTIONS: [&str; 3] = ["TimeoutError", "ConnectionError", "ValueError"];

fn seeded(tag: u64) -> Pcg64 {
    Pcg64::seed_from_u64(0x6a6f_6264_6563_6b00 | tag)
}

fn now() -> f64 {
    chrono::Utc::now().timestamp() as f64
}

fn object_id(rng: &mut Pcg64) -> String {
    (0..24)
        .map(|_| char::from_digit(rng.random_range(0..16), 16).unwrap_or('0'))
        .collect()
}

fn page(rows: Vec<Value>) -> TablePage {
    let total = rows.len() as u64;
    TablePage {
        rows,
        total,
        echo: 0,
    }
}

pub(crate) fn queues() -> TablePage {
    let mut rng = seeded(1);
    let rows = QUEUE_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let timed = i == 3;
            json!({
                "name": name,
                "jobs": rng.random_range(0..5000),
                "size": rng.random_range(0..5000),
                "is_sorted": timed,
                "is_timed": timed,
                "is_raw": i == 4,
                "is_set": false,
                "jobs_to_dequeue": if timed { rng.random_range(0..50) } else { 0 },
            })
        })
        .collect();
    page(rows)
}

fn worker_doc(rng: &mut Pcg64, index: usize) -> Value {
    let id = object_id(rng);
    let job_count = rng.random_range(1..5);
    let jobs: Vec<Value> = (0..job_count)
        .map(|_| {
            let with_io = rng.random_bool(0.6);
            let io = if with_io {
                json!({
                    "type": if rng.random_bool(0.5) { "mongodb.find" } else { "redis.blpop" },
                    "data": {"collection": "mrq_jobs"},
                })
            } else {
                Value::Null
            };
            json!({
                "id": object_id(rng),
                "path": TASK_PATHS[rng.random_range(0..TASK_PATHS.len())],
                "io": io,
                "datestarted": now() - f64::from(rng.random_range(5..600)),
            })
        })
        .collect();
    json!({
        "_id": id,
        "status": if index == 0 { "full" } else { "wait" },
        "config": {"queues": ["default", "mail"], "gevent": 10},
        "jobs": jobs,
        "done_jobs": rng.random_range(100..20_000),
        "process": {
            "mem": f64::from(rng.random_range(40..300)) * 1024.0 * 1024.0,
            "cpu": f64::from(rng.random_range(0..80)),
        },
        "datestarted": now() - f64::from(rng.random_range(600..90_000)),
    })
}

pub(crate) fn workers() -> TablePage {
    let mut rng = seeded(2);
    let rows = (0..4).map(|i| worker_doc(&mut rng, i)).collect();
    page(rows)
}

pub(crate) fn jobs() -> TablePage {
    let mut rng = seeded(3);
    let rows = (0..25)
        .map(|_| {
            json!({
                "_id": object_id(&mut rng),
                "queue": QUEUE_NAMES[rng.random_range(0..QUEUE_NAMES.len())],
                "path": TASK_PATHS[rng.random_range(0..TASK_PATHS.len())],
                "status": STATUSES[rng.random_range(0..STATUSES.len())],
                "worker": object_id(&mut rng),
                "dateupdated": now() - f64::from(rng.random_range(1..3600)),
                "params": {"user_id": rng.random_range(1..100_000)},
            })
        })
        .collect();
    page(rows)
}

pub(crate) fn scheduled() -> TablePage {
    let mut rng = seeded(4);
    let rows = TASK_PATHS
        .iter()
        .take(4)
        .enumerate()
        .map(|(i, path)| {
            let daily = i == 2;
            json!({
                "path": path,
                "params": {"batch": rng.random_range(1..50)},
                "interval": if daily { 0 } else { i64::from(rng.random_range(1..24)) * 3600 },
                "dailytime": if daily { "04:30:00" } else { "" },
                "datelastqueued": now() - f64::from(rng.random_range(60..86_400)),
            })
        })
        .collect();
    page(rows)
}

pub(crate) fn taskpaths() -> TablePage {
    let mut rng = seeded(5);
    let rows = TASK_PATHS
        .iter()
        .map(|path| json!({"_id": path, "jobs": rng.random_range(10..50_000)}))
        .collect();
    page(rows)
}

pub(crate) fn exceptions() -> TablePage {
    let mut rng = seeded(6);
    let rows = EXCEPTIONS
        .iter()
        .enumerate()
        .map(|(i, exc)| {
            json!({
                "_id": {"path": TASK_PATHS[i], "exceptiontype": exc},
                "jobs": rng.random_range(1..500),
            })
        })
        .collect();
    page(rows)
}

pub(crate) fn statuses() -> TablePage {
    let mut rng = seeded(7);
    let rows = STATUSES
        .iter()
        .map(|status| json!({"_id": status, "jobs": rng.random_range(0..100_000)}))
        .collect();
    page(rows)
}

pub(crate) fn agents() -> TablePage {
    let mut rng = seeded(8);
    let rows = (0..3)
        .map(|i| {
            json!({
                "_id": object_id(&mut rng),
                "worker_group": if i < 2 { "crawler" } else { "indexer" },
                "status": "started",
                "desired_workers": rng.random_range(1..12),
                "total_cpu": f64::from(rng.random_range(5..95)),
                "total_memory": f64::from(rng.random_range(512..8192)) * 1024.0 * 1024.0,
                "date_ping": now() - f64::from(rng.random_range(1..120)),
            })
        })
        .collect();
    page(rows)
}

pub(crate) fn pool() -> PoolOverview {
    let mut rng = seeded(9);
    let workers = (0..4)
        .map(|i| PoolWorker {
            id: object_id(&mut rng),
            status: if i == 0 { "full" } else { "wait" }.to_owned(),
            config: PoolWorkerConfig { gevent: 10 },
            jobs: vec![json!({}); rng.random_range(0..10)],
            done_jobs: rng.random_range(100..20_000),
        })
        .collect();
    PoolOverview { workers }
}

pub(crate) fn groups() -> WorkerGroups {
    let make_profile = |mem: u64, cpu: u64, min: u32, max: u32, cmd: &str| WorkerProfile {
        memory: mem,
        cpu,
        min_count: min,
        max_count: max,
        command: cmd.to_owned(),
    };
    let mut crawler_profiles = BTreeMap::new();
    crawler_profiles.insert(
        "fetch".to_owned(),
        make_profile(512, 1024, 1, 8, "mrq-worker crawl --greenlets 20"),
    );
    crawler_profiles.insert(
        "parse".to_owned(),
        make_profile(256, 512, 0, 4, "mrq-worker crawl_parse"),
    );
    let mut indexer_profiles = BTreeMap::new();
    indexer_profiles.insert(
        "index".to_owned(),
        make_profile(2048, 2048, 1, 2, "mrq-worker index --greenlets 4"),
    );

    let mut groups = BTreeMap::new();
    groups.insert(
        "crawler".to_owned(),
        WorkerGroup {
            profiles: crawler_profiles,
            process_termination_timeout: 300,
        },
    );
    groups.insert(
        "indexer".to_owned(),
        WorkerGroup {
            profiles: indexer_profiles,
            process_termination_timeout: 60,
        },
    );
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generators_are_deterministic() {
        assert_eq!(queues().rows, queues().rows);
        assert_eq!(jobs().rows, jobs().rows);
        assert_eq!(pool().pool_size(), pool().pool_size());
    }

    #[test]
    fn sample_pages_carry_rows() {
        assert_eq!(queues().rows.len(), 5);
        assert_eq!(jobs().rows.len(), 25);
        assert_eq!(statuses().rows.len(), 7);
        assert!(workers().rows.iter().all(|w| w["jobs"].is_array()));
        assert_eq!(groups().len(), 2);
    }

    #[test]
    fn timed_queue_carries_a_dequeue_count() {
        let rows = queues().rows;
        let timed = rows.iter().find(|r| r["name"] == "timed_retry").unwrap();
        assert_eq!(timed["is_timed"], true);
    }
}
