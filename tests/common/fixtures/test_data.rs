//! Common test data: resource records, pages, cycles, and configuration

use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;

use offhours::catalog::{OpTag, Service, Tag};
use offhours::clock::CycleInstant;
use offhours::config::Config;
use offhours::queue::OpRequest;

pub mod ids {
    pub const WEB_INSTANCE: &str = "i-abc123";
    pub const BATCH_INSTANCE: &str = "i-def456";
    pub const DATA_VOLUME: &str = "vol-0a1b2c";
    pub const ORDERS_DB: &str = "orders-primary";
    pub const REPORTING_CLUSTER: &str = "reporting";
    pub const WEB_STACK: &str = "web-tier";
}

/// A cycle at a fixed, known instant
pub fn cycle_at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> CycleInstant {
    CycleInstant::floor(Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap())
}

/// A cycle whose expiration cutoff is comfortably in the future
pub fn fresh_cycle() -> CycleInstant {
    CycleInstant::floor(Utc::now() + Duration::minutes(10))
}

/// A cycle well past its expiration cutoff
pub fn stale_cycle() -> CycleInstant {
    CycleInstant::floor(Utc::now() - Duration::minutes(30))
}

pub fn tags_json(tags: &[(&str, &str)]) -> Value {
    Value::Array(
        tags.iter()
            .map(|(k, v)| json!({"Key": k, "Value": v}))
            .collect(),
    )
}

pub fn tag_list(tags: &[(&str, &str)]) -> Vec<Tag> {
    tags.iter().map(|(k, v)| Tag::new(*k, *v)).collect()
}

pub fn instance(id: &str, tags: &[(&str, &str)]) -> Value {
    json!({"InstanceId": id, "State": {"Name": "running"}, "Tags": tags_json(tags)})
}

/// Instances are listed grouped under reservations
pub fn instances_page(instances: &[Value]) -> Value {
    json!({"Reservations": [{"Instances": instances}]})
}

pub fn volume(id: &str, tags: &[(&str, &str)]) -> Value {
    json!({"VolumeId": id, "Status": "in-use", "Tags": tags_json(tags)})
}

pub fn volumes_page(volumes: &[Value]) -> Value {
    json!({"Volumes": volumes})
}

pub fn db_instance(id: &str, tags: &[(&str, &str)]) -> Value {
    json!({"DbInstanceId": id, "TagList": tags_json(tags)})
}

pub fn db_instances_page(dbs: &[Value]) -> Value {
    json!({"DbInstances": dbs})
}

pub fn stack(name: &str, tags: &[(&str, &str)], params: &[(&str, &str)]) -> Value {
    json!({
        "StackName": name,
        "Parameters": params
            .iter()
            .map(|(k, v)| json!({"ParameterKey": k, "ParameterValue": v}))
            .collect::<Vec<Value>>(),
        "Tags": tags_json(tags),
    })
}

pub fn stacks_page(stacks: &[Value]) -> Value {
    json!({"Stacks": stacks})
}

pub fn op_request(
    cycle: CycleInstant,
    service: Service,
    rsrc_type: &str,
    rsrc_id: &str,
    op: OpTag,
    tags: &[(&str, &str)],
) -> OpRequest {
    OpRequest {
        cycle_start: cycle,
        service,
        rsrc_type: rsrc_type.to_string(),
        rsrc_id: rsrc_id.to_string(),
        op,
        tags: tag_list(tags),
        op_kwargs: None,
    }
}

pub fn test_config() -> Config {
    test_config_with(&[])
}

pub fn test_config_with(overrides: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("QueueUrl".to_string(), "http://queue.test/ops".to_string()),
        (
            "FailedQueueUrl".to_string(),
            "http://queue.test/ops-failed".to_string(),
        ),
        (
            "ProviderApiUrl".to_string(),
            "http://provider.test".to_string(),
        ),
        ("ProviderApiToken".to_string(), "test-token".to_string()),
    ]);
    for (key, value) in overrides {
        vars.insert((*key).to_string(), (*value).to_string());
    }
    Config::from_vars(|key| vars.get(key).cloned()).expect("test config must be valid")
}
