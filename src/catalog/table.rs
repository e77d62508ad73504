// File: src/catalog/table.rs
//
// The supported matrix, readable in one place: which services and resource
// types are scanned, which operations each accepts, and how each backup
// op names and tags its child. Runtime code never looks verbs up by string
// convention; everything is declared here.

use serde_json::{json, Value};

use super::{
    ArgValue, ChildSpec, ChildTagStyle, ListFilter, OpSpec, OpTag, RsrcTypeSpec, Service,
};
use crate::constants::naming::{CHILD_NAME_PREFIX, SUFFIX_LEN};
use crate::errors::ConfigError;
use crate::naming::SafeChars;

static IMAGE_CHILD: ChildSpec = ChildSpec {
    kind: "image",
    // Name and Description both set; some console pages show only one
    name_key: Some("Name"),
    description_key: Some("Description"),
    // Tag the image and the volume snapshots it carries
    tag_style: ChildTagStyle::SpecBlocks(&["image", "snapshot"]),
    safe_chars: SafeChars::Image,
    name_max: 128,
};

static VOLUME_SNAPSHOT_CHILD: ChildSpec = ChildSpec {
    kind: "volume-snapshot",
    name_key: None,
    description_key: Some("Description"),
    tag_style: ChildTagStyle::SpecBlocks(&["snapshot"]),
    safe_chars: SafeChars::Any,
    name_max: 255,
};

static DB_SNAPSHOT_CHILD: ChildSpec = ChildSpec {
    kind: "db-snapshot",
    name_key: Some("DbSnapshotId"),
    description_key: None,
    tag_style: ChildTagStyle::Plain,
    safe_chars: SafeChars::WordPunct,
    name_max: 255,
};

static DB_CLUSTER_SNAPSHOT_CHILD: ChildSpec = ChildSpec {
    kind: "db-cluster-snapshot",
    name_key: Some("DbClusterSnapshotId"),
    description_key: None,
    tag_style: ChildTagStyle::Plain,
    safe_chars: SafeChars::AlnumDash,
    name_max: 63,
};

/// Discovery-time kwargs for stack updates: the parameter keys to preserve
/// and the capabilities to pass through
fn stack_find_kwargs(rsrc: &Value) -> Option<Value> {
    let param_keys: Vec<Value> = rsrc
        .get("Parameters")
        .and_then(Value::as_array)
        .map(|params| {
            params
                .iter()
                .filter_map(|p| p.get("ParameterKey").cloned())
                .collect()
        })
        .unwrap_or_default();
    let capabilities = rsrc
        .get("Capabilities")
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()));
    Some(json!({
        "param_keys": param_keys,
        "capabilities": capabilities,
    }))
}

static INSTANCE_OPS: [OpSpec; 6] = [
    OpSpec {
        tag: OpTag::Start,
        action: "StartInstances",
        batch_id: true,
        static_args: &[],
        child: None,
        stack_param: None,
        find_kwargs: None,
    },
    OpSpec {
        tag: OpTag::Stop,
        action: "StopInstances",
        batch_id: true,
        static_args: &[],
        child: None,
        stack_param: None,
        find_kwargs: None,
    },
    OpSpec {
        tag: OpTag::Hibernate,
        action: "StopInstances",
        batch_id: true,
        static_args: &[("Hibernate", ArgValue::Bool(true))],
        child: None,
        stack_param: None,
        find_kwargs: None,
    },
    OpSpec {
        tag: OpTag::Reboot,
        action: "RebootInstances",
        batch_id: true,
        static_args: &[],
        child: None,
        stack_param: None,
        find_kwargs: None,
    },
    OpSpec {
        tag: OpTag::Backup,
        action: "CreateImage",
        batch_id: false,
        static_args: &[],
        child: Some(&IMAGE_CHILD),
        stack_param: None,
        find_kwargs: None,
    },
    OpSpec {
        tag: OpTag::RebootBackup,
        action: "CreateImage",
        batch_id: false,
        static_args: &[("NoReboot", ArgValue::Bool(false))],
        child: Some(&IMAGE_CHILD),
        stack_param: None,
        find_kwargs: None,
    },
];

static VOLUME_OPS: [OpSpec; 1] = [OpSpec {
    tag: OpTag::Backup,
    action: "CreateSnapshot",
    batch_id: false,
    static_args: &[],
    child: Some(&VOLUME_SNAPSHOT_CHILD),
    stack_param: None,
    find_kwargs: None,
}];

static DB_INSTANCE_OPS: [OpSpec; 5] = [
    OpSpec {
        tag: OpTag::Start,
        action: "StartDbInstance",
        batch_id: false,
        static_args: &[],
        child: None,
        stack_param: None,
        find_kwargs: None,
    },
    OpSpec {
        tag: OpTag::Stop,
        action: "StopDbInstance",
        batch_id: false,
        static_args: &[],
        child: None,
        stack_param: None,
        find_kwargs: None,
    },
    OpSpec {
        tag: OpTag::Reboot,
        action: "RebootDbInstance",
        batch_id: false,
        static_args: &[],
        child: None,
        stack_param: None,
        find_kwargs: None,
    },
    OpSpec {
        // Whether an instance supports failover is the provider's call;
        // a rejection classifies as permanent
        tag: OpTag::RebootFailover,
        action: "RebootDbInstance",
        batch_id: false,
        static_args: &[("ForceFailover", ArgValue::Bool(true))],
        child: None,
        stack_param: None,
        find_kwargs: None,
    },
    OpSpec {
        tag: OpTag::Backup,
        action: "CreateDbSnapshot",
        batch_id: false,
        static_args: &[],
        child: Some(&DB_SNAPSHOT_CHILD),
        stack_param: None,
        find_kwargs: None,
    },
];

static DB_CLUSTER_OPS: [OpSpec; 4] = [
    OpSpec {
        tag: OpTag::Start,
        action: "StartDbCluster",
        batch_id: false,
        static_args: &[],
        child: None,
        stack_param: None,
        find_kwargs: None,
    },
    OpSpec {
        tag: OpTag::Stop,
        action: "StopDbCluster",
        batch_id: false,
        static_args: &[],
        child: None,
        stack_param: None,
        find_kwargs: None,
    },
    OpSpec {
        tag: OpTag::Reboot,
        action: "RebootDbCluster",
        batch_id: false,
        static_args: &[],
        child: None,
        stack_param: None,
        find_kwargs: None,
    },
    OpSpec {
        tag: OpTag::Backup,
        action: "CreateDbClusterSnapshot",
        batch_id: false,
        static_args: &[],
        child: Some(&DB_CLUSTER_SNAPSHOT_CHILD),
        stack_param: None,
        find_kwargs: None,
    },
];

static STACK_OPS: [OpSpec; 2] = [
    OpSpec {
        tag: OpTag::SetEnableTrue,
        action: "UpdateStack",
        batch_id: false,
        static_args: &[],
        child: None,
        stack_param: Some(("Enable", "true")),
        find_kwargs: Some(stack_find_kwargs),
    },
    OpSpec {
        tag: OpTag::SetEnableFalse,
        action: "UpdateStack",
        batch_id: false,
        static_args: &[],
        child: None,
        stack_param: Some(("Enable", "false")),
        find_kwargs: Some(stack_find_kwargs),
    },
];

static CATALOG: [RsrcTypeSpec; 5] = [
    RsrcTypeSpec {
        service: Service::Compute,
        rsrc_type: "Instance",
        list_action: "DescribeInstances",
        result_key: "Reservations",
        nested_key: Some("Instances"),
        list_filters: &[ListFilter {
            name: "instance-state-name",
            values: &["running", "stopping", "stopped"],
        }],
        id_key: "InstanceId",
        tags_key: "Tags",
        ops: &INSTANCE_OPS,
    },
    RsrcTypeSpec {
        service: Service::Compute,
        rsrc_type: "Volume",
        list_action: "DescribeVolumes",
        result_key: "Volumes",
        nested_key: None,
        list_filters: &[ListFilter {
            name: "status",
            values: &["available", "in-use"],
        }],
        id_key: "VolumeId",
        tags_key: "Tags",
        ops: &VOLUME_OPS,
    },
    RsrcTypeSpec {
        service: Service::Rdb,
        rsrc_type: "DbInstance",
        list_action: "DescribeDbInstances",
        result_key: "DbInstances",
        nested_key: None,
        list_filters: &[],
        id_key: "DbInstanceId",
        tags_key: "TagList",
        ops: &DB_INSTANCE_OPS,
    },
    RsrcTypeSpec {
        service: Service::Rdb,
        rsrc_type: "DbCluster",
        list_action: "DescribeDbClusters",
        result_key: "DbClusters",
        nested_key: None,
        list_filters: &[],
        id_key: "DbClusterId",
        tags_key: "TagList",
        ops: &DB_CLUSTER_OPS,
    },
    RsrcTypeSpec {
        service: Service::Stacks,
        rsrc_type: "Stack",
        list_action: "DescribeStacks",
        result_key: "Stacks",
        nested_key: None,
        list_filters: &[],
        id_key: "StackName",
        tags_key: "Tags",
        ops: &STACK_OPS,
    },
];

/// The full catalog, in deterministic scan order
pub fn catalog() -> &'static [RsrcTypeSpec] {
    &CATALOG
}

/// Look up an entry by the identifiers a queue message carries
pub fn entry(service: Service, rsrc_type: &str) -> Option<&'static RsrcTypeSpec> {
    CATALOG
        .iter()
        .find(|e| e.service == service && e.rsrc_type == rsrc_type)
}

/// Startup validation of the table; inapplicable (resource type, operation)
/// combinations are rejected here, never at runtime
pub fn validate() -> Result<(), ConfigError> {
    let overhead = CHILD_NAME_PREFIX.len() + "YYYYMMDDTHHMMZ".len() + SUFFIX_LEN + 3;
    for (i, entry) in CATALOG.iter().enumerate() {
        for other in &CATALOG[i + 1..] {
            if entry.service == other.service && entry.rsrc_type == other.rsrc_type {
                return Err(ConfigError::Catalog {
                    reason: format!("duplicate entry {} {}", entry.service, entry.rsrc_type),
                });
            }
        }
        if entry.ops.is_empty() {
            return Err(ConfigError::Catalog {
                reason: format!("{} {} has no operations", entry.service, entry.rsrc_type),
            });
        }
        for (j, op) in entry.ops.iter().enumerate() {
            let at = format!("{} {} {}", entry.service, entry.rsrc_type, op.tag);
            for other in &entry.ops[j + 1..] {
                if op.tag == other.tag {
                    return Err(ConfigError::Catalog {
                        reason: format!("duplicate operation {}", at),
                    });
                }
            }
            let is_backup = matches!(op.tag, OpTag::Backup | OpTag::RebootBackup);
            if is_backup != op.child.is_some() {
                return Err(ConfigError::Catalog {
                    reason: format!("{} child spec does not match its operation kind", at),
                });
            }
            let is_flip = matches!(op.tag, OpTag::SetEnableTrue | OpTag::SetEnableFalse);
            if is_flip != op.stack_param.is_some() {
                return Err(ConfigError::Catalog {
                    reason: format!("{} stack parameter does not match its operation kind", at),
                });
            }
            if is_flip && op.find_kwargs.is_none() {
                return Err(ConfigError::Catalog {
                    reason: format!("{} needs discovery-time kwargs", at),
                });
            }
            if let Some(child) = op.child {
                if child.name_max <= overhead {
                    return Err(ConfigError::Catalog {
                        reason: format!(
                            "{} child name cap {} cannot fit the fixed segments",
                            at, child.name_max
                        ),
                    });
                }
                if child.name_key.is_none() && child.description_key.is_none() {
                    return Err(ConfigError::Catalog {
                        reason: format!("{} child has nowhere to put its name", at),
                    });
                }
            }
        }
    }
    Ok(())
}
