//! Resource catalog: every supported (service, resource type) pair and
//! every operation on it, as one static declarative table.
//!
//! The table in [`table`] is data; the types here give each entry its
//! behavior: paged-list conventions, tag-list extraction, operation lookup,
//! and the per-operation argument builders the do stage feeds the provider.
//! Adding a service, resource type, or operation is a change to this module
//! only.

pub mod table;

pub use table::{catalog, entry, validate};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

use crate::clock::CycleInstant;
use crate::naming::{self, SafeChars};

/// Provider service identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    /// Instances and block volumes
    Compute,
    /// Managed relational databases, instance and cluster flavors
    Rdb,
    /// Declarative infrastructure stacks
    Stacks,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Compute => "compute",
            Service::Rdb => "rdb",
            Service::Stacks => "stacks",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of operations a schedule tag can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpTag {
    #[serde(rename = "start")]
    Start,
    #[serde(rename = "stop")]
    Stop,
    #[serde(rename = "hibernate")]
    Hibernate,
    #[serde(rename = "reboot")]
    Reboot,
    #[serde(rename = "reboot-failover")]
    RebootFailover,
    #[serde(rename = "backup")]
    Backup,
    #[serde(rename = "reboot-backup")]
    RebootBackup,
    #[serde(rename = "set-Enable-true")]
    SetEnableTrue,
    #[serde(rename = "set-Enable-false")]
    SetEnableFalse,
}

impl OpTag {
    /// Canonical operation name, the remainder of the tag key
    pub fn name(&self) -> &'static str {
        match self {
            OpTag::Start => "start",
            OpTag::Stop => "stop",
            OpTag::Hibernate => "hibernate",
            OpTag::Reboot => "reboot",
            OpTag::RebootFailover => "reboot-failover",
            OpTag::Backup => "backup",
            OpTag::RebootBackup => "reboot-backup",
            OpTag::SetEnableTrue => "set-Enable-true",
            OpTag::SetEnableFalse => "set-Enable-false",
        }
    }

    /// Full tag key carrying this operation's schedule
    pub fn tag_key(&self) -> &'static str {
        match self {
            OpTag::Start => "sched-start",
            OpTag::Stop => "sched-stop",
            OpTag::Hibernate => "sched-hibernate",
            OpTag::Reboot => "sched-reboot",
            OpTag::RebootFailover => "sched-reboot-failover",
            OpTag::Backup => "sched-backup",
            OpTag::RebootBackup => "sched-reboot-backup",
            OpTag::SetEnableTrue => "sched-set-Enable-true",
            OpTag::SetEnableFalse => "sched-set-Enable-false",
        }
    }
}

impl fmt::Display for OpTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One resource tag, in the shape the provider returns and accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A discovery-time list filter, e.g. instance state
#[derive(Debug, Clone, Copy)]
pub struct ListFilter {
    pub name: &'static str,
    pub values: &'static [&'static str],
}

/// Scalar static arguments attached to an operation, e.g. `Hibernate: true`
#[derive(Debug, Clone, Copy)]
pub enum ArgValue {
    Bool(bool),
    Str(&'static str),
}

impl ArgValue {
    fn to_json(self) -> Value {
        match self {
            ArgValue::Bool(b) => Value::Bool(b),
            ArgValue::Str(s) => Value::String(s.to_string()),
        }
    }
}

/// Where a child's tag list goes in the create call
#[derive(Debug, Clone, Copy)]
pub enum ChildTagStyle {
    /// `Tags: [...]` directly
    Plain,
    /// `TagSpecifications: [{ResourceType, Tags}, ...]`, one block per type
    SpecBlocks(&'static [&'static str]),
}

/// Construction rules for the child resource a backup operation creates
#[derive(Debug)]
pub struct ChildSpec {
    /// Child resource type, for logs
    pub kind: &'static str,
    /// Parameter carrying the child name, when the service has one
    pub name_key: Option<&'static str>,
    /// Parameter carrying a description; set to the child name because some
    /// console pages show only one of the two
    pub description_key: Option<&'static str>,
    pub tag_style: ChildTagStyle,
    pub safe_chars: SafeChars,
    pub name_max: usize,
}

/// One operation descriptor within a catalog entry
pub struct OpSpec {
    pub tag: OpTag,
    /// Provider API verb
    pub action: &'static str,
    /// Identifier passed as a singleton list (`<IdKey>s: [id]`), one
    /// resource at a time to avoid partial-completion risk
    pub batch_id: bool,
    pub static_args: &'static [(&'static str, ArgValue)],
    /// Present on backup operations
    pub child: Option<&'static ChildSpec>,
    /// Present on stack parameter flips: (parameter key, literal value)
    pub stack_param: Option<(&'static str, &'static str)>,
    /// Discovery-time kwargs extracted from the resource record and carried
    /// through the queue, e.g. the stack's parameter-key list
    pub find_kwargs: Option<fn(&Value) -> Option<Value>>,
}

impl OpSpec {
    /// Build the provider-call parameters for this operation.
    ///
    /// `op_kwargs` is the operation-specific payload the find stage put in
    /// the request; a missing or malformed payload is a permanent error.
    pub fn build_args(
        &self,
        entry: &RsrcTypeSpec,
        rsrc_id: &str,
        rsrc_tags: &[Tag],
        cycle: CycleInstant,
        op_kwargs: Option<&Value>,
        copy_tags: bool,
    ) -> Result<Value, String> {
        let mut params = Map::new();

        if self.batch_id {
            params.insert(format!("{}s", entry.id_key), json!([rsrc_id]));
        } else {
            params.insert(entry.id_key.to_string(), json!(rsrc_id));
        }

        for (key, value) in self.static_args {
            params.insert((*key).to_string(), value.to_json());
        }

        if let Some((param_key, literal)) = self.stack_param {
            self.build_stack_update(&mut params, param_key, literal, op_kwargs)?;
        }

        if let Some(child) = self.child {
            self.build_child(&mut params, child, rsrc_id, rsrc_tags, cycle, copy_tags)?;
        }

        Ok(Value::Object(params))
    }

    /// Flip one stack parameter, preserving the template and every other
    /// parameter via use-previous markers
    fn build_stack_update(
        &self,
        params: &mut Map<String, Value>,
        param_key: &str,
        literal: &str,
        op_kwargs: Option<&Value>,
    ) -> Result<(), String> {
        let kwargs =
            op_kwargs.ok_or_else(|| "stack update request lost its parameter list".to_string())?;
        let keys = kwargs
            .get("param_keys")
            .and_then(Value::as_array)
            .ok_or_else(|| "stack update request has no param_keys".to_string())?;

        let mut parameters = vec![json!({
            "ParameterKey": param_key,
            "ParameterValue": literal,
        })];
        for key in keys.iter().filter_map(Value::as_str) {
            if key != param_key {
                parameters.push(json!({
                    "ParameterKey": key,
                    "UsePreviousValue": true,
                }));
            }
        }

        params.insert("UsePreviousTemplate".to_string(), Value::Bool(true));
        params.insert("Parameters".to_string(), Value::Array(parameters));

        if let Some(caps) = kwargs.get("capabilities").and_then(Value::as_array) {
            if !caps.is_empty() {
                params.insert("Capabilities".to_string(), Value::Array(caps.clone()));
            }
        }
        Ok(())
    }

    fn build_child(
        &self,
        params: &mut Map<String, Value>,
        child: &ChildSpec,
        rsrc_id: &str,
        rsrc_tags: &[Tag],
        cycle: CycleInstant,
        copy_tags: bool,
    ) -> Result<(), String> {
        let label = naming::parent_label(rsrc_tags, rsrc_id);
        let name = naming::child_name(label, cycle, child.safe_chars, child.name_max);
        let tags = naming::child_tags(
            &name,
            label,
            rsrc_id,
            self.tag.tag_key(),
            cycle,
            rsrc_tags,
            copy_tags,
        );
        let tags_json = serde_json::to_value(&tags)
            .map_err(|e| format!("child tags failed to serialize: {}", e))?;

        if let Some(name_key) = child.name_key {
            params.insert(name_key.to_string(), Value::String(name.clone()));
        }
        if let Some(description_key) = child.description_key {
            params.insert(description_key.to_string(), Value::String(name.clone()));
        }
        match child.tag_style {
            ChildTagStyle::Plain => {
                params.insert("Tags".to_string(), tags_json);
            }
            ChildTagStyle::SpecBlocks(types) => {
                let blocks: Vec<Value> = types
                    .iter()
                    .map(|t| json!({"ResourceType": t, "Tags": tags_json.clone()}))
                    .collect();
                params.insert("TagSpecifications".to_string(), Value::Array(blocks));
            }
        }
        Ok(())
    }
}

/// One (service, resource type) catalog entry
pub struct RsrcTypeSpec {
    pub service: Service,
    /// Resource type identifier used in queue messages
    pub rsrc_type: &'static str,
    /// Paged enumeration verb
    pub list_action: &'static str,
    /// Key of the resource array in a list response
    pub result_key: &'static str,
    /// Set when resources nest one level deeper, e.g. instances grouped
    /// under reservations
    pub nested_key: Option<&'static str>,
    pub list_filters: &'static [ListFilter],
    /// Physical identifier key in a resource record
    pub id_key: &'static str,
    /// Tag-list key; conventions differ between services
    pub tags_key: &'static str,
    pub ops: &'static [OpSpec],
}

impl RsrcTypeSpec {
    /// Flatten one list-response page into resource records
    pub fn flatten(&self, page: &Value) -> Vec<Value> {
        let outer = match page.get(self.result_key).and_then(Value::as_array) {
            Some(arr) => arr,
            None => return Vec::new(),
        };
        match self.nested_key {
            None => outer.to_vec(),
            Some(inner) => outer
                .iter()
                .flat_map(|group| {
                    group
                        .get(inner)
                        .and_then(Value::as_array)
                        .cloned()
                        .unwrap_or_default()
                })
                .collect(),
        }
    }

    /// Extract a record's tag list; the key may be absent when untagged
    pub fn tags_of(&self, rsrc: &Value) -> Vec<Tag> {
        rsrc.get(self.tags_key)
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    pub fn rsrc_id(&self, rsrc: &Value) -> Option<String> {
        rsrc.get(self.id_key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    pub fn op(&self, tag: OpTag) -> Option<&'static OpSpec> {
        self.ops.iter().find(|op| op.tag == tag)
    }

    pub fn op_for_tag_key(&self, key: &str) -> Option<&'static OpSpec> {
        self.ops.iter().find(|op| op.tag.tag_key() == key)
    }

    /// Discovery filters: the entry's state filters plus a tag-key filter
    /// narrowing the listing to resources that carry any supported
    /// operation tag
    pub fn describe_filters(&self) -> Option<Value> {
        if self.list_filters.is_empty() {
            return None;
        }
        let mut filters: Vec<Value> = self
            .list_filters
            .iter()
            .map(|f| json!({"Name": f.name, "Values": f.values}))
            .collect();
        let tag_keys: Vec<&str> = self.ops.iter().map(|op| op.tag.tag_key()).collect();
        filters.push(json!({"Name": "tag-key", "Values": tag_keys}));
        Some(Value::Array(filters))
    }
}

impl fmt::Debug for RsrcTypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RsrcTypeSpec({} {})", self.service, self.rsrc_type)
    }
}
