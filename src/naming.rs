// File: src/naming.rs
//
// Deterministic construction of child backup names and the tags that are
// propagated from parent to child. Names follow the convention
//
//   zsched-<parent>-<YYYYMMDDTHHMMZ>-<suffix>
//
// where <parent> is the parent's Name tag (or physical id), scrubbed of
// characters the destination service forbids and truncated when a service
// caps name length; the other three segments are never shortened.

use rand::Rng;

use crate::catalog::Tag;
use crate::clock::CycleInstant;
use crate::constants::naming::{
    CHILD_NAME_PREFIX, NAME_DELIM, SUFFIX_ALPHABET, SUFFIX_LEN, UNSAFE_FILL,
};
use crate::constants::tags;

/// Character policy of the service a child resource is created in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafeChars {
    /// Machine images: letters, digits, `()[] ./-'@_` and space
    Image,
    /// No documented restrictions (volume snapshot descriptions)
    Any,
    /// Database snapshots: word characters plus `.:/=+-`
    WordPunct,
    /// Database cluster snapshots: letters, digits, and hyphen
    AlnumDash,
}

impl SafeChars {
    pub fn allows(self, c: char) -> bool {
        match self {
            SafeChars::Image => {
                c.is_ascii_alphanumeric() || "()[] ./-'@_".contains(c)
            }
            SafeChars::Any => true,
            SafeChars::WordPunct => {
                c.is_ascii_alphanumeric() || c == '_' || ".:/=+-".contains(c)
            }
            SafeChars::AlnumDash => c.is_ascii_alphanumeric() || c == '-',
        }
    }
}

/// Random suffix from an unambiguous alphabet; makes duplicate backup
/// requests produce two distinct children instead of a partial-failure race
pub fn unique_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

/// Build a child name from a parent label, scrubbing and truncating only
/// the parent segment to honor `name_max`
pub fn child_name(parent: &str, cycle: CycleInstant, safe: SafeChars, name_max: usize) -> String {
    child_name_with_suffix(parent, cycle, safe, name_max, &unique_suffix())
}

fn child_name_with_suffix(
    parent: &str,
    cycle: CycleInstant,
    safe: SafeChars,
    name_max: usize,
    suffix: &str,
) -> String {
    let stamp = cycle.to_compact();
    let fixed = CHILD_NAME_PREFIX.len() + stamp.len() + suffix.len() + 3;
    let budget = name_max.saturating_sub(fixed);

    let scrubbed: String = parent
        .chars()
        .take(budget)
        .map(|c| if safe.allows(c) { c } else { UNSAFE_FILL })
        .collect();

    let mut name = String::with_capacity(fixed + scrubbed.len());
    name.push_str(CHILD_NAME_PREFIX);
    name.push(NAME_DELIM);
    name.push_str(&scrubbed);
    name.push(NAME_DELIM);
    name.push_str(&stamp);
    name.push(NAME_DELIM);
    name.push_str(suffix);
    name
}

/// Compose the tag list for a child resource.
///
/// The fixed set always wins; with propagation enabled, parent tags whose
/// keys lack the reserved prefix are appended unless they collide with it.
pub fn child_tags(
    child_name: &str,
    parent_name: &str,
    parent_id: &str,
    op_tag_key: &str,
    cycle: CycleInstant,
    parent_tags: &[Tag],
    copy_tags: bool,
) -> Vec<Tag> {
    let mut out = vec![
        Tag::new(tags::NAME, child_name),
        Tag::new(tags::PARENT_NAME, parent_name),
        Tag::new(tags::PARENT_ID, parent_id),
        Tag::new(tags::OP, op_tag_key),
        Tag::new(tags::CYCLE_START, cycle.to_iso()),
    ];
    if copy_tags {
        for tag in parent_tags {
            if tag.key.starts_with(tags::RESERVED_PREFIX) || tag.key == tags::NAME {
                continue;
            }
            out.push(tag.clone());
        }
    }
    out
}

/// The parent label used in child names: the Name tag when present,
/// otherwise the physical identifier
pub fn parent_label<'a>(parent_tags: &'a [Tag], parent_id: &'a str) -> &'a str {
    parent_tags
        .iter()
        .find(|t| t.key == tags::NAME)
        .map(|t| t.value.as_str())
        .filter(|v| !v.is_empty())
        .unwrap_or(parent_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn cycle() -> CycleInstant {
        CycleInstant::floor(Utc.with_ymd_and_hms(2031, 7, 4, 14, 0, 0).unwrap())
    }

    #[test]
    fn suffix_uses_only_the_unambiguous_alphabet() {
        for _ in 0..200 {
            let s = unique_suffix();
            assert_eq!(s.len(), SUFFIX_LEN);
            assert!(s.bytes().all(|b| SUFFIX_ALPHABET.contains(&b)), "{}", s);
        }
    }

    #[test]
    fn name_has_four_hyphenated_segments() {
        let name = child_name_with_suffix("web", cycle(), SafeChars::Image, 128, "x7y2k");
        assert_eq!(name, "zsched-web-20310704T1400Z-x7y2k");
    }

    #[test]
    fn two_invocations_share_everything_but_the_suffix() {
        let a = child_name("web", cycle(), SafeChars::Image, 128);
        let b = child_name("web", cycle(), SafeChars::Image, 128);
        assert!(a.starts_with("zsched-web-20310704T1400Z-"));
        assert!(b.starts_with("zsched-web-20310704T1400Z-"));
        assert_eq!(a.len(), b.len());
    }

    #[test]
    fn forbidden_characters_become_fill() {
        let name =
            child_name_with_suffix("db name,2", cycle(), SafeChars::AlnumDash, 63, "x7y2k");
        assert_eq!(name, "zsched-dbXnameX2-20310704T1400Z-x7y2k");
    }

    #[test]
    fn only_the_parent_segment_is_truncated() {
        let parent = "a".repeat(100);
        let name = child_name_with_suffix(&parent, cycle(), SafeChars::AlnumDash, 63, "x7y2k");
        assert_eq!(name.len(), 63);
        assert!(name.starts_with("zsched-a"));
        assert!(name.ends_with("-20310704T1400Z-x7y2k"));
    }

    #[test]
    fn image_charset_keeps_documented_punctuation() {
        let name = child_name_with_suffix(
            "app (blue) v1.2/web@east_1",
            cycle(),
            SafeChars::Image,
            128,
            "x7y2k",
        );
        assert_eq!(name, "zsched-app (blue) v1.2/web@east_1-20310704T1400Z-x7y2k");
    }

    #[test]
    fn fixed_child_tags_are_always_present() {
        let out = child_tags("zsched-web-20310704T1400Z-x7y2k", "web", "i-abc123",
            "sched-backup", cycle(), &[], false);
        let get = |k: &str| out.iter().find(|t| t.key == k).map(|t| t.value.clone());
        assert_eq!(get("Name").unwrap(), "zsched-web-20310704T1400Z-x7y2k");
        assert_eq!(get("sched-parent-name").unwrap(), "web");
        assert_eq!(get("sched-parent-id").unwrap(), "i-abc123");
        assert_eq!(get("sched-op").unwrap(), "sched-backup");
        assert_eq!(get("sched-cycle-start").unwrap(), "2031-07-04T14:00:00Z");
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn propagation_copies_unreserved_tags_only() {
        let parent_tags = vec![
            Tag::new("Name", "web"),
            Tag::new("team", "payments"),
            Tag::new("sched-stop", "d=_ H:M=23:00"),
            Tag::new("env", "prod"),
        ];
        let out = child_tags("child", "web", "i-abc123", "sched-backup", cycle(),
            &parent_tags, true);
        let keys: Vec<&str> = out.iter().map(|t| t.key.as_str()).collect();
        assert!(keys.contains(&"team"));
        assert!(keys.contains(&"env"));
        assert!(!keys.contains(&"sched-stop"));
        // the reserved Name keeps the child value
        let names: Vec<&Tag> = out.iter().filter(|t| t.key == "Name").collect();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].value, "child");
    }

    #[test]
    fn parent_label_prefers_the_name_tag() {
        let tags = vec![Tag::new("Name", "web")];
        assert_eq!(parent_label(&tags, "i-abc123"), "web");
        assert_eq!(parent_label(&[], "i-abc123"), "i-abc123");
        let empty = vec![Tag::new("Name", "")];
        assert_eq!(parent_label(&empty, "i-abc123"), "i-abc123");
    }
}
