//! Host discovery from an Ansible inventory

use crate::{CollectorError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

const DEFAULT_INVENTORY: &str = "/etc/ansible/hosts";
const DEFAULT_REMOTE_USER: &str = "root";

/// Hosts to sample and the SSH identity to reach them with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryHosts {
    pub hosts: Vec<String>,
    pub account: String,
    pub keyfile: Option<PathBuf>,
}

/// Resolves group (or host) names to a host list
#[async_trait]
pub trait Inventory: Send + Sync {
    async fn resolve(&self, names: &[String]) -> Result<InventoryHosts>;
}

/// Inventory backed by `ansible-inventory --list`
#[derive(Debug, Clone)]
pub struct AnsibleInventory {
    config: PathBuf,
    program: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
struct Listing {
    #[serde(rename = "_meta", default)]
    meta: Meta,
    #[serde(flatten)]
    groups: HashMap<String, Group>,
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
    #[serde(default)]
    hostvars: HashMap<String, HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct Group {
    #[serde(default)]
    hosts: Vec<String>,
    #[serde(default)]
    children: Vec<String>,
}

impl AnsibleInventory {
    /// `config` is the path of an `ansible.cfg` file
    pub fn new(config: impl Into<PathBuf>) -> Self {
        Self {
            config: config.into(),
            program: PathBuf::from("ansible-inventory"),
        }
    }

    fn config_dir(&self) -> &Path {
        self.config.parent().unwrap_or_else(|| Path::new("."))
    }

    async fn list(&self, inventory: &Path) -> Result<Listing> {
        debug!(inventory = %inventory.display(), "Listing Ansible inventory");

        let output = Command::new(&self.program)
            .env("ANSIBLE_CONFIG", &self.config)
            .arg("-i")
            .arg(inventory)
            .arg("--list")
            .output()
            .await
            .map_err(|e| {
                CollectorError::Inventory(format!("failed to run {}: {}", self.program.display(), e))
            })?;

        if !output.status.success() {
            return Err(CollectorError::Inventory(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

#[async_trait]
impl Inventory for AnsibleInventory {
    async fn resolve(&self, names: &[String]) -> Result<InventoryHosts> {
        let text = tokio::fs::read_to_string(&self.config).await.map_err(|e| {
            CollectorError::Inventory(format!("cannot read {}: {}", self.config.display(), e))
        })?;
        let defaults = read_defaults(&text);
        let base = self.config_dir();

        let inventory = resolve_path(
            base,
            defaults.get("inventory").map(String::as_str).unwrap_or(DEFAULT_INVENTORY),
        );
        let listing = self.list(&inventory).await?;
        let hosts = select_hosts(&listing, names);

        let first_vars = hosts.first().and_then(|h| listing.meta.hostvars.get(h));
        let account = first_vars
            .and_then(|vars| host_var(vars, "ansible_user").or_else(|| host_var(vars, "ansible_ssh_user")))
            .or_else(|| defaults.get("remote_user").cloned())
            .unwrap_or_else(|| DEFAULT_REMOTE_USER.to_string());
        let keyfile = first_vars
            .and_then(|vars| host_var(vars, "ansible_ssh_private_key_file"))
            .or_else(|| defaults.get("private_key_file").cloned())
            .filter(|k| !k.is_empty())
            .map(|k| resolve_path(base, &k));

        info!(hosts = hosts.len(), account = %account, "Resolved inventory");
        Ok(InventoryHosts {
            hosts,
            account,
            keyfile,
        })
    }
}

/// Hosts matched by the patterns in `names`, first occurrence wins
///
/// Each name is an Ansible host pattern: terms separated by `:` or `,`.
/// A plain term adds hosts, `&term` keeps only hosts also matched by
/// `term`, and `!term` removes hosts. A term is a group or host name, a
/// glob using `*` or `?`, or a regex prefixed with `~`.
fn select_hosts(listing: &Listing, names: &[String]) -> Vec<String> {
    let mut selected = Vec::new();
    let mut seen = HashSet::new();

    for name in names {
        let matched = match_pattern(listing, name);
        if matched.is_empty() {
            warn!(pattern = %name, "No inventory group or host matches");
        }
        for host in matched {
            if seen.insert(host.clone()) {
                selected.push(host);
            }
        }
    }

    selected
}

fn match_pattern(listing: &Listing, pattern: &str) -> Vec<String> {
    let mut included = Vec::new();
    let mut required = Vec::new();
    let mut excluded = Vec::new();
    let mut any_included = false;

    for term in pattern.split([':', ',']).map(str::trim).filter(|t| !t.is_empty()) {
        if let Some(term) = term.strip_prefix('&') {
            required.push(match_term(listing, term).into_iter().collect::<HashSet<_>>());
        } else if let Some(term) = term.strip_prefix('!') {
            excluded.extend(match_term(listing, term));
        } else {
            any_included = true;
            included.extend(match_term(listing, term));
        }
    }

    // only restrictions means "everything except"
    if !any_included && !(required.is_empty() && excluded.is_empty()) {
        included = all_hosts(listing);
    }

    let excluded: HashSet<String> = excluded.into_iter().collect();
    let mut seen = HashSet::new();
    included.retain(|host| {
        !excluded.contains(host) && required.iter().all(|set| set.contains(host)) && seen.insert(host.clone())
    });
    included
}

fn match_term(listing: &Listing, term: &str) -> Vec<String> {
    if term == "all" && !listing.groups.contains_key("all") {
        return all_hosts(listing);
    }
    if listing.groups.contains_key(term) {
        return group_hosts(listing, term);
    }
    if is_known_host(listing, term) {
        return vec![term.to_string()];
    }

    let matcher = if let Some(expr) = term.strip_prefix('~') {
        Regex::new(expr)
    } else if term.contains(['*', '?']) {
        let glob = regex::escape(term).replace(r"\*", ".*").replace(r"\?", ".");
        Regex::new(&format!("^{}$", glob))
    } else {
        return Vec::new();
    };
    let matcher = match matcher {
        Ok(matcher) => matcher,
        Err(e) => {
            warn!(pattern = %term, error = %e, "Invalid inventory pattern");
            return Vec::new();
        }
    };

    let mut groups: Vec<&String> = listing.groups.keys().filter(|g| matcher.is_match(g)).collect();
    groups.sort();
    let mut hosts: Vec<String> = groups.into_iter().flat_map(|g| group_hosts(listing, g)).collect();
    hosts.extend(all_hosts(listing).into_iter().filter(|h| matcher.is_match(h)));
    hosts
}

/// Every host in the listing, group members first in sorted group order
fn all_hosts(listing: &Listing) -> Vec<String> {
    let mut groups: Vec<&String> = listing.groups.keys().collect();
    groups.sort();
    let mut hosts: Vec<String> = groups.into_iter().flat_map(|g| group_hosts(listing, g)).collect();
    let mut ungrouped: Vec<&String> = listing.meta.hostvars.keys().collect();
    ungrouped.sort();
    hosts.extend(ungrouped.into_iter().cloned());

    let mut seen = HashSet::new();
    hosts.retain(|h| seen.insert(h.clone()));
    hosts
}

fn group_hosts(listing: &Listing, group: &str) -> Vec<String> {
    let mut hosts = Vec::new();
    expand_group(listing, group, &mut HashSet::new(), &mut HashSet::new(), &mut hosts);
    hosts
}

fn expand_group(
    listing: &Listing,
    group: &str,
    seen_groups: &mut HashSet<String>,
    seen_hosts: &mut HashSet<String>,
    selected: &mut Vec<String>,
) {
    if !seen_groups.insert(group.to_string()) {
        return;
    }
    let Some(entry) = listing.groups.get(group) else {
        return;
    };

    for host in &entry.hosts {
        if seen_hosts.insert(host.clone()) {
            selected.push(host.clone());
        }
    }
    for child in &entry.children {
        expand_group(listing, child, seen_groups, seen_hosts, selected);
    }
}

fn is_known_host(listing: &Listing, name: &str) -> bool {
    listing.meta.hostvars.contains_key(name)
        || listing.groups.values().any(|g| g.hosts.iter().any(|h| h == name))
}

fn host_var(vars: &HashMap<String, serde_json::Value>, key: &str) -> Option<String> {
    vars.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn resolve_path(base: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Keys of the `[defaults]` section of an ansible.cfg
fn read_defaults(text: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    let mut in_defaults = false;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(section) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            in_defaults = section.trim() == "defaults";
            continue;
        }
        if !in_defaults {
            continue;
        }
        if let Some((key, value)) = line.split_once(['=', ':']) {
            values.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"{
        "_meta": {
            "hostvars": {
                "web1": {"ansible_user": "deploy", "ansible_ssh_private_key_file": "keys/deploy"},
                "web2": {},
                "db1": {"ansible_ssh_user": "dba"},
                "lab1": {}
            }
        },
        "all": {"children": ["ungrouped", "production", "lab"]},
        "ungrouped": {},
        "production": {"children": ["web", "databases"]},
        "web": {"hosts": ["web1", "web2"]},
        "databases": {"hosts": ["db1", "web2"]},
        "lab": {"hosts": ["lab1"], "vars": {"ansible_user": "lab"}}
    }"#;

    fn listing() -> Listing {
        serde_json::from_str(LISTING).unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn groups_expand_recursively_without_duplicates() {
        let hosts = select_hosts(&listing(), &names(&["production"]));
        assert_eq!(hosts, vec!["web1", "web2", "db1"]);
    }

    #[test]
    fn several_names_are_combined_in_order() {
        let hosts = select_hosts(&listing(), &names(&["lab", "databases", "web"]));
        assert_eq!(hosts, vec!["lab1", "db1", "web2", "web1"]);
    }

    #[test]
    fn single_hosts_and_unknown_names() {
        let hosts = select_hosts(&listing(), &names(&["db1", "nope", "db1"]));
        assert_eq!(hosts, vec!["db1"]);
    }

    #[test]
    fn all_covers_every_host() {
        let hosts = select_hosts(&listing(), &names(&["all"]));
        assert_eq!(hosts.len(), 4);
    }

    #[test]
    fn glob_matches_groups_and_hosts() {
        assert_eq!(select_hosts(&listing(), &names(&["web*"])), vec!["web1", "web2"]);
        assert_eq!(select_hosts(&listing(), &names(&["data*"])), vec!["db1", "web2"]);
        assert_eq!(select_hosts(&listing(), &names(&["db?"])), vec!["db1"]);
    }

    #[test]
    fn intersection_and_exclusion() {
        assert_eq!(select_hosts(&listing(), &names(&["web:&databases"])), vec!["web2"]);
        assert_eq!(select_hosts(&listing(), &names(&["production:!databases"])), vec!["web1"]);
        assert_eq!(select_hosts(&listing(), &names(&["lab,db1"])), vec!["lab1", "db1"]);
    }

    #[test]
    fn exclusion_alone_starts_from_all() {
        let mut hosts = select_hosts(&listing(), &names(&["!production"]));
        hosts.sort();
        assert_eq!(hosts, vec!["lab1"]);
    }

    #[test]
    fn regex_terms_and_bad_patterns() {
        assert_eq!(select_hosts(&listing(), &names(&["~^web[0-9]$"])), vec!["web1", "web2"]);
        assert!(select_hosts(&listing(), &names(&["~(unclosed"])).is_empty());
    }

    #[test]
    fn defaults_section_only() {
        let cfg = "\
# managed by config management
[defaults]
inventory = inventory/hosts.ini
remote_user=ops
private_key_file: /etc/keys/ops
; comment

[ssh_connection]
pipelining = True
remote_user = ignored
";
        let defaults = read_defaults(cfg);
        assert_eq!(defaults.get("inventory").unwrap(), "inventory/hosts.ini");
        assert_eq!(defaults.get("remote_user").unwrap(), "ops");
        assert_eq!(defaults.get("private_key_file").unwrap(), "/etc/keys/ops");
        assert!(!defaults.contains_key("pipelining"));
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let base = Path::new("/etc/ansible");
        assert_eq!(resolve_path(base, "hosts"), PathBuf::from("/etc/ansible/hosts"));
        assert_eq!(resolve_path(base, "/srv/hosts"), PathBuf::from("/srv/hosts"));
    }

    #[test]
    fn host_vars_are_strings_only() {
        let mut vars = HashMap::new();
        vars.insert("ansible_user".to_string(), serde_json::json!("deploy"));
        vars.insert("ansible_port".to_string(), serde_json::json!(22));
        assert_eq!(host_var(&vars, "ansible_user").as_deref(), Some("deploy"));
        assert_eq!(host_var(&vars, "ansible_port"), None);
    }
}
