//! Rule registry: ordered, configured, capability-filtered rule bindings per
//! named group.
//!
//! Registration order defines 1-based ordinals used for lookup and reporting.
//! Registering the same rule twice in a group is a no-op.

use crate::config::{CanonConfig, GroupCfg};
use crate::error::{CanonError, Result};
use crate::rule::{Capabilities, Rule, RuleRef, Settings};
use std::path::Path;

#[derive(Debug, Clone)]
/// One rule registered in a group with its own settings block.
pub struct Binding {
    pub rule: RuleRef,
    pub settings: Settings,
}

impl From<RuleRef> for Binding {
    fn from(rule: RuleRef) -> Self {
        Binding {
            rule,
            settings: Settings::new(),
        }
    }
}

impl From<(RuleRef, Settings)> for Binding {
    fn from((rule, settings): (RuleRef, Settings)) -> Self {
        Binding { rule, settings }
    }
}

#[derive(Debug, Clone, Default)]
/// Scan scope and shared settings of a group.
pub struct GroupSettings {
    pub bases: Vec<String>,
    pub extensions: Vec<String>,
    pub exclude: Vec<String>,
    pub thresholds: Settings,
}

impl From<&GroupCfg> for GroupSettings {
    fn from(cfg: &GroupCfg) -> Self {
        GroupSettings {
            bases: cfg.base_paths(),
            extensions: cfg.extensions.clone(),
            exclude: cfg.exclude.clone(),
            thresholds: Settings::from_map(cfg.thresholds.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Group {
    pub name: String,
    pub settings: GroupSettings,
    pub bindings: Vec<Binding>,
}

/// Result of a name-based lookup.
pub struct FoundRule {
    pub group: String,
    pub ordinal: usize,
    pub rule: Box<dyn Rule>,
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    groups: Vec<Group>,
    caps: Capabilities,
}

impl Registry {
    pub fn new(caps: Capabilities) -> Self {
        Self {
            groups: Vec::new(),
            caps,
        }
    }

    /// Build a registry from the configuration document, resolving rule ids
    /// against `catalog`.
    pub fn from_config(
        cfg: &CanonConfig,
        catalog: &[RuleRef],
        config_path: &Path,
        caps: Capabilities,
    ) -> Result<Self> {
        let mut reg = Registry::new(caps);
        for (name, gcfg) in cfg.groups.iter() {
            reg.set_group_config(name, GroupSettings::from(gcfg));
            for entry in gcfg.rules.iter() {
                let rule = catalog
                    .iter()
                    .find(|r| r.id == entry.id())
                    .cloned()
                    .ok_or_else(|| {
                        CanonError::config(
                            config_path,
                            format!("group '{}' references unknown rule '{}'", name, entry.id()),
                        )
                    })?;
                let settings = entry.settings().cloned().map(Settings::from_map);
                reg.register(name, rule, settings);
            }
        }
        Ok(reg)
    }

    fn group_mut(&mut self, name: &str) -> &mut Group {
        let idx = match self.groups.iter().position(|g| g.name == name) {
            Some(i) => i,
            None => {
                self.groups.push(Group {
                    name: name.to_string(),
                    settings: GroupSettings::default(),
                    bindings: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        &mut self.groups[idx]
    }

    /// Register `rule` in `group`. Returns false when it was already present.
    pub fn register(&mut self, group: &str, rule: RuleRef, settings: Option<Settings>) -> bool {
        let g = self.group_mut(group);
        if g.bindings.iter().any(|b| b.rule == rule) {
            log::debug!("rule '{}' already registered in '{}'", rule.id, group);
            return false;
        }
        g.bindings.push(Binding {
            rule,
            settings: settings.unwrap_or_default(),
        });
        true
    }

    /// Register several rules, bare or with settings. Returns how many were new.
    pub fn register_many<I>(&mut self, group: &str, items: I) -> usize
    where
        I: IntoIterator,
        I::Item: Into<Binding>,
    {
        items
            .into_iter()
            .map(Into::into)
            .filter(|b: &Binding| self.register(group, b.rule.clone(), Some(b.settings.clone())))
            .count()
    }

    pub fn set_group_config(&mut self, group: &str, settings: GroupSettings) {
        self.group_mut(group).settings = settings;
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Number of registered bindings in `group` (before capability filtering).
    pub fn count(&self, group: &str) -> usize {
        self.group(group).map(|g| g.bindings.len()).unwrap_or(0)
    }

    fn instantiate(&self, group: &Group, binding: &Binding) -> Option<Box<dyn Rule>> {
        let mut rule = binding.rule.instantiate();
        rule.configure(&group.settings.thresholds.merged(&binding.settings));
        if rule.supported(&self.caps) {
            Some(rule)
        } else {
            log::info!("rule '{}' unsupported in this environment; omitted", rule.id());
            None
        }
    }

    /// Instantiated, configured and supported rules of `group`, in order.
    pub fn get_rules(&self, group: &str) -> Result<Vec<Box<dyn Rule>>> {
        let g = self
            .group(group)
            .ok_or_else(|| CanonError::UnknownGroup(group.to_string()))?;
        Ok(g.bindings
            .iter()
            .filter_map(|b| self.instantiate(g, b))
            .collect())
    }

    /// Rule registered at 1-based `ordinal`; `None` when out of range or unsupported.
    pub fn get_rule_by_ordinal(&self, group: &str, ordinal: usize) -> Result<Option<Box<dyn Rule>>> {
        let g = self
            .group(group)
            .ok_or_else(|| CanonError::UnknownGroup(group.to_string()))?;
        Ok(ordinal
            .checked_sub(1)
            .and_then(|i| g.bindings.get(i))
            .and_then(|b| self.instantiate(g, b)))
    }

    /// Look a rule up by id or display name across all groups.
    pub fn find_rule(&self, name_or_id: &str) -> Option<FoundRule> {
        for g in &self.groups {
            for (i, b) in g.bindings.iter().enumerate() {
                if b.rule.id.eq_ignore_ascii_case(name_or_id) {
                    return self.instantiate(g, b).map(|rule| FoundRule {
                        group: g.name.clone(),
                        ordinal: i + 1,
                        rule,
                    });
                }
                if let Some(rule) = self.instantiate(g, b) {
                    if rule.name().eq_ignore_ascii_case(name_or_id) {
                        return Some(FoundRule {
                            group: g.name.clone(),
                            ordinal: i + 1,
                            rule,
                        });
                    }
                }
            }
        }
        None
    }

    /// `(ordinal, id, description)` for every supported rule of `group`.
    pub fn list(&self, group: &str) -> Result<Vec<(usize, String, String)>> {
        let g = self
            .group(group)
            .ok_or_else(|| CanonError::UnknownGroup(group.to_string()))?;
        Ok(g.bindings
            .iter()
            .enumerate()
            .filter_map(|(i, b)| {
                self.instantiate(g, b)
                    .map(|r| (i + 1, r.id().to_string(), r.description().to_string()))
            })
            .collect())
    }
}
