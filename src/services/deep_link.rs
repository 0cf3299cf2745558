use crate::constants::links::{MAX_GROUP_DEPTH, ROOT_PARENT_ID};
use crate::errors::{AccessError, AccessResult};
use crate::services::executor::RequestExecutor;
use crate::services::logger::Logger;
use crate::services::request::RequestDescriptor;
use crate::utils::template::encode_path_segment;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use url::form_urlencoded;

/// Entity kinds that have a navigable page in the platform UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityFamily {
    Dashboard,
    Resource,
    Website,
    Alert,
}

impl EntityFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityFamily::Dashboard => "dashboard",
            EntityFamily::Resource => "resource",
            EntityFamily::Website => "website",
            EntityFamily::Alert => "alert",
        }
    }

    fn group_prefix(self) -> &'static str {
        match self {
            EntityFamily::Dashboard => "dashboardGroups-",
            EntityFamily::Resource => "resourceGroups-",
            EntityFamily::Website => "websiteGroups-",
            EntityFamily::Alert => "",
        }
    }

    fn leaf_prefix(self) -> &'static str {
        match self {
            EntityFamily::Dashboard => "dashboards-",
            EntityFamily::Resource => "resources-",
            EntityFamily::Website => "websites-",
            EntityFamily::Alert => "",
        }
    }

    /// API path of the leaf entity.
    pub fn entity_path(self) -> &'static str {
        match self {
            EntityFamily::Dashboard => "/dashboard/dashboards/{id}",
            EntityFamily::Resource => "/device/devices/{id}",
            EntityFamily::Website => "/website/websites/{id}",
            EntityFamily::Alert => "/alert/alerts/{id}",
        }
    }

    /// API path of the family's groups; alerts are not grouped.
    pub fn group_path(self) -> Option<&'static str> {
        match self {
            EntityFamily::Dashboard => Some("/dashboard/groups/{id}"),
            EntityFamily::Resource => Some("/device/groups/{id}"),
            EntityFamily::Website => Some("/website/groups/{id}"),
            EntityFamily::Alert => None,
        }
    }

    /// Field on the leaf entity that points at its group.
    pub fn parent_field(self) -> Option<&'static str> {
        match self {
            EntityFamily::Dashboard | EntityFamily::Website => Some("groupId"),
            EntityFamily::Resource => Some("hostGroupIds"),
            EntityFamily::Alert => None,
        }
    }
}

impl fmt::Display for EntityFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityFamily {
    type Err = AccessError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "dashboard" | "dashboards" => Ok(EntityFamily::Dashboard),
            "resource" | "resources" | "device" | "devices" => Ok(EntityFamily::Resource),
            "website" | "websites" => Ok(EntityFamily::Website),
            "alert" | "alerts" => Ok(EntityFamily::Alert),
            other => Err(AccessError::invalid_request(format!(
                "Unknown entity family '{}' (expected dashboard, resource, website or alert)",
                other
            ))),
        }
    }
}

/// The slice of an entity the resolver needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl EntityRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, parent_id: Option<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_id: parent_id.and_then(|p| normalize_parent(&p)),
        }
    }

    /// Projects an API payload. Resources list several groups in
    /// `hostGroupIds` ("12,40"); the first one is used.
    pub fn from_value(path: &str, value: &Value, parent_field: Option<&str>) -> AccessResult<Self> {
        let id = value
            .get("id")
            .and_then(render_id)
            .ok_or_else(|| AccessError::response_shape(path, "id"))?;
        let name = ["name", "displayName", "monitorObjectName"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str))
            .unwrap_or("")
            .to_string();
        let parent_id = parent_field
            .and_then(|field| value.get(field))
            .and_then(|raw| match raw {
                Value::String(text) => text.split(',').next().and_then(normalize_parent),
                other => render_id(other).and_then(|id| normalize_parent(&id)),
            });
        Ok(Self {
            id,
            name,
            parent_id,
        })
    }
}

fn render_id(value: &Value) -> Option<String> {
    match value {
        Value::Number(num) => Some(num.to_string()),
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        _ => None,
    }
}

fn normalize_parent(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == ROOT_PARENT_ID.to_string() {
        return None;
    }
    Some(trimmed.to_string())
}

/// Source of entities for the resolver. The API-backed implementation is
/// [`ApiEntityFetcher`]; tests substitute their own.
#[async_trait]
pub trait EntityFetcher: Send + Sync {
    async fn fetch_entity(&self, family: EntityFamily, id: &str) -> AccessResult<EntityRef>;
    async fn fetch_group(&self, family: EntityFamily, id: &str) -> AccessResult<EntityRef>;
}

#[derive(Clone)]
pub struct ApiEntityFetcher {
    executor: RequestExecutor,
}

impl ApiEntityFetcher {
    pub fn new(executor: RequestExecutor) -> Self {
        Self { executor }
    }

    async fn fetch(
        &self,
        template: &str,
        id: &str,
        parent_field: Option<&str>,
    ) -> AccessResult<EntityRef> {
        let mut fields = vec!["id", "name"];
        if template.starts_with("/alert/") {
            fields.push("monitorObjectName");
        }
        if let Some(field) = parent_field {
            fields.push(field);
        }
        let descriptor = RequestDescriptor::get(template)
            .path_param("id", id)
            .query("fields", fields.join(","));
        let path = descriptor.resolved_path()?;
        let value = self.executor.execute(&descriptor).await?;
        EntityRef::from_value(&path, &value, parent_field)
    }
}

#[async_trait]
impl EntityFetcher for ApiEntityFetcher {
    async fn fetch_entity(&self, family: EntityFamily, id: &str) -> AccessResult<EntityRef> {
        self.fetch(family.entity_path(), id, family.parent_field())
            .await
    }

    async fn fetch_group(&self, family: EntityFamily, id: &str) -> AccessResult<EntityRef> {
        let template = family.group_path().ok_or_else(|| {
            AccessError::invalid_request(format!("{} entities have no groups", family))
        })?;
        self.fetch(template, id, Some("parentId")).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepLink {
    pub url: String,
    pub entity: EntityRef,
    /// Root first, immediate parent last.
    pub group_path: Vec<EntityRef>,
}

#[derive(Clone)]
pub struct DeepLinkResolver {
    logger: Logger,
    ui_base: String,
    max_depth: usize,
}

impl DeepLinkResolver {
    pub fn new(ui_base: impl Into<String>, logger: &Logger) -> Self {
        Self {
            logger: logger.child("links"),
            ui_base: ui_base.into().trim_end_matches('/').to_string(),
            max_depth: MAX_GROUP_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Fetches the leaf, then climbs its groups one lookup at a time.
    ///
    /// Only the leaf lookup can fail the call. The climb is best effort: a
    /// failed group lookup, a cycle, or hitting the depth limit ends it and
    /// the link is built from the ancestors found so far.
    pub async fn resolve(
        &self,
        family: EntityFamily,
        leaf_id: &str,
        fetcher: &dyn EntityFetcher,
    ) -> AccessResult<DeepLink> {
        let entity = fetcher.fetch_entity(family, leaf_id).await?;
        let mut ancestors: Vec<EntityRef> = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut next = entity.parent_id.clone();

        while let Some(parent_id) = next.take() {
            if ancestors.len() >= self.max_depth {
                self.logger.warn(
                    "Group chain deeper than limit, truncating",
                    Some(&serde_json::json!({
                        "family": family,
                        "id": entity.id,
                        "max_depth": self.max_depth,
                    })),
                );
                break;
            }
            if !visited.insert(parent_id.clone()) {
                self.logger.warn(
                    "Group chain loops, truncating",
                    Some(&serde_json::json!({"family": family, "id": entity.id, "group_id": parent_id})),
                );
                break;
            }
            match fetcher.fetch_group(family, &parent_id).await {
                Ok(group) => {
                    next = group.parent_id.clone();
                    ancestors.push(group);
                }
                Err(err) => {
                    self.logger.warn(
                        "Group lookup failed, link path truncated",
                        Some(&serde_json::json!({
                            "family": family,
                            "id": entity.id,
                            "group_id": parent_id,
                            "error": err,
                        })),
                    );
                    break;
                }
            }
        }

        ancestors.reverse();
        let url = self.build_url(family, &ancestors, &entity);
        Ok(DeepLink {
            url,
            entity,
            group_path: ancestors,
        })
    }

    /// Ancestor segments in order, then the leaf segment.
    pub fn build_url(&self, family: EntityFamily, group_path: &[EntityRef], leaf: &EntityRef) -> String {
        let segments: Vec<String> = group_path
            .iter()
            .map(|group| format!("{}{}", family.group_prefix(), group.id))
            .chain(std::iter::once(format!("{}{}", family.leaf_prefix(), leaf.id)))
            .collect();
        match family {
            EntityFamily::Dashboard => {
                let encoded: Vec<String> = segments.iter().map(|s| encode_path_segment(s)).collect();
                format!("{}/dashboards/{}", self.ui_base, encoded.join("%2C"))
            }
            EntityFamily::Resource => {
                format!("{}/resources/treeNodes#{}", self.ui_base, segments.join(","))
            }
            EntityFamily::Website => {
                let encoded: Vec<String> = segments
                    .iter()
                    .map(|s| form_urlencoded::byte_serialize(s.as_bytes()).collect::<String>())
                    .collect();
                format!(
                    "{}/websites/treeNodes?resourcePath={}",
                    self.ui_base,
                    encoded.join(",")
                )
            }
            EntityFamily::Alert => format!(
                "{}/alerts?alertId={}",
                self.ui_base,
                form_urlencoded::byte_serialize(leaf.id.as_bytes()).collect::<String>()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::logger::LogLevel;
    use serde_json::json;

    fn resolver() -> DeepLinkResolver {
        DeepLinkResolver::new(
            "https://acme.logicmonitor.com/santaba/uiv4/",
            &Logger::with_level("test", LogLevel::Error),
        )
    }

    fn group(id: &str) -> EntityRef {
        EntityRef::new(id, format!("group {}", id), None)
    }

    #[test]
    fn from_value_takes_first_host_group() {
        let value = json!({"id": 77, "displayName": "db-01", "hostGroupIds": "12,40"});
        let entity = EntityRef::from_value("/device/devices/77", &value, Some("hostGroupIds"))
            .expect("entity");
        assert_eq!(entity, EntityRef::new("77", "db-01", Some("12".to_string())));
    }

    #[test]
    fn from_value_treats_zero_parent_as_root() {
        let value = json!({"id": 1, "name": "Root", "parentId": 0});
        let entity = EntityRef::from_value("/device/groups/1", &value, Some("parentId")).expect("entity");
        assert!(entity.parent_id.is_none());
        assert!(EntityRef::from_value("/x", &json!({"name": "no id"}), None).is_err());
    }

    #[test]
    fn dashboard_links_encode_commas_in_path() {
        let url = resolver().build_url(
            EntityFamily::Dashboard,
            &[group("1"), group("5")],
            &EntityRef::new("42", "Overview", None),
        );
        assert_eq!(
            url,
            "https://acme.logicmonitor.com/santaba/uiv4/dashboards/dashboardGroups-1%2CdashboardGroups-5%2Cdashboards-42"
        );
    }

    #[test]
    fn resource_links_use_fragment() {
        let url = resolver().build_url(
            EntityFamily::Resource,
            &[group("3")],
            &EntityRef::new("77", "db-01", None),
        );
        assert_eq!(
            url,
            "https://acme.logicmonitor.com/santaba/uiv4/resources/treeNodes#resourceGroups-3,resources-77"
        );
    }

    #[test]
    fn website_and_alert_links_use_query() {
        let r = resolver();
        let website = r.build_url(EntityFamily::Website, &[], &EntityRef::new("9", "site", None));
        assert_eq!(
            website,
            "https://acme.logicmonitor.com/santaba/uiv4/websites/treeNodes?resourcePath=websites-9"
        );
        let alert = r.build_url(EntityFamily::Alert, &[], &EntityRef::new("LMA123", "cpu", None));
        assert_eq!(alert, "https://acme.logicmonitor.com/santaba/uiv4/alerts?alertId=LMA123");
    }

    #[test]
    fn family_parses_aliases() {
        assert_eq!("Devices".parse::<EntityFamily>().expect("family"), EntityFamily::Resource);
        assert!("widget".parse::<EntityFamily>().is_err());
    }
}
