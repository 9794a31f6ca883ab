use std::sync::Arc;

use super::*;
use crate::test_utils::three_node_cluster;
use crate::Applicability;
use crate::NodeContext;
use crate::NodeIdentity;
use crate::SettingCategory;
use crate::SettingChange;

#[test]
fn test_registry_lookup_by_category() {
    let mut handler = MockConfigChangeHandler::new();
    handler.expect_try_apply().times(1).returning(|base, _| Ok(base.cluster().clone()));

    let registry = HandlerRegistry::new().with_handler(SettingCategory::OffheapResources, Arc::new(handler));

    assert!(registry.handler(SettingCategory::DataDirs).is_none());
    let handler = registry.handler(SettingCategory::OffheapResources).unwrap();

    let context = NodeContext::new(three_node_cluster(), NodeIdentity::new(1, "node-1"));
    let change = SettingChange::set(Applicability::Cluster, "offheap-resources.main", "1GB");
    assert_eq!(handler.try_apply(&context, &change).unwrap(), three_node_cluster());
}

#[test]
fn test_register_replaces_previous_handler() {
    let mut registry = HandlerRegistry::new();
    assert!(registry.is_empty());

    let first = registry.register(SettingCategory::DataDirs, Arc::new(MockConfigChangeHandler::new()));
    let second = registry.register(SettingCategory::DataDirs, Arc::new(MockConfigChangeHandler::new()));

    assert!(first.is_none());
    assert!(second.is_some());
    assert_eq!(registry.categories(), vec![SettingCategory::DataDirs]);
}

#[test]
fn test_default_initialize_is_noop() {
    struct Passthrough;
    impl ConfigChangeHandler for Passthrough {
        fn try_apply(
            &self,
            base: &NodeContext,
            _change: &SettingChange,
        ) -> std::result::Result<crate::Cluster, InvalidConfigChange> {
            Ok(base.cluster().clone())
        }

        fn apply(
            &self,
            _change: &SettingChange,
        ) -> crate::Result<bool> {
            Ok(false)
        }
    }

    let context = NodeContext::new(three_node_cluster(), NodeIdentity::new(1, "node-1"));
    assert!(Passthrough.initialize(&context).is_ok());
}

#[test]
fn test_invalid_config_change_message() {
    let e = InvalidConfigChange::new("Unknown setting: foo");
    assert_eq!(e.message(), "Unknown setting: foo");
    assert_eq!(e.to_string(), "Unknown setting: foo");

    let error: crate::Error = e.into();
    assert!(error.is_invalid_change());
}
