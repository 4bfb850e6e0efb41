//! Application and service descriptions
//!
//! A ServiceSpec defines what to deploy for one service, the unit of
//! dependency ordering. An ApplicationSpec groups services together with
//! application-wide property defaults.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Specification for one service within an application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Service name, unique within its application
    pub name: String,

    /// Names of services that must be deployed before this one
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Instance count the deployment must reach to be considered complete
    pub planned_instances: u32,

    /// Opaque deployment descriptor handed through to the cluster provider
    #[serde(default)]
    pub descriptor: Value,

    /// Service-level property values, overriding application defaults
    #[serde(default)]
    pub properties: Map<String, Value>,

    /// Resource demands that must be provisioned before install can start.
    /// A batch containing any such service is deployed in the background.
    #[serde(default)]
    pub resources: Option<ResourceRequirements>,
}

impl ServiceSpec {
    /// Create a spec with the given name and a planned count of 1
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            depends_on: Vec::new(),
            planned_instances: 1,
            descriptor: Value::Null,
            properties: Map::new(),
            resources: None,
        }
    }

    /// Declare a dependency on another service of the same application
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    /// Set the planned instance count
    pub fn with_planned_instances(mut self, count: u32) -> Self {
        self.planned_instances = count;
        self
    }

    /// Set a service-level property
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Declare resource demands, forcing the batch into the background
    pub fn with_resources(mut self, resources: ResourceRequirements) -> Self {
        self.resources = Some(resources);
        self
    }
}

/// Resource demands declared by a service
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    /// CPU cores per instance
    pub cpu_cores: f64,

    /// Memory per instance, in megabytes
    pub memory_mb: u64,
}

impl Default for ResourceRequirements {
    fn default() -> Self {
        Self {
            cpu_cores: 1.0,
            memory_mb: 512,
        }
    }
}

/// A named group of services deployed together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSpec {
    /// Application name
    pub name: String,

    /// Member services, in declaration order
    pub services: Vec<ServiceSpec>,

    /// Property defaults applied to every service, lowest precedence
    #[serde(default)]
    pub default_properties: Map<String, Value>,
}

impl ApplicationSpec {
    /// Create an application with no services
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            services: Vec::new(),
            default_properties: Map::new(),
        }
    }

    /// Append a service
    pub fn with_service(mut self, service: ServiceSpec) -> Self {
        self.services.push(service);
        self
    }

    /// Set an application-wide property default
    pub fn with_default_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.default_properties.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_service_spec_builder() {
        let spec = ServiceSpec::new("web")
            .with_dependency("db")
            .with_planned_instances(3)
            .with_property("port", json!(8080));

        assert_eq!(spec.name, "web");
        assert_eq!(spec.depends_on, vec!["db".to_string()]);
        assert_eq!(spec.planned_instances, 3);
        assert_eq!(spec.properties.get("port"), Some(&json!(8080)));
        assert!(spec.resources.is_none());
    }

    #[test]
    fn test_application_spec_preserves_declaration_order() {
        let app = ApplicationSpec::new("shop")
            .with_service(ServiceSpec::new("db"))
            .with_service(ServiceSpec::new("web").with_dependency("db"));

        let names: Vec<&str> = app.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["db", "web"]);
    }

    #[test]
    fn test_minimal_service_deserializes_with_defaults() {
        let spec: ServiceSpec =
            serde_json::from_value(json!({ "name": "db", "planned_instances": 2 })).unwrap();
        assert!(spec.depends_on.is_empty());
        assert!(spec.properties.is_empty());
        assert!(spec.resources.is_none());
    }
}
