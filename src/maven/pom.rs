//! The parts of a pom.xml that matter for dependency resolution, and the inheritance /
//! interpolation rules that turn a chain of raw POMs into an effective model.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::Deserialize;

lazy_static! {
    static ref PROPERTY_REGEX: Regex = Regex::new(r"\$\{([^}]+)\}").unwrap();
}

/// property references nested deeper than this are left as they are
const MAX_INTERPOLATION_ROUNDS: usize = 8;

#[allow(non_snake_case)]
#[derive(Deserialize, Debug, Default, Clone)]
pub struct Project {
    pub groupId: Option<String>,
    pub artifactId: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub parent: Option<Parent>,
    #[serde(default)]
    pub properties: HashMap<String, String>,
    pub dependencyManagement: Option<DependencyManagement>,
    pub dependencies: Option<Dependencies>,
}

#[allow(non_snake_case)]
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Parent {
    pub groupId: String,
    pub artifactId: String,
    pub version: String,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct DependencyManagement {
    pub dependencies: Option<Dependencies>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct Dependencies {
    #[serde(default)]
    pub dependency: Vec<Dependency>,
}

#[allow(non_snake_case)]
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub groupId: String,
    pub artifactId: String,
    pub version: Option<String>,
    #[serde(rename = "type")]
    pub dependency_type: Option<String>,
    pub classifier: Option<String>,
    pub scope: Option<String>,
    pub optional: Option<String>,
    pub exclusions: Option<Exclusions>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Exclusions {
    #[serde(default)]
    pub exclusion: Vec<Exclusion>,
}

#[allow(non_snake_case)]
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    pub groupId: String,
    pub artifactId: String,
}

pub fn parse(xml: &[u8]) -> anyhow::Result<Project> {
    Ok(serde_xml_rs::from_reader(xml)?)
}

impl Dependency {
    /// type, classifier: the management key in addition to groupId and artifactId
    fn management_key(&self) -> (String, String, String, String) {
        (
            self.groupId.clone(),
            self.artifactId.clone(),
            self.dependency_type.clone().unwrap_or_else(|| "jar".to_string()),
            self.classifier.clone().unwrap_or_default(),
        )
    }

    pub fn is_optional(&self) -> bool {
        self.optional.as_deref().map(str::trim) == Some("true")
    }

    pub fn exclusion_list(&self) -> &[Exclusion] {
        self.exclusions.as_ref()
            .map(|e| e.exclusion.as_slice())
            .unwrap_or(&[])
    }

    fn interpolate(&self, properties: &HashMap<String, String>) -> Dependency {
        let i = |s: &String| interpolate(s, properties);
        Dependency {
            groupId: i(&self.groupId),
            artifactId: i(&self.artifactId),
            version: self.version.as_ref().map(i),
            dependency_type: self.dependency_type.as_ref().map(i),
            classifier: self.classifier.as_ref().map(i),
            scope: self.scope.as_ref().map(i),
            optional: self.optional.as_ref().map(i),
            exclusions: self.exclusions.as_ref().map(|e| Exclusions {
                exclusion: e.exclusion.iter()
                    .map(|x| Exclusion { groupId: i(&x.groupId), artifactId: i(&x.artifactId) })
                    .collect(),
            }),
        }
    }
}

/// A POM after parent inheritance, interpolation and dependency management
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveModel {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub packaging: String,
    pub dependencies: Vec<Dependency>,
}

/// Builds the effective model from a POM and its ancestors, nearest first
pub fn effective_model(chain: &[Project]) -> Result<EffectiveModel, String> {
    let project = chain.first()
        .ok_or_else(|| "no POM".to_string())?;

    let group_id = project.groupId.clone()
        .or_else(|| project.parent.as_ref().map(|p| p.groupId.clone()))
        .ok_or_else(|| "missing groupId".to_string())?;
    let artifact_id = project.artifactId.clone()
        .ok_or_else(|| "missing artifactId".to_string())?;
    let version = project.version.clone()
        .or_else(|| project.parent.as_ref().map(|p| p.version.clone()))
        .ok_or_else(|| "missing version".to_string())?;
    let packaging = project.packaging.clone().unwrap_or_else(|| "jar".to_string());

    // the root-most ancestor first, so that descendants override
    let mut properties = HashMap::new();
    for p in chain.iter().rev() {
        properties.extend(p.properties.iter().map(|(k, v)| (k.clone(), v.trim().to_string())));
    }
    add_builtin_properties(&mut properties, project, &group_id, &artifact_id, &version, &packaging);

    let mut managed: HashMap<(String, String, String, String), Dependency> = HashMap::new();
    for p in chain.iter().rev() {
        let declared = p.dependencyManagement.as_ref()
            .and_then(|dm| dm.dependencies.as_ref())
            .map(|d| d.dependency.as_slice())
            .unwrap_or(&[]);
        for d in declared {
            let d = d.interpolate(&properties);
            managed.insert(d.management_key(), d);
        }
    }

    // child declarations replace inherited ones with the same key, order is ancestors first
    let mut dependencies: Vec<Dependency> = vec![];
    for p in chain.iter().rev() {
        let declared = p.dependencies.as_ref()
            .map(|d| d.dependency.as_slice())
            .unwrap_or(&[]);
        for d in declared {
            let d = apply_management(d.interpolate(&properties), &managed);
            match dependencies.iter_mut().find(|existing| existing.management_key() == d.management_key()) {
                Some(existing) => *existing = d,
                None => dependencies.push(d),
            }
        }
    }

    Ok(EffectiveModel {
        group_id: interpolate(&group_id, &properties),
        artifact_id: interpolate(&artifact_id, &properties),
        version: interpolate(&version, &properties),
        packaging: interpolate(&packaging, &properties),
        dependencies,
    })
}

fn add_builtin_properties(properties: &mut HashMap<String, String>, project: &Project, group_id: &str, artifact_id: &str, version: &str, packaging: &str) {
    for prefix in ["project", "pom"] {
        properties.insert(format!("{}.groupId", prefix), group_id.to_string());
        properties.insert(format!("{}.artifactId", prefix), artifact_id.to_string());
        properties.insert(format!("{}.version", prefix), version.to_string());
        properties.insert(format!("{}.packaging", prefix), packaging.to_string());
    }
    properties.insert("version".to_string(), version.to_string());

    if let Some(parent) = &project.parent {
        properties.insert("project.parent.groupId".to_string(), parent.groupId.clone());
        properties.insert("project.parent.artifactId".to_string(), parent.artifactId.clone());
        properties.insert("project.parent.version".to_string(), parent.version.clone());
    }
}

fn apply_management(mut dependency: Dependency, managed: &HashMap<(String, String, String, String), Dependency>) -> Dependency {
    if let Some(m) = managed.get(&dependency.management_key()) {
        if dependency.version.is_none() {
            dependency.version = m.version.clone();
        }
        if dependency.scope.is_none() {
            dependency.scope = m.scope.clone();
        }
        if dependency.optional.is_none() {
            dependency.optional = m.optional.clone();
        }
        if dependency.exclusions.is_none() {
            dependency.exclusions = m.exclusions.clone();
        }
    }
    dependency
}

/// Replaces `${name}` references with property values. Unknown references are left untouched.
pub fn interpolate(value: &str, properties: &HashMap<String, String>) -> String {
    let mut result = value.trim().to_string();
    for _ in 0..MAX_INTERPOLATION_ROUNDS {
        if !PROPERTY_REGEX.is_match(&result) {
            break;
        }
        let next = PROPERTY_REGEX.replace_all(&result, |c: &Captures| {
            properties.get(c[1].trim())
                .cloned()
                .unwrap_or_else(|| c[0].to_string())
        }).into_owned();

        if next == result {
            break;
        }
        result = next;
    }
    result
}
