//! Graph schema derivation and reconciliation
//!
//! The schema a graph needs is computed from configuration alone: relation
//! declarations are parsed and merged per edge collection, simple graphs get
//! their single vertex/edge pair, and orphan vertex collections are
//! collected. The result is compared against any graph definition the store
//! already holds. A live definition is never altered: it either matches
//! exactly or opening the graph fails.

use crate::config::GraphConfig;
use crate::error::{Error, Result};
use crate::naming::{validate_name, GraphType, NamePolicy, DEFAULT_EDGE_COLLECTION, DEFAULT_VERTEX_COLLECTION};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

/// One edge definition as recorded by the store, with prefixed names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDefinition {
    pub collection: String,
    pub from: Vec<String>,
    pub to: Vec<String>,
}

/// A graph definition as recorded by the store, with prefixed names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDefinition {
    pub name: String,
    pub edge_definitions: Vec<EdgeDefinition>,
    #[serde(default)]
    pub orphan_collections: Vec<String>,
}

/// Allowed endpoints of one edge collection, with unprefixed names
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relation {
    pub collection: String,
    pub from: BTreeSet<String>,
    pub to: BTreeSet<String>,
}

impl Relation {
    /// Parse `collection:[from1,from2]->[to1,to2]`; brackets are optional
    pub fn parse(text: &str, policy: &NamePolicy) -> Result<Self> {
        let malformed = || Error::MalformedRelation(text.to_string());
        let (collection, endpoints) = text.split_once(':').ok_or_else(malformed)?;
        let (from, to) = endpoints.split_once("->").ok_or_else(malformed)?;

        let collection = collection_name(collection.trim(), policy).map_err(|_| malformed())?;
        let from = parse_list(from, policy).ok_or_else(malformed)?;
        let to = parse_list(to, policy).ok_or_else(malformed)?;
        Ok(Self { collection, from, to })
    }

    fn merge(&mut self, other: Relation) {
        self.from.extend(other.from);
        self.to.extend(other.to);
    }

    fn to_definition(&self, policy: &NamePolicy) -> EdgeDefinition {
        EdgeDefinition {
            collection: policy.prefixed(&self.collection),
            from: self.from.iter().map(|c| policy.prefixed(c)).collect(),
            to: self.to.iter().map(|c| policy.prefixed(c)).collect(),
        }
    }
}

fn collection_name(name: &str, policy: &NamePolicy) -> Result<String> {
    let name = policy.unprefixed(name);
    validate_name("collection", name)?;
    Ok(name.to_string())
}

fn parse_list(text: &str, policy: &NamePolicy) -> Option<BTreeSet<String>> {
    let text = text.trim();
    let inner = match (text.strip_prefix('['), text.ends_with(']')) {
        (Some(rest), true) => &rest[..rest.len() - 1],
        (None, false) => text,
        _ => return None,
    };
    let names: BTreeSet<String> = inner
        .split(',')
        .map(|name| collection_name(name.trim(), policy).ok())
        .collect::<Option<_>>()?;
    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}

/// What opening a graph has to do to its stored definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaPlan {
    /// No definition exists yet; create this one
    Create(GraphDefinition),
    /// The stored definition matches
    Unchanged,
}

/// The collections and relations a graph requires
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphSchema {
    #[serde(skip)]
    policy: NamePolicy,
    vertex_collections: BTreeSet<String>,
    edge_collections: BTreeSet<String>,
    relations: BTreeMap<String, Relation>,
    orphans: BTreeSet<String>,
}

impl GraphSchema {
    /// Derive the required schema from configuration, without store access
    pub fn derive(policy: &NamePolicy, config: &GraphConfig) -> Result<Self> {
        let mut relations: BTreeMap<String, Relation> = BTreeMap::new();
        for text in &config.relations {
            let relation = Relation::parse(text, policy)?;
            match relations.entry(relation.collection.clone()) {
                Entry::Occupied(mut existing) => existing.get_mut().merge(relation),
                Entry::Vacant(slot) => {
                    slot.insert(relation);
                }
            }
        }

        let declared_edges = config
            .edges
            .iter()
            .map(|name| collection_name(name, policy))
            .collect::<Result<BTreeSet<_>>>()?;
        let declared_orphans = config
            .orphans
            .iter()
            .map(|name| collection_name(name, policy))
            .collect::<Result<BTreeSet<_>>>()?;
        let mut vertex_collections = config
            .vertices
            .iter()
            .map(|name| collection_name(name, policy))
            .collect::<Result<BTreeSet<_>>>()?;

        for edge in &declared_edges {
            if !relations.contains_key(edge) && !(policy.graph_type() == GraphType::Simple && relations.is_empty()) {
                return Err(Error::MissingEdgeDefinition(edge.clone()));
            }
        }

        let referenced: BTreeSet<String> = relations
            .values()
            .flat_map(|r| r.from.iter().chain(r.to.iter()).cloned())
            .collect();
        vertex_collections.extend(referenced.iter().cloned());
        vertex_collections.extend(declared_orphans.iter().cloned());
        let mut edge_collections: BTreeSet<String> = relations.keys().cloned().collect();
        edge_collections.extend(declared_edges);

        if policy.graph_type() == GraphType::Simple {
            if vertex_collections.is_empty() {
                vertex_collections.insert(DEFAULT_VERTEX_COLLECTION.to_string());
            }
            if edge_collections.is_empty() {
                edge_collections.insert(DEFAULT_EDGE_COLLECTION.to_string());
            }
            if vertex_collections.len() > 1 {
                return Err(Error::SchemaConfig(format!(
                    "a simple graph has exactly one vertex collection, found {:?}",
                    vertex_collections
                )));
            }
            if edge_collections.len() > 1 {
                return Err(Error::SchemaConfig(format!(
                    "a simple graph has exactly one edge collection, found {:?}",
                    edge_collections
                )));
            }
            if relations.len() > 1 {
                return Err(Error::SchemaConfig(format!(
                    "a simple graph has exactly one relation, found {}",
                    relations.len()
                )));
            }
            if relations.is_empty() {
                let vertex = vertex_collections.iter().next().cloned().unwrap_or_default();
                let edge = edge_collections.iter().next().cloned().unwrap_or_default();
                relations.insert(
                    edge.clone(),
                    Relation {
                        collection: edge,
                        from: BTreeSet::from([vertex.clone()]),
                        to: BTreeSet::from([vertex]),
                    },
                );
            }
        } else if vertex_collections.is_empty() {
            return Err(Error::SchemaConfig(
                "a complex graph needs at least one vertex collection or relation".to_string(),
            ));
        }

        let referenced: BTreeSet<String> = relations
            .values()
            .flat_map(|r| r.from.iter().chain(r.to.iter()).cloned())
            .collect();
        if let Some(used) = declared_orphans.intersection(&referenced).next() {
            return Err(Error::SchemaConfig(format!(
                "orphan collection '{}' is referenced by a relation",
                used
            )));
        }
        let orphans = vertex_collections.difference(&referenced).cloned().collect();

        Ok(Self {
            policy: policy.clone(),
            vertex_collections,
            edge_collections,
            relations,
            orphans,
        })
    }

    pub fn policy(&self) -> &NamePolicy {
        &self.policy
    }

    /// Vertex collection labels, unprefixed
    pub fn vertex_collections(&self) -> &BTreeSet<String> {
        &self.vertex_collections
    }

    /// Edge collection labels, unprefixed
    pub fn edge_collections(&self) -> &BTreeSet<String> {
        &self.edge_collections
    }

    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.values()
    }

    pub fn relation(&self, edge_collection: &str) -> Option<&Relation> {
        self.relations.get(self.policy.unprefixed(edge_collection))
    }

    pub fn orphans(&self) -> &BTreeSet<String> {
        &self.orphans
    }

    pub fn has_vertex_collection(&self, name: &str) -> bool {
        self.vertex_collections.contains(self.policy.unprefixed(name))
    }

    pub fn has_edge_collection(&self, name: &str) -> bool {
        self.edge_collections.contains(self.policy.unprefixed(name))
    }

    /// Definition to create in the store
    pub fn to_definition(&self) -> GraphDefinition {
        GraphDefinition {
            name: self.policy.graph_name().to_string(),
            edge_definitions: self
                .relations
                .values()
                .map(|r| r.to_definition(&self.policy))
                .collect(),
            orphan_collections: self.orphans.iter().map(|c| self.policy.prefixed(c)).collect(),
        }
    }

    /// Compare against the stored definition, if any
    pub fn reconcile(&self, remote: Option<&GraphDefinition>) -> Result<SchemaPlan> {
        let Some(remote) = remote else {
            return Ok(SchemaPlan::Create(self.to_definition()));
        };
        let mismatch = |detail: String| Error::SchemaMismatch {
            graph: self.policy.graph_name().to_string(),
            detail,
        };
        let local = self.to_definition();

        let expected: BTreeSet<&String> = local.orphan_collections.iter().collect();
        let found: BTreeSet<&String> = remote.orphan_collections.iter().collect();
        if expected != found {
            return Err(mismatch(format!(
                "orphan collections: expected {:?}, found {:?}",
                expected, found
            )));
        }

        let expected = definition_sets(&local.edge_definitions);
        let found = definition_sets(&remote.edge_definitions);
        for (collection, (from, to)) in &expected {
            match found.get(collection) {
                None => {
                    return Err(mismatch(format!(
                        "relation '{}' is missing: expected from {:?} to {:?}",
                        collection, from, to
                    )));
                }
                Some((found_from, found_to)) if found_from != from || found_to != to => {
                    return Err(mismatch(format!(
                        "relation '{}': expected from {:?} to {:?}, found from {:?} to {:?}",
                        collection, from, to, found_from, found_to
                    )));
                }
                Some(_) => {}
            }
        }
        if let Some(extra) = found.keys().find(|c| !expected.contains_key(*c)) {
            return Err(mismatch(format!("relation '{}' is not configured", extra)));
        }

        Ok(SchemaPlan::Unchanged)
    }
}

type EndpointSets<'a> = BTreeMap<&'a str, (BTreeSet<&'a str>, BTreeSet<&'a str>)>;

fn definition_sets(definitions: &[EdgeDefinition]) -> EndpointSets<'_> {
    let mut sets: EndpointSets<'_> = BTreeMap::new();
    for definition in definitions {
        let (from, to) = sets.entry(definition.collection.as_str()).or_default();
        from.extend(definition.from.iter().map(String::as_str));
        to.extend(definition.to.iter().map(String::as_str));
    }
    sets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(graph_type: GraphType) -> NamePolicy {
        NamePolicy::new("g", graph_type).unwrap()
    }

    fn complex(relations: &[&str]) -> GraphConfig {
        GraphConfig {
            graph_type: GraphType::Complex,
            relations: relations.iter().map(|s| s.to_string()).collect(),
            ..GraphConfig::new("g")
        }
    }

    fn derive(config: &GraphConfig) -> Result<GraphSchema> {
        GraphSchema::derive(&policy(config.graph_type), config)
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_relation() {
        let p = policy(GraphType::Complex);
        let r = Relation::parse("knows:[person,bot]->[person]", &p).unwrap();
        assert_eq!(r.collection, "knows");
        assert_eq!(r.from, set(&["bot", "person"]));
        assert_eq!(r.to, set(&["person"]));

        let r = Relation::parse(" g_likes : g_person -> [ post , page ] ", &p).unwrap();
        assert_eq!(r.collection, "likes");
        assert_eq!(r.from, set(&["person"]));
        assert_eq!(r.to, set(&["page", "post"]));
    }

    #[test]
    fn test_parse_relation_malformed() {
        let p = policy(GraphType::Complex);
        for text in [
            "knows",
            "knows:[a]",
            "knows:[a]->[]",
            "knows:[a->[b]",
            ":[a]->[b]",
            "kn_ows:[a]->[b]",
            "knows:[a,b_c]->[d]",
        ] {
            assert!(
                matches!(Relation::parse(text, &p), Err(Error::MalformedRelation(_))),
                "{}",
                text
            );
        }
    }

    #[test]
    fn test_relation_merge_is_order_independent() {
        let a = derive(&complex(&["e:[a,b]->[c]", "e:[b]->[c,d]"])).unwrap();
        let b = derive(&complex(&["e:[b]->[c,d]", "e:[a,b]->[c]"])).unwrap();
        assert_eq!(a, b);

        let merged = a.relation("e").unwrap();
        assert_eq!(merged.from, set(&["a", "b"]));
        assert_eq!(merged.to, set(&["c", "d"]));
        assert_eq!(a.relations().count(), 1);
    }

    #[test]
    fn test_simple_defaults() {
        let schema = derive(&GraphConfig::new("g")).unwrap();
        assert_eq!(schema.vertex_collections(), &set(&["vertex"]));
        assert_eq!(schema.edge_collections(), &set(&["edge"]));
        let relation = schema.relation("edge").unwrap();
        assert_eq!(relation.from, set(&["vertex"]));
        assert_eq!(relation.to, set(&["vertex"]));
        assert!(schema.orphans().is_empty());

        let definition = schema.to_definition();
        assert_eq!(definition.edge_definitions[0].collection, "g_edge");
        assert_eq!(definition.edge_definitions[0].from, vec!["g_vertex"]);
    }

    #[test]
    fn test_simple_cardinality() {
        let config = GraphConfig {
            vertices: vec!["a".into(), "b".into()],
            ..GraphConfig::new("g")
        };
        assert!(matches!(derive(&config), Err(Error::SchemaConfig(_))));

        let config = GraphConfig {
            relations: vec!["e:[a]->[a]".into(), "f:[a]->[a]".into()],
            ..GraphConfig::new("g")
        };
        assert!(matches!(derive(&config), Err(Error::SchemaConfig(_))));

        let config = GraphConfig {
            vertices: vec!["node".into()],
            edges: vec!["link".into()],
            ..GraphConfig::new("g")
        };
        let schema = derive(&config).unwrap();
        assert_eq!(schema.relation("link").unwrap().from, set(&["node"]));
    }

    #[test]
    fn test_missing_edge_definition() {
        let config = GraphConfig {
            edges: vec!["follows".into()],
            ..complex(&["e:[a]->[b]"])
        };
        assert!(matches!(
            derive(&config),
            Err(Error::MissingEdgeDefinition(name)) if name == "follows"
        ));
    }

    #[test]
    fn test_orphans() {
        let config = GraphConfig {
            vertices: vec!["a".into(), "lonely".into()],
            orphans: vec!["archive".into()],
            ..complex(&["e:[a]->[b]"])
        };
        let schema = derive(&config).unwrap();
        assert_eq!(schema.orphans(), &set(&["archive", "lonely"]));
        assert_eq!(schema.vertex_collections(), &set(&["a", "archive", "b", "lonely"]));

        let config = GraphConfig {
            orphans: vec!["a".into()],
            ..complex(&["e:[a]->[b]"])
        };
        assert!(matches!(derive(&config), Err(Error::SchemaConfig(_))));
    }

    #[test]
    fn test_complex_needs_collections() {
        assert!(matches!(derive(&complex(&[])), Err(Error::SchemaConfig(_))));
    }

    #[test]
    fn test_reconcile_create_and_match() {
        let schema = derive(&complex(&["e:[a]->[b]"])).unwrap();
        let SchemaPlan::Create(definition) = schema.reconcile(None).unwrap() else {
            panic!("expected create");
        };
        assert_eq!(definition.name, "g");
        assert!(definition.orphan_collections.is_empty());
        assert_eq!(schema.reconcile(Some(&definition)).unwrap(), SchemaPlan::Unchanged);

        let mut reordered = definition.clone();
        reordered.edge_definitions[0].from = vec!["g_a".into(), "g_a".into()];
        assert_eq!(schema.reconcile(Some(&reordered)).unwrap(), SchemaPlan::Unchanged);
    }

    #[test]
    fn test_reconcile_orphan_mismatch() {
        let config = GraphConfig {
            vertices: vec!["y".into()],
            ..complex(&[])
        };
        let schema = derive(&config).unwrap();
        let remote = GraphDefinition {
            name: "g".into(),
            edge_definitions: vec![],
            orphan_collections: vec!["g_x".into()],
        };
        let err = schema.reconcile(Some(&remote)).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, Error::SchemaMismatch { .. }));
        assert!(message.contains("g_x") && message.contains("g_y"), "{}", message);
    }

    #[test]
    fn test_reconcile_relation_mismatch() {
        let stored = derive(&complex(&["e:[a]->[b]"])).unwrap().to_definition();
        let schema = derive(&complex(&["e:[b]->[a]"])).unwrap();
        let err = schema.reconcile(Some(&stored)).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }));
        assert!(err.to_string().contains("'g_e'"));

        let schema = derive(&complex(&["e:[a]->[b]", "f:[a]->[b]"])).unwrap();
        assert!(schema.reconcile(Some(&stored)).unwrap_err().to_string().contains("'g_f'"));
    }
}
