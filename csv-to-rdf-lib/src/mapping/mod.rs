mod prefixes;
pub mod template;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use prefixes::Prefixes;
pub use template::{EntityTemplateSpec, LiteralRule, PathTemplate};

use crate::error::{ProcessorError, RunReport};
use crate::serializer::OutputFormat;
use crate::utils::{normalize_base_iri, safe};

fn default_base_uri() -> String {
    "http://example.org/resource/".to_string()
}

fn default_format() -> String {
    "turtle".to_string()
}

fn default_csv_delimiter() -> String {
    ",".to_string()
}

fn default_separator() -> String {
    ";".to_string()
}

fn default_quotechar() -> String {
    "\"".to_string()
}

fn default_lang() -> String {
    "en".to_string()
}

/// `classes` may be a list or a single `|`-separated string.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum ClassList {
    Many(Vec<String>),
    Joined(String),
}

impl Default for ClassList {
    fn default() -> Self {
        ClassList::Many(vec!["bibo:Article".to_string()])
    }
}

impl ClassList {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            ClassList::Many(classes) => classes
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            ClassList::Joined(joined) => joined
                .split('|')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
        }
    }
}

/// What to do when a correlated column has fewer values than the source column.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IndexMismatchPolicy {
    /// Skip each index that has no correlated value and warn once per index.
    #[default]
    SkipIndex,
    /// Reject the whole record.
    RejectRecord,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RelationSpec {
    pub from: String,
    pub predicate: String,
}

/// The mapping document, as written by the user.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MappingSpec {
    #[serde(default = "default_base_uri")]
    pub base_uri: String,
    #[serde(default)]
    pub entity_base_uri: Option<String>,
    #[serde(default)]
    pub primary_key: Option<String>,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_csv_delimiter")]
    pub csv_delimiter: String,
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default = "default_quotechar")]
    pub quotechar: String,
    #[serde(default)]
    pub escapechar: Option<String>,
    #[serde(default)]
    pub skip_rows: usize,
    #[serde(default)]
    pub multivalued: BTreeMap<String, String>,
    #[serde(default)]
    pub prefixes: BTreeMap<String, String>,
    #[serde(default)]
    pub property_map: BTreeMap<String, String>,
    #[serde(default)]
    pub entity_templates: BTreeMap<String, EntityTemplateSpec>,
    #[serde(default)]
    pub catalogs: Vec<String>,
    #[serde(default)]
    pub relations: Vec<RelationSpec>,
    #[serde(default)]
    pub classes: ClassList,
    #[serde(default)]
    pub datatype_overrides: BTreeMap<String, String>,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default)]
    pub index_mismatch: IndexMismatchPolicy,
    #[serde(default)]
    pub infer_datatypes: bool,
    #[serde(default)]
    pub include_unmapped_columns: bool,
    #[serde(default)]
    pub classified_under: Option<String>,
}

impl MappingSpec {
    pub fn from_file<P: Into<PathBuf>>(path: P) -> Result<Self, ProcessorError> {
        let path = path.into();
        tracing::info!("Loading mapping from {:?}", path);
        let file = std::fs::File::open(&path)?;
        let stripped = json_comments::StripComments::new(file);
        let mapping = serde_json::from_reader(stripped)?;
        tracing::info!("Successfully loaded mapping: {}", path.display());
        Ok(mapping)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ProcessorError> {
        let stripped = json_comments::StripComments::new(text.as_bytes());
        Ok(serde_json::from_reader(stripped)?)
    }

    /// Validate the mapping and resolve it into a dispatch table. Every
    /// configuration error is raised here, before any record is read.
    pub fn validate(&self) -> Result<CompiledMapping, ProcessorError> {
        tracing::info!("Validating mapping...");
        CompiledMapping::compile(self)
    }
}

/// One column's role in the projection, resolved at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRule {
    DirectLiteral {
        predicate: String,
        datatype: Option<String>,
    },
    /// Index into `CompiledMapping::templates`.
    EntityTemplate(usize),
    Catalog {
        predicate: String,
    },
    Relation {
        predicate: String,
    },
}

#[derive(Debug, Clone)]
pub struct IdSource {
    pub column: String,
    pub by_index: bool,
}

#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    pub name: String,
    pub source_column: String,
    /// Explicit template separator; `None` falls back to the column's declaration.
    pub separator: Option<String>,
    pub path: PathTemplate,
    pub id_source: Option<IdSource>,
    pub types: Vec<String>,
    pub link_predicate: String,
    pub inverse_predicate: Option<String>,
    pub literals: Vec<(String, LiteralRule)>,
}

impl CompiledTemplate {
    /// Every column an instantiation of this template reads.
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut columns = vec![self.source_column.as_str()];
        if let Some(id_source) = &self.id_source {
            columns.push(id_source.column.as_str());
        }
        for (_, rule) in &self.literals {
            if let LiteralRule::FromColumn { column, .. } = rule {
                columns.push(column.as_str());
            }
        }
        columns
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub quote: u8,
    pub escape: Option<u8>,
    pub skip_rows: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            escape: None,
            skip_rows: 0,
        }
    }
}

fn single_byte(value: &str, field: &str) -> Result<u8, ProcessorError> {
    match value.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => Err(ProcessorError::InvalidMapping(format!(
            "'{}' must be a single ASCII character, got {:?}",
            field, value
        ))),
    }
}

/// Validated, immutable mapping with every CURIE expanded.
#[derive(Debug, Clone)]
pub struct CompiledMapping {
    pub base_iri: String,
    pub entity_base_iri: String,
    pub primary_key: String,
    pub format: OutputFormat,
    pub prefixes: Prefixes,
    pub classes: Vec<String>,
    pub lang: String,
    pub csv: CsvOptions,
    pub default_separator: String,
    pub multivalued: HashMap<String, String>,
    pub templates: Vec<CompiledTemplate>,
    pub catalogs: Vec<String>,
    pub index_mismatch: IndexMismatchPolicy,
    pub infer_datatypes: bool,
    pub include_unmapped_columns: bool,
    rules: HashMap<String, Vec<ColumnRule>>,
    datatype_overrides: HashMap<String, String>,
}

impl CompiledMapping {
    fn compile(spec: &MappingSpec) -> Result<Self, ProcessorError> {
        let primary_key = spec
            .primary_key
            .as_deref()
            .map(str::trim)
            .filter(|pk| !pk.is_empty())
            .ok_or_else(|| {
                ProcessorError::InvalidMapping(
                    "\"primary_key\" must name the column that identifies each record".into(),
                )
            })?
            .to_string();

        let base_iri = normalize_base_iri(&spec.base_uri, "base_uri")?;
        let entity_base_iri = match &spec.entity_base_uri {
            Some(entity_base) => normalize_base_iri(entity_base, "entity_base_uri")?,
            None => base_iri.clone(),
        };
        let format = OutputFormat::from_tag(&spec.format)?;
        let prefixes = Prefixes::build(&spec.prefixes, &base_iri);

        let classes = spec
            .classes
            .to_vec()
            .iter()
            .map(|class| prefixes.expand(class, "class"))
            .collect::<Result<Vec<_>, _>>()?;

        let csv = CsvOptions {
            delimiter: single_byte(&spec.csv_delimiter, "csv_delimiter")?,
            quote: single_byte(&spec.quotechar, "quotechar")?,
            escape: spec
                .escapechar
                .as_deref()
                .map(|e| single_byte(e, "escapechar"))
                .transpose()?,
            skip_rows: spec.skip_rows,
        };

        let mut datatype_overrides = HashMap::new();
        for (column, datatype) in &spec.datatype_overrides {
            datatype_overrides.insert(column.clone(), prefixes.expand(datatype, "datatype")?);
        }

        let mut templates = Vec::new();
        for (name, template) in &spec.entity_templates {
            templates.push(Self::compile_template(name, template, &prefixes)?);
        }

        let mut slugs: HashMap<String, &str> = HashMap::new();
        for template in templates.iter().filter(|t| t.path.uses_template_name()) {
            let slug = safe(&template.name);
            if slug.is_empty() {
                return Err(ProcessorError::InvalidMapping(format!(
                    "Entity template '{}' has no usable {{template}} path segment; give it an explicit path",
                    template.name
                )));
            }
            if let Some(other) = slugs.insert(slug, &template.name) {
                return Err(ProcessorError::InvalidMapping(format!(
                    "Entity templates '{}' and '{}' render the same {{template}} path segment",
                    other, template.name
                )));
            }
        }

        let mut rules: HashMap<String, Vec<ColumnRule>> = HashMap::new();
        for (index, template) in templates.iter().enumerate() {
            rules
                .entry(template.source_column.clone())
                .or_default()
                .push(ColumnRule::EntityTemplate(index));
        }

        let classified_under = spec
            .classified_under
            .as_deref()
            .map(|p| prefixes.expand(p, "classified_under"))
            .transpose()?;
        let mut catalogs = Vec::new();
        for column in &spec.catalogs {
            if rules.contains_key(column) {
                tracing::warn!(
                    "Column '{}' is both a catalog and an entity template source; the template wins",
                    column
                );
                continue;
            }
            let predicate = match (spec.property_map.get(column), &classified_under) {
                (Some(mapped), _) => prefixes.expand(mapped, "predicate")?,
                (None, Some(generic)) => generic.clone(),
                (None, None) => format!("{}column/{}", base_iri, safe(column)),
            };
            rules.insert(column.clone(), vec![ColumnRule::Catalog { predicate }]);
            catalogs.push(column.clone());
        }

        for relation in &spec.relations {
            if rules.contains_key(&relation.from) {
                tracing::warn!(
                    "Relation column '{}' already has a template or catalog rule; ignoring the relation",
                    relation.from
                );
                continue;
            }
            let predicate = prefixes.expand(&relation.predicate, "relation predicate")?;
            rules.insert(
                relation.from.clone(),
                vec![ColumnRule::Relation { predicate }],
            );
        }

        for (column, predicate) in &spec.property_map {
            if rules.contains_key(column) {
                continue;
            }
            let predicate = prefixes.expand(predicate, "predicate")?;
            rules.insert(
                column.clone(),
                vec![ColumnRule::DirectLiteral {
                    predicate,
                    datatype: datatype_overrides.get(column).cloned(),
                }],
            );
        }

        tracing::debug!("Compiled dispatch table: {:#?}", rules);
        tracing::info!("Mapping validation successful");

        Ok(Self {
            base_iri,
            entity_base_iri,
            primary_key,
            format,
            prefixes,
            classes,
            lang: spec.lang.clone(),
            csv,
            default_separator: spec.separator.clone(),
            multivalued: spec
                .multivalued
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            templates,
            catalogs,
            index_mismatch: spec.index_mismatch,
            infer_datatypes: spec.infer_datatypes,
            include_unmapped_columns: spec.include_unmapped_columns,
            rules,
            datatype_overrides,
        })
    }

    fn compile_template(
        name: &str,
        template: &EntityTemplateSpec,
        prefixes: &Prefixes,
    ) -> Result<CompiledTemplate, ProcessorError> {
        let link_predicate = template.link_predicate.as_deref().ok_or_else(|| {
            ProcessorError::InvalidMapping(format!(
                "Entity template '{}' needs a \"link_predicate\"",
                name
            ))
        })?;
        let raw_path = template.path.as_deref().unwrap_or(template::DEFAULT_PATH);
        let path = PathTemplate::parse(raw_path)?;
        if !path.is_injective() {
            return Err(ProcessorError::InvalidMapping(format!(
                "Entity template '{}': path '{}' needs {{id}} or {{value}}; {{safe_value}} alone can give distinct values one IRI",
                name, raw_path
            )));
        }
        let id_source = template.id_source.as_ref().map(|source| IdSource {
            column: source.from_column.clone(),
            by_index: source.match_by_index.unwrap_or(true),
        });
        if id_source.is_some() && path.uses_value() {
            return Err(ProcessorError::InvalidMapping(format!(
                "Entity template '{}' declares an id_source, so its path may only use {{id}} and {{template}}",
                name
            )));
        }

        let mut literals = Vec::new();
        for (predicate, rule) in &template.literals {
            literals.push((
                prefixes.expand(predicate, "literal predicate")?,
                LiteralRule::from(rule),
            ));
        }

        Ok(CompiledTemplate {
            name: name.to_string(),
            source_column: template
                .source_column
                .clone()
                .unwrap_or_else(|| name.to_string()),
            separator: template.separator.clone(),
            path,
            id_source,
            types: template
                .types
                .iter()
                .map(|t| prefixes.expand(t, "entity type"))
                .collect::<Result<_, _>>()?,
            link_predicate: prefixes.expand(link_predicate, "link predicate")?,
            inverse_predicate: template
                .inverse_predicate
                .as_deref()
                .map(|p| prefixes.expand(p, "inverse predicate"))
                .transpose()?,
            literals,
        })
    }

    /// Rules for a column; empty when the column is not projected.
    pub fn rules_for(&self, column: &str) -> &[ColumnRule] {
        self.rules.get(column).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every column the mapping reads, other than via `include_unmapped_columns`.
    pub fn referenced_columns(&self) -> HashSet<&str> {
        let mut columns: HashSet<&str> = self.rules.keys().map(String::as_str).collect();
        columns.insert(self.primary_key.as_str());
        for template in &self.templates {
            columns.extend(template.referenced_columns());
        }
        columns
    }

    /// Check the mapping against the input's header row. Columns the mapping
    /// needs but the input lacks are fatal; input columns the mapping ignores
    /// are warnings, or fatal in strict mode. With `include_unmapped_columns`
    /// those columns get a generated `col:` predicate instead.
    pub fn check_headers(
        &mut self,
        headers: &[String],
        is_strict: bool,
    ) -> Result<RunReport, ProcessorError> {
        let mut report = RunReport::new();
        let present: HashSet<&str> = headers.iter().map(String::as_str).collect();

        let mut missing: Vec<&str> = self
            .referenced_columns()
            .into_iter()
            .filter(|column| !present.contains(column))
            .collect();
        if !missing.is_empty() {
            missing.sort_unstable();
            return Err(ProcessorError::InvalidMapping(format!(
                "Mapping references columns missing from the input: {:?}",
                missing
            )));
        }

        let referenced: HashSet<String> = self
            .referenced_columns()
            .into_iter()
            .map(str::to_string)
            .collect();
        let unknown: Vec<&String> = headers
            .iter()
            .filter(|h| !h.is_empty() && !referenced.contains(h.as_str()))
            .collect();

        if unknown.is_empty() {
            return Ok(report);
        }

        if self.include_unmapped_columns {
            for column in unknown {
                let rule = ColumnRule::DirectLiteral {
                    predicate: format!("{}column/{}", self.base_iri, safe(column)),
                    datatype: self.datatype_overrides.get(column).cloned(),
                };
                self.rules.insert(column.clone(), vec![rule]);
            }
            return Ok(report);
        }

        let message = format!(
            "Input columns not used by the mapping: {:?}. Their values are not projected.",
            unknown
        );
        if is_strict {
            return Err(ProcessorError::InvalidMapping(message));
        }
        report.add_warning(message, Some("header_validation".to_string()));
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPPING: &str = r#"{
        // Scopus export
        "base_uri": "http://example.org/resource",
        "entity_base_uri": "http://example.org/",
        "primary_key": "EID",
        "multivalued": { "Authors": ";", "Author(s) ID": ";", "Abstract": "" },
        "prefixes": { "dct": "http://purl.org/dc/terms/", "foaf": "http://xmlns.com/foaf/0.1/" },
        "property_map": {
            "Title": "dct:title",
            "Source title": "dct:isPartOf",
            "Year": "dct:issued"
        },
        "entity_templates": {
            "Authors": {
                "path": "author/{id}",
                "id_source": { "from_column": "Author(s) ID" },
                "types": ["foaf:Person"],
                "link_predicate": "dct:creator",
                "literals": { "foaf:name": "raw" }
            }
        },
        "catalogs": ["Source title"],
        "classes": "bibo:Article|bibo:Document",
        "datatype_overrides": { "Year": "xsd:gYear" }
    }"#;

    #[test]
    fn test_mapping_loading() {
        let mapping = MappingSpec::from_file("../test-data/mapping.jsonc").unwrap();
        assert_eq!(mapping.primary_key.as_deref(), Some("EID"));
        assert!(mapping.validate().is_ok());
    }

    #[test]
    fn test_compile_dispatch_table() {
        let compiled = MappingSpec::from_json_str(MAPPING)
            .unwrap()
            .validate()
            .unwrap();

        assert_eq!(compiled.base_iri, "http://example.org/resource/");
        assert_eq!(
            compiled.classes,
            vec![
                "http://purl.org/ontology/bibo/Article",
                "http://purl.org/ontology/bibo/Document"
            ]
        );
        assert_eq!(
            compiled.rules_for("Year"),
            &[ColumnRule::DirectLiteral {
                predicate: "http://purl.org/dc/terms/issued".to_string(),
                datatype: Some("http://www.w3.org/2001/XMLSchema#gYear".to_string()),
            }]
        );
        // the catalog rule takes over the property map entry's predicate
        assert_eq!(
            compiled.rules_for("Source title"),
            &[ColumnRule::Catalog {
                predicate: "http://purl.org/dc/terms/isPartOf".to_string()
            }]
        );
        assert_eq!(compiled.rules_for("Authors"), &[ColumnRule::EntityTemplate(0)]);
        assert!(compiled.rules_for("Abstract").is_empty());

        let authors = &compiled.templates[0];
        assert_eq!(authors.source_column, "Authors");
        assert!(authors.id_source.as_ref().unwrap().by_index);
    }

    #[test]
    fn test_unknown_prefix_is_fatal() {
        let mut spec = MappingSpec::from_json_str(MAPPING).unwrap();
        spec.property_map
            .insert("Link".to_string(), "schema:url".to_string());
        let err = spec.validate().unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidMapping(ref m) if m.contains("schema")));
    }

    #[test]
    fn test_missing_primary_key_is_fatal() {
        let mut spec = MappingSpec::from_json_str(MAPPING).unwrap();
        spec.primary_key = Some("  ".to_string());
        assert!(matches!(
            spec.validate(),
            Err(ProcessorError::InvalidMapping(_))
        ));
    }

    #[test]
    fn test_template_path_must_depend_on_identifier_only() {
        let mut spec = MappingSpec::from_json_str(MAPPING).unwrap();
        spec.entity_templates.get_mut("Authors").unwrap().path =
            Some("author/{safe_value}".to_string());
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_slug_only_path_is_fatal() {
        let spec = MappingSpec::from_json_str(
            r#"{
                "primary_key": "EID",
                "entity_templates": {
                    "Authors": { "path": "person/{safe_value}", "link_predicate": "bibo:authorList" }
                }
            }"#,
        )
        .unwrap();
        let err = spec.validate().unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidMapping(ref m) if m.contains("person/{safe_value}")));

        let spec = MappingSpec::from_json_str(
            r#"{
                "primary_key": "EID",
                "entity_templates": {
                    "Authors": { "path": "person/{value}", "link_predicate": "bibo:authorList" }
                }
            }"#,
        )
        .unwrap();
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_colliding_template_segments_are_fatal() {
        let spec = MappingSpec::from_json_str(
            r#"{
                "primary_key": "EID",
                "entity_templates": {
                    "Editors": { "link_predicate": "bibo:editor" },
                    "Editors ": { "source_column": "Editors", "link_predicate": "bibo:editor" }
                }
            }"#,
        )
        .unwrap();
        assert!(matches!(
            spec.validate(),
            Err(ProcessorError::InvalidMapping(ref m)) if m.contains("same {template}")
        ));

        let spec = MappingSpec::from_json_str(
            r#"{
                "primary_key": "EID",
                "entity_templates": { "作者": { "link_predicate": "bibo:authorList" } }
            }"#,
        )
        .unwrap();
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_template_without_link_predicate_is_fatal() {
        let mut spec = MappingSpec::from_json_str(MAPPING).unwrap();
        spec.entity_templates.get_mut("Authors").unwrap().link_predicate = None;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_check_headers() {
        let mut compiled = MappingSpec::from_json_str(MAPPING)
            .unwrap()
            .validate()
            .unwrap();
        let headers: Vec<String> = ["EID", "Title", "Authors", "Author(s) ID", "Source title", "Year", "Abstract"]
            .iter()
            .map(|h| h.to_string())
            .collect();

        let report = compiled.check_headers(&headers, false).unwrap();
        assert_eq!(report.warnings().len(), 1);
        assert!(compiled.check_headers(&headers, true).is_err());

        let without_ids: Vec<String> = headers
            .iter()
            .filter(|h| *h != "Author(s) ID")
            .cloned()
            .collect();
        let err = compiled.check_headers(&without_ids, false).unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidMapping(ref m) if m.contains("Author(s) ID")));
    }

    #[test]
    fn test_include_unmapped_columns() {
        let mut spec = MappingSpec::from_json_str(MAPPING).unwrap();
        spec.include_unmapped_columns = true;
        let mut compiled = spec.validate().unwrap();
        let headers: Vec<String> = ["EID", "Title", "Authors", "Author(s) ID", "Source title", "Year", "Cited by"]
            .iter()
            .map(|h| h.to_string())
            .collect();
        let report = compiled.check_headers(&headers, true).unwrap();
        assert!(report.is_clean());
        assert_eq!(
            compiled.rules_for("Cited by"),
            &[ColumnRule::DirectLiteral {
                predicate: "http://example.org/resource/column/Cited_by".to_string(),
                datatype: None,
            }]
        );
    }
}
