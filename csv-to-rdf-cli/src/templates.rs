pub enum Template {
    Basic,
    Full,
}

pub const BASIC_MAPPING: &str = r#"{
  // Namespace for record resources; each record's IRI is this plus its primary key
  "base_uri": "http://example.org/resource/",
  // Column whose value identifies each record (required)
  "primary_key": "EID",
  // Output syntax: turtle, nt, xml or json-ld
  "format": "turtle",

  // Prefixes used to write CURIEs below and to shorten the output
  "prefixes": {
    "dct": "http://purl.org/dc/terms/"
  },

  // RDF types asserted on every record
  "classes": ["bibo:Article"],

  // Column -> predicate; one literal statement per value
  "property_map": {
    "Title": "dct:title",
    "Year": "dct:issued",
    "DOI": "bibo:doi"
  },

  // Column -> literal datatype
  "datatype_overrides": {
    "Year": "xsd:gYear"
  }
}
"#;

pub const FULL_MAPPING: &str = r#"{
  // Namespace for record resources
  "base_uri": "http://example.org/resource/",
  // Namespace for resources created by entity templates (defaults to base_uri)
  "entity_base_uri": "http://example.org/",
  // Column whose value identifies each record (required)
  "primary_key": "EID",
  // Output syntax: turtle, nt, xml or json-ld
  "format": "turtle",
  // Language tag for labels and entity literals
  "lang": "en",

  // CSV dialect
  "csv_delimiter": ",",
  "quotechar": "\"",
  "escapechar": null,
  // Lines to skip before the header row
  "skip_rows": 0,

  // Separator used for correlated columns that are not listed under "multivalued"
  "separator": ";",
  // Column -> separator. An empty separator keeps the whole cell as one value
  "multivalued": {
    "Authors": ";",
    "Author(s) ID": ";",
    "Author Keywords": ";",
    "Index Keywords": ";",
    "References": ";",
    "Abstract": ""
  },

  "prefixes": {
    "dct": "http://purl.org/dc/terms/",
    "foaf": "http://xmlns.com/foaf/0.1/"
  },

  // RDF types asserted on every record; a list or a "|"-separated string
  "classes": ["bibo:Article"],

  // Column -> predicate. Several columns may share one predicate
  "property_map": {
    "Title": "dct:title",
    "Year": "dct:issued",
    "DOI": "bibo:doi",
    "Abstract": "dct:abstract",
    "Author Keywords": "dct:subject",
    "Index Keywords": "dct:subject",
    "Source title": "dct:isPartOf"
  },

  "datatype_overrides": {
    "Year": "xsd:gYear"
  },

  // Sub-resources extracted from a (multivalued) column
  "entity_templates": {
    "Authors": {
      // Column to split; defaults to the template name
      "source_column": "Authors",
      // Placeholders: {id}, {value}, {safe_value}, {template}
      "path": "author/{id}",
      // Identifier taken from another column, matched by position
      "id_source": { "from_column": "Author(s) ID", "match_by_index": true },
      "types": ["foaf:Person"],
      "link_predicate": "dct:creator",
      "inverse_predicate": "foaf:made",
      // Predicate -> "raw" | "safe" | { "from_column": ..., "match_by_index": ... }
      "literals": {
        "foaf:name": "raw",
        "rdfs:label": "safe"
      }
    }
  },

  // Columns whose values become shared SKOS concepts
  "catalogs": ["Source title"],
  // Predicate for catalog columns without a property_map entry
  "classified_under": "dct:subject",

  // Columns holding primary keys of other records
  "relations": [
    { "from": "References", "predicate": "dct:references" }
  ],

  // What to do when a correlated column has fewer values: skip_index or reject_record
  "index_mismatch": "skip_index",
  // Type un-overridden literals from their shape (integer, decimal, boolean, date)
  "infer_datatypes": false,
  // Project columns the mapping does not mention under a generated predicate
  "include_unmapped_columns": false
}
"#;
