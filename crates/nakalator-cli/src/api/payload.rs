//! Request payload builders
//!
//! Turns job metadata into the `metas` lists sent to `POST /datas` and
//! `POST /collections`, adding the repository defaults the job leaves out.

use crate::api::types::Meta;
use crate::job::{Metadata, MetadataValue, Person};
use chrono::NaiveDate;

pub const CREATOR_URI: &str = "http://nakala.fr/terms#creator";
pub const CREATED_URI: &str = "http://nakala.fr/terms#created";
pub const LICENSE_URI: &str = "http://nakala.fr/terms#license";
pub const TYPE_URI: &str = "http://nakala.fr/terms#type";
pub const TITLE_URI: &str = "http://nakala.fr/terms#title";
pub const PUBLISHER_URI: &str = "http://purl.org/dc/terms/publisher";
pub const DESCRIPTION_URI: &str = "http://purl.org/dc/terms/description";

pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_ANY_URI: &str = "http://www.w3.org/2001/XMLSchema#anyURI";

pub const DEFAULT_LICENSE: &str = "CC-BY-4.0";
pub const DEFAULT_RESOURCE_TYPE: &str = "http://purl.org/coar/resource_type/c_c513";
pub const DEFAULT_PUBLISHER: &str = "École nationale des chartes - PSL";

fn literal(uri: &str, value: impl Into<String>, lang: Option<&str>, type_uri: &str) -> Meta {
    Meta {
        property_uri: uri.to_string(),
        value: MetadataValue::Literal(value.into()),
        lang: lang.map(str::to_string),
        type_uri: Some(type_uri.to_string()),
    }
}

/// Defaults applied to every data resource, in emission order
pub fn default_metas(today: NaiveDate) -> Vec<Meta> {
    vec![
        literal(CREATOR_URI, "", Some("fr"), XSD_STRING),
        literal(CREATED_URI, today.format("%Y-%m-%d").to_string(), None, XSD_STRING),
        literal(LICENSE_URI, DEFAULT_LICENSE, None, XSD_STRING),
        literal(TYPE_URI, DEFAULT_RESOURCE_TYPE, Some(""), XSD_ANY_URI),
        literal(PUBLISHER_URI, DEFAULT_PUBLISHER, Some("fr"), XSD_STRING),
    ]
}

/// Build the `metas` of a data resource.
///
/// User fields come first in file order, the creator person after them, then
/// every default whose property the user did not set.
pub fn data_metas(metadata: &Metadata, today: NaiveDate) -> Vec<Meta> {
    let mut metas: Vec<Meta> = metadata
        .iter()
        .filter(|(uri, _)| *uri != CREATOR_URI)
        .map(|(uri, field)| Meta {
            property_uri: uri.to_string(),
            value: field.value.clone(),
            lang: field.lang.clone(),
            type_uri: field.type_uri.clone(),
        })
        .collect();

    if let Some(creator) = metadata.get(CREATOR_URI) {
        let value = match &creator.value {
            MetadataValue::Person(person) => MetadataValue::Person(Person {
                orcid: Some(person.orcid.clone().unwrap_or_default()),
                ..person.clone()
            }),
            other => other.clone(),
        };
        metas.push(Meta {
            property_uri: CREATOR_URI.to_string(),
            value,
            lang: None,
            type_uri: None,
        });
    }

    metas.extend(
        default_metas(today)
            .into_iter()
            .filter(|meta| !metadata.contains(&meta.property_uri)),
    );

    metas
}

/// `metas` of a new collection: title then description, both French strings
pub fn collection_metas(title: &str, description: &str) -> Vec<Meta> {
    vec![
        literal(TITLE_URI, title, Some("fr"), XSD_STRING),
        literal(DESCRIPTION_URI, description, Some("fr"), XSD_STRING),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::job::MetadataField;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 2).unwrap()
    }

    fn uris(metas: &[Meta]) -> Vec<&str> {
        metas.iter().map(|m| m.property_uri.as_str()).collect()
    }

    #[test]
    fn test_defaults_fill_empty_metadata() {
        let metas = data_metas(&Metadata::new(), today());
        assert_eq!(
            uris(&metas),
            vec![CREATOR_URI, CREATED_URI, LICENSE_URI, TYPE_URI, PUBLISHER_URI]
        );
        assert_eq!(metas[1].value, MetadataValue::Literal("2024-09-02".to_string()));
        assert_eq!(metas[3].type_uri.as_deref(), Some(XSD_ANY_URI));
        assert_eq!(metas[4].lang.as_deref(), Some("fr"));
    }

    #[test]
    fn test_user_fields_suppress_defaults() {
        let mut metadata = Metadata::new();
        metadata.insert(
            TITLE_URI,
            MetadataField::literal("Graduel", XSD_STRING).with_lang("fr"),
        );
        metadata.insert(LICENSE_URI, MetadataField::literal("CC-BY-NC-4.0", XSD_STRING));

        let metas = data_metas(&metadata, today());
        assert_eq!(
            uris(&metas),
            vec![TITLE_URI, LICENSE_URI, CREATOR_URI, CREATED_URI, TYPE_URI, PUBLISHER_URI]
        );
        assert_eq!(metas[1].value, MetadataValue::Literal("CC-BY-NC-4.0".to_string()));
    }

    #[test]
    fn test_creator_person_gets_orcid() {
        let mut metadata = Metadata::new();
        metadata.insert(
            CREATOR_URI,
            MetadataField {
                value: MetadataValue::Person(Person {
                    givenname: "Toto".to_string(),
                    surname: "Tati".to_string(),
                    orcid: None,
                }),
                lang: None,
                type_uri: None,
            },
        );

        let metas = data_metas(&metadata, today());
        assert_eq!(metas[0].property_uri, CREATOR_URI);
        assert_eq!(metas.iter().filter(|m| m.property_uri == CREATOR_URI).count(), 1);

        let json = serde_json::to_value(&metas[0]).unwrap();
        assert_eq!(json["value"]["givenname"], "Toto");
        assert_eq!(json["value"]["orcid"], "");
        assert!(json.get("lang").is_none());
        assert!(json.get("typeUri").is_none());
    }

    #[test]
    fn test_collection_metas() {
        let metas = collection_metas("Graduel", "Images");
        assert_eq!(uris(&metas), vec![TITLE_URI, DESCRIPTION_URI]);
        assert!(metas.iter().all(|m| m.lang.as_deref() == Some("fr")));
    }
}
